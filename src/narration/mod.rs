//! 故事朗读：故事源与朗读游标

pub mod cursor;
pub mod story;

pub use cursor::{NarrationCursor, NarrationUnit};
pub use story::{load_story_dir, split_into_sentences, Story};
