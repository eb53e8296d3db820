//! 观众互动：类型、去重、共享缓存、接入通道

pub mod cache;
pub mod dedup;
pub mod feed;
pub mod types;

pub use cache::{InteractionCache, SignalSnapshot};
pub use dedup::Deduplicator;
pub use feed::{channel as feed_channel, FeedReceiver, FeedSender};
pub use types::{IdentityKey, Interaction, InteractionKind};
