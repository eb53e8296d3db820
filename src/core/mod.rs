//! 核心协调层：状态机、状态投影、过程事件、错误与退出信号

pub mod coordinator;
pub mod error;
pub mod events;
pub mod shutdown;
pub mod state;

pub use coordinator::Coordinator;
pub use error::StorycastError;
pub use events::NarrationEvent;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{CoordinatorState, NarrationSnapshot, PlaybackState};
