//! 直播间接入：聊天条目解析、抓取差分与（feature "browser"）浏览器监控线程

pub mod diff;
pub mod parse;
#[cfg(feature = "browser")]
pub mod watcher;

pub use diff::ChatDiff;
pub use parse::{parse_chat_item, ChatItem};
#[cfg(feature = "browser")]
pub use watcher::ChatWatcher;
