//! 顶层错误类型
//!
//! 朗读 / 回复单元内部的失败不会走到这里：它们被降级为 Failed / Skipped 并记录日志。
//! 这里只覆盖启动与装配阶段会中止程序的错误。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorycastError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Story folder not found: {0}")]
    StoryFolderMissing(PathBuf),

    #[error("No story found in {0}")]
    NoStories(PathBuf),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
