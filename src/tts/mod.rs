//! 语音合成协作方：合成接口、Token 获取接口与阿里云实现
//!
//! 播放引擎只依赖这两个 trait；Token 过期以 `SynthesisError::TokenExpired` 的形式上报，
//! 由引擎决定刷新与重试。

pub mod aliyun;
pub mod mock;
pub mod token;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use aliyun::AliyunSynthesizer;
pub use mock::{EchoSynthesizer, StaticTokenSource};
pub use token::AliyunTokenSource;

/// 合成失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Token 无效或已过期，刷新后可重试
    #[error("Token invalid or expired")]
    TokenExpired,

    #[error("Synthesis rejected ({status}): {message}")]
    Rejected { status: i64, message: String },

    #[error("Synthesis transport error: {0}")]
    Transport(String),

    #[error("Synthesis returned no audio")]
    EmptyAudio,
}

/// Token 获取失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Credential missing: {0}")]
    MissingCredential(&'static str),

    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token not found in response: {0}")]
    Missing(String),
}

/// synthesize(text) -> 音频字节 | 失败
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, token: &str) -> Result<Bytes, SynthesisError>;
}

/// acquireToken() -> token | 失败；过期时间由服务端决定，调用方不跟踪
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn acquire_token(&self) -> Result<String, TokenError>;
}
