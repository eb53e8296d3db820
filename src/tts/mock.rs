//! 离线合成（用于 dry run 与测试，无需凭证）
//!
//! EchoSynthesizer 直接把文本的 UTF-8 字节当作「音频」返回，配合 NullSink 可以跑通完整朗读循环。

use async_trait::async_trait;
use bytes::Bytes;

use super::{SpeechSynthesizer, SynthesisError, TokenError, TokenSource};

#[derive(Debug, Default)]
pub struct EchoSynthesizer;

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str, _token: &str) -> Result<Bytes, SynthesisError> {
        if text.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// 固定 Token
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Default for StaticTokenSource {
    fn default() -> Self {
        Self::new("offline")
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn acquire_token(&self) -> Result<String, TokenError> {
        Ok(self.token.clone())
    }
}
