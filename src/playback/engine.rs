//! 播放引擎：一次朗读一行文本（合成 + 播放）
//!
//! - 「扬声器」由一把锁独占，同一时刻只有一次 speak 在合成或播放
//! - Token 懒加载并缓存；收到 TokenExpired 时刷新一次、同一文本重试一次
//! - 其它失败直接返回 Failed，是否跳过或重播由调用方决定
//! - Completed 意味着声卡已经播完

use std::sync::Arc;

use tokio::sync::Mutex;

use super::audio::AudioSink;
use super::wav::{add_wav_header_if_needed, PcmFormat};
use crate::tts::{SpeechSynthesizer, SynthesisError, TokenSource};

/// 单次 speak 的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioOutcome {
    Completed,
    Failed(String),
}

impl AudioOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// 每次 speak 最多尝试的合成次数（首次 + 刷新 Token 后一次）
const MAX_ATTEMPTS: usize = 2;

pub struct PlaybackEngine {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    tokens: Arc<dyn TokenSource>,
    sink: Arc<dyn AudioSink>,
    pcm_format: PcmFormat,
    /// 缓存的 Token；只在取值 / 替换时短暂持有，不跨越网络调用
    token: std::sync::Mutex<Option<String>>,
    /// 扬声器独占锁，覆盖整个合成 + 播放过程
    speaker: Mutex<()>,
}

impl PlaybackEngine {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        tokens: Arc<dyn TokenSource>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        Self {
            synthesizer,
            tokens,
            sink,
            pcm_format: PcmFormat::default(),
            token: std::sync::Mutex::new(None),
            speaker: Mutex::new(()),
        }
    }

    pub fn with_pcm_format(mut self, format: PcmFormat) -> Self {
        self.pcm_format = format;
        self
    }

    /// 预先取一次 Token（启动时调用，失败只告警，speak 时会再试）
    pub async fn warm_up(&self) {
        if let Err(e) = self.refresh_token().await {
            tracing::warn!(error = %e, "Initial speech token acquisition failed");
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn store_token(&self, token: Option<String>) {
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }

    async fn refresh_token(&self) -> Result<String, crate::tts::TokenError> {
        let token = self.tokens.acquire_token().await?;
        self.store_token(Some(token.clone()));
        Ok(token)
    }

    /// 合成并播放一行文本，播完（或失败）后返回
    pub async fn speak(&self, text: &str) -> AudioOutcome {
        let _speaker = self.speaker.lock().await;

        let mut last_error = String::new();
        for attempt in 0..MAX_ATTEMPTS {
            let token = match (attempt, self.cached_token()) {
                (0, Some(token)) => token,
                _ => match self.refresh_token().await {
                    Ok(token) => token,
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "Speech token acquisition failed");
                        last_error = e.to_string();
                        continue;
                    }
                },
            };

            match self.synthesizer.synthesize(text, &token).await {
                Ok(audio) => {
                    let audio = add_wav_header_if_needed(audio, self.pcm_format);
                    return match self.sink.play(audio).await {
                        Ok(()) => AudioOutcome::Completed,
                        Err(e) => {
                            tracing::warn!(error = %e, "Audio playback failed");
                            AudioOutcome::Failed(e.to_string())
                        }
                    };
                }
                Err(SynthesisError::TokenExpired) => {
                    tracing::warn!(attempt, "Speech token expired, refreshing");
                    self.store_token(None);
                    last_error = SynthesisError::TokenExpired.to_string();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Speech synthesis failed");
                    return AudioOutcome::Failed(e.to_string());
                }
            }
        }
        AudioOutcome::Failed(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::playback::audio::{AudioError, NullSink};
    use crate::tts::{EchoSynthesizer, StaticTokenSource, TokenError};

    /// 前 n 次返回 TokenExpired
    struct ExpiringSynth {
        expired_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for ExpiringSynth {
        async fn synthesize(&self, text: &str, _token: &str) -> Result<Bytes, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.expired_left.load(Ordering::SeqCst);
            if left > 0 {
                self.expired_left.store(left - 1, Ordering::SeqCst);
                return Err(SynthesisError::TokenExpired);
            }
            Ok(Bytes::copy_from_slice(text.as_bytes()))
        }
    }

    struct CountingTokens {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl TokenSource for CountingTokens {
        async fn acquire_token(&self) -> Result<String, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(TokenError::Request("unavailable".into()));
            }
            Ok(format!("token-{n}"))
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl AudioSink for BrokenSink {
        async fn play(&self, _audio: Bytes) -> Result<(), AudioError> {
            Err(AudioError::OutputUnavailable("no device".into()))
        }
    }

    #[tokio::test]
    async fn test_speak_completes() {
        let engine = PlaybackEngine::new(
            Arc::new(EchoSynthesizer),
            Arc::new(StaticTokenSource::default()),
            Arc::new(NullSink),
        );
        assert_eq!(engine.speak("你好。").await, AudioOutcome::Completed);
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_once() {
        let synth = Arc::new(ExpiringSynth {
            expired_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        });
        let tokens = Arc::new(CountingTokens {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let engine = PlaybackEngine::new(synth.clone(), tokens.clone(), Arc::new(NullSink));
        engine.warm_up().await;

        assert!(engine.speak("A。").await.is_completed());
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_twice_fails_without_more_retries() {
        let synth = Arc::new(ExpiringSynth {
            expired_left: AtomicUsize::new(5),
            calls: AtomicUsize::new(0),
        });
        let engine = PlaybackEngine::new(
            synth.clone(),
            Arc::new(StaticTokenSource::default()),
            Arc::new(NullSink),
        );
        assert!(matches!(engine.speak("A。").await, AudioOutcome::Failed(_)));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_token_failure_then_success_is_transparent() {
        let tokens = Arc::new(CountingTokens {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        });
        let engine = PlaybackEngine::new(Arc::new(EchoSynthesizer), tokens.clone(), Arc::new(NullSink));
        assert_eq!(engine.speak("A。").await, AudioOutcome::Completed);
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_token_reused() {
        let tokens = Arc::new(CountingTokens {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        });
        let engine = PlaybackEngine::new(Arc::new(EchoSynthesizer), tokens.clone(), Arc::new(NullSink));
        engine.speak("A。").await;
        engine.speak("B。").await;
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_playback_failure_reported() {
        let engine = PlaybackEngine::new(
            Arc::new(EchoSynthesizer),
            Arc::new(StaticTokenSource::default()),
            Arc::new(BrokenSink),
        );
        match engine.speak("A。").await {
            AudioOutcome::Failed(reason) => assert!(reason.contains("no device")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
