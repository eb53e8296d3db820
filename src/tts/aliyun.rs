//! 阿里云智能语音交互：RESTful 语音合成
//!
//! POST {endpoint}，JSON 体携带 appkey / token / 文本与音色参数。
//! 成功时响应体即音频；失败时返回 JSON（status / message），Token 相关错误映射为 TokenExpired。

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{SpeechSynthesizer, SynthesisError};
use crate::config::TtsSection;

/// Token 无效 / 过期
const STATUS_TOKEN_INVALID: i64 = 40000001;

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    appkey: &'a str,
    token: &'a str,
    text: &'a str,
    format: &'a str,
    sample_rate: u32,
    voice: &'a str,
    volume: u8,
    speech_rate: i32,
    pitch_rate: i32,
}

#[derive(Debug, Deserialize)]
struct TtsErrorBody {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    message: String,
}

pub struct AliyunSynthesizer {
    http: reqwest::Client,
    endpoint: String,
    appkey: String,
    voice: String,
    format: String,
    sample_rate: u32,
    volume: u8,
    speech_rate: i32,
    pitch_rate: i32,
}

impl AliyunSynthesizer {
    pub fn new(cfg: &TtsSection, appkey: impl Into<String>) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            appkey: appkey.into(),
            voice: cfg.voice.clone(),
            format: cfg.format.clone(),
            sample_rate: cfg.sample_rate,
            volume: cfg.volume,
            speech_rate: cfg.speech_rate,
            pitch_rate: cfg.pitch_rate,
        })
    }
}

/// 把服务端错误体分类：Token 问题可刷新重试，其余直接失败
fn classify_error(http_status: u16, body: &[u8]) -> SynthesisError {
    match serde_json::from_slice::<TtsErrorBody>(body) {
        Ok(err) => {
            if err.status == STATUS_TOKEN_INVALID || err.message.to_lowercase().contains("token") {
                SynthesisError::TokenExpired
            } else {
                SynthesisError::Rejected {
                    status: err.status,
                    message: err.message,
                }
            }
        }
        Err(_) => SynthesisError::Rejected {
            status: i64::from(http_status),
            message: String::from_utf8_lossy(body).chars().take(200).collect(),
        },
    }
}

#[async_trait]
impl SpeechSynthesizer for AliyunSynthesizer {
    async fn synthesize(&self, text: &str, token: &str) -> Result<Bytes, SynthesisError> {
        let request = TtsRequest {
            appkey: &self.appkey,
            token,
            text,
            format: &self.format,
            sample_rate: self.sample_rate,
            voice: &self.voice,
            volume: self.volume,
            speech_rate: self.speech_rate,
            pitch_rate: self.pitch_rate,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        let status = response.status();
        let is_audio = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("audio/"));
        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Transport(e.to_string()))?;

        if status.is_success() && is_audio {
            if body.is_empty() {
                return Err(SynthesisError::EmptyAudio);
            }
            return Ok(body);
        }
        Err(classify_error(status.as_u16(), &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_token_invalid() {
        let body = br#"{"task_id":"x","result":"","status":40000001,"message":"Gateway:ACCESS_DENIED:The token 'abc' is invalid!"}"#;
        assert_eq!(classify_error(400, body), SynthesisError::TokenExpired);
    }

    #[test]
    fn test_classify_other_error() {
        let body = br#"{"status":41020001,"message":"Meta:ACCESS_DENIED:voice not found"}"#;
        assert_eq!(
            classify_error(400, body),
            SynthesisError::Rejected {
                status: 41020001,
                message: "Meta:ACCESS_DENIED:voice not found".to_string()
            }
        );
    }

    #[test]
    fn test_classify_non_json() {
        match classify_error(502, b"Bad Gateway") {
            SynthesisError::Rejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = TtsRequest {
            appkey: "app",
            token: "tok",
            text: "你好。",
            format: "wav",
            sample_rate: 24000,
            voice: "zhixiaobai",
            volume: 50,
            speech_rate: 0,
            pitch_rate: 0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["appkey"], "app");
        assert_eq!(json["sample_rate"], 24000);
        assert_eq!(json["voice"], "zhixiaobai");
    }
}
