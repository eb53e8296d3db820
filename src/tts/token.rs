//! 阿里云 CreateToken：POP RPC 签名（HMAC-SHA1）获取语音服务访问 Token
//!
//! 需要环境变量 ALIYUN_AK_ID / ALIYUN_AK_SECRET。返回 `Token.Id`，过期时间交给服务端管理。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use super::{TokenError, TokenSource};
use crate::config::TokenSection;

type HmacSha1 = Hmac<Sha1>;

const API_VERSION: &str = "2019-02-28";

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    #[serde(rename = "Token")]
    token: Option<TokenBody>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(rename = "Id")]
    id: Option<String>,
}

pub struct AliyunTokenSource {
    http: reqwest::Client,
    endpoint: String,
    region: String,
    access_key_id: String,
    access_key_secret: String,
}

impl AliyunTokenSource {
    pub fn new(
        cfg: &TokenSection,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| TokenError::Request(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            region: cfg.region.clone(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        })
    }

    /// 从 ALIYUN_AK_ID / ALIYUN_AK_SECRET 创建
    pub fn from_env(cfg: &TokenSection) -> Result<Self, TokenError> {
        let id = std::env::var("ALIYUN_AK_ID")
            .map_err(|_| TokenError::MissingCredential("ALIYUN_AK_ID"))?;
        let secret = std::env::var("ALIYUN_AK_SECRET")
            .map_err(|_| TokenError::MissingCredential("ALIYUN_AK_SECRET"))?;
        Self::new(cfg, id, secret)
    }

    fn signed_query(&self) -> Result<String, TokenError> {
        let mut params = BTreeMap::new();
        params.insert("AccessKeyId", self.access_key_id.clone());
        params.insert("Action", "CreateToken".to_string());
        params.insert("Format", "JSON".to_string());
        params.insert("RegionId", self.region.clone());
        params.insert("SignatureMethod", "HMAC-SHA1".to_string());
        params.insert("SignatureNonce", uuid::Uuid::new_v4().to_string());
        params.insert("SignatureVersion", "1.0".to_string());
        params.insert(
            "Timestamp",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        params.insert("Version", API_VERSION.to_string());

        let canonical = canonicalize(&params);
        let signature = sign(&canonical, &self.access_key_secret)?;
        Ok(format!(
            "Signature={}&{}",
            urlencoding::encode(&signature),
            canonical
        ))
    }
}

/// 按键排序后逐项百分号编码并以 & 连接
fn canonicalize(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// StringToSign = GET&%2F&encode(canonical)，密钥为 secret + "&"
fn sign(canonical: &str, secret: &str) -> Result<String, TokenError> {
    let string_to_sign = format!(
        "GET&{}&{}",
        urlencoding::encode("/"),
        urlencoding::encode(canonical)
    );
    let mut mac = HmacSha1::new_from_slice(format!("{secret}&").as_bytes())
        .map_err(|e| TokenError::Request(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl TokenSource for AliyunTokenSource {
    async fn acquire_token(&self) -> Result<String, TokenError> {
        let url = format!("{}/?{}", self.endpoint, self.signed_query()?);
        let body: CreateTokenResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        match body.token.and_then(|t| t.id) {
            Some(id) if !id.is_empty() => {
                tracing::info!("Speech token acquired");
                Ok(id)
            }
            _ => Err(TokenError::Missing(body.message.unwrap_or_default())),
        }
    }
}
