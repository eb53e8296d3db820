//! LLM 层：客户端抽象与实现（OpenAI 兼容 / 千问 / Mock）

pub mod mock;
pub mod openai;
pub mod qianwen;
pub mod traits;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use qianwen::{create_qianwen_client, DASHSCOPE_BASE_URL, QWEN_PLUS};
pub use traits::{LlmClient, LlmError, Message, Role};

use std::sync::Arc;

use crate::config::LlmSection;

/// 按 [llm] 配置创建回复生成客户端；缺少 Key 时退回 Mock 并告警
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    match cfg.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("Using mock LLM client");
            Arc::new(MockLlmClient)
        }
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => {
                tracing::info!(model = %cfg.model, "Using OpenAI-compatible LLM client");
                Arc::new(
                    OpenAiClient::new(cfg.base_url.as_deref(), &cfg.model, Some(key.as_str()))
                        .with_timeout(cfg.timeout_secs),
                )
            }
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY not set, falling back to mock LLM client");
                Arc::new(MockLlmClient)
            }
        },
        _ => match create_qianwen_client(Some(&cfg.model), cfg.base_url.as_deref()) {
            Some(client) => {
                tracing::info!(model = %cfg.model, "Using Qianwen LLM client");
                Arc::new(client.with_timeout(cfg.timeout_secs))
            }
            None => {
                tracing::warn!("DASHSCOPE_API_KEY not set, falling back to mock LLM client");
                Arc::new(MockLlmClient)
            }
        },
    }
}
