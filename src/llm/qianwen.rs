//! 通义千问（DashScope OpenAI 兼容模式）
//!
//! - Base URL: https://dashscope.aliyuncs.com/compatible-mode/v1
//! - 模型: qwen-plus（默认）、qwen-turbo、qwen-max

use crate::llm::OpenAiClient;

pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const QWEN_PLUS: &str = "qwen-plus";

/// 创建千问客户端
///
/// - Key 读取环境变量 `DASHSCOPE_API_KEY`，未设置时返回 None
/// - `base_url` 为空时使用 DashScope 兼容端点
pub fn create_qianwen_client(model: Option<&str>, base_url: Option<&str>) -> Option<OpenAiClient> {
    let api_key = std::env::var("DASHSCOPE_API_KEY").ok()?;
    let model = model.unwrap_or(QWEN_PLUS);
    Some(OpenAiClient::new(
        Some(base_url.unwrap_or(DASHSCOPE_BASE_URL)),
        model,
        Some(api_key.as_str()),
    ))
}
