//! Mock LLM 客户端（用于 dry run 与测试，无需 API）
//!
//! 取最后一条 User 消息，回一句固定格式的感谢语，便于本地跑通互动流程。

use async_trait::async_trait;

use super::traits::{LlmClient, LlmError, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .ok_or_else(|| LlmError::InvalidRequest("no user message".to_string()))?;

        Ok(format!("谢谢你的留言「{last_user}」，我们接着听故事吧！"))
    }
}
