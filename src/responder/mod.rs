//! 互动应答：为单条互动生成回复并播出
//!
//! - 文本与欢迎触发词完全一致时跳过 LLM，直接套欢迎语模板（降低延迟）
//! - 其余按互动类型选提示词：礼物 = 系统提示词 + 礼物附加语，评论 = 系统提示词
//! - 生成或播放失败只记日志并返回 Skipped，不重试，不影响同批次后续互动

pub mod history;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;

use crate::config::ResponderSection;
use crate::interaction::{Interaction, InteractionKind};
use crate::llm::{LlmClient, Message};
use crate::playback::{AudioOutcome, PlaybackEngine};

pub use history::{ReplyHistory, ReplyRecord};

/// respond 的结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Spoken { reply: String },
    Skipped(String),
}

impl ReplyOutcome {
    pub fn is_spoken(&self) -> bool {
        matches!(self, Self::Spoken { .. })
    }
}

pub struct InteractionResponder {
    llm: Arc<dyn LlmClient>,
    playback: Arc<PlaybackEngine>,
    settings: ResponderSection,
    history: Mutex<ReplyHistory>,
}

impl InteractionResponder {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        playback: Arc<PlaybackEngine>,
        settings: ResponderSection,
    ) -> Self {
        let history = ReplyHistory::new(settings.history_limit);
        Self {
            llm,
            playback,
            settings,
            history: Mutex::new(history),
        }
    }

    /// 按互动类型选择系统提示词
    pub fn system_prompt_for(&self, kind: InteractionKind) -> String {
        match kind {
            InteractionKind::Comment => self.settings.system_prompt.clone(),
            InteractionKind::Gift => {
                format!("{}{}", self.settings.system_prompt, self.settings.gift_suffix)
            }
        }
    }

    fn greeting_for(&self, interaction: &Interaction) -> Option<String> {
        let text = interaction.text.trim();
        self.settings
            .greeting_triggers
            .iter()
            .any(|t| t == text)
            .then(|| {
                self.settings
                    .greeting_template
                    .replace("{author}", &interaction.author)
            })
    }

    async fn generate_reply(&self, interaction: &Interaction) -> Result<String, crate::llm::LlmError> {
        if let Some(greeting) = self.greeting_for(interaction) {
            tracing::debug!(author = %interaction.author, "Greeting shortcut");
            return Ok(greeting);
        }
        let messages = [
            Message::system(self.system_prompt_for(interaction.kind)),
            Message::user(format!("{}: {}", interaction.author, interaction.text)),
        ];
        let reply = self.llm.complete(&messages).await?;
        Ok(reply.trim().to_string())
    }

    /// 生成回复并播出；任何失败都转成 Skipped
    pub async fn respond(&self, interaction: &Interaction) -> ReplyOutcome {
        let reply = match self.generate_reply(interaction).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(author = %interaction.author, error = %e, "Reply generation failed, skipping");
                return ReplyOutcome::Skipped(e.to_string());
            }
        };

        tracing::info!(author = %interaction.author, reply = %reply, "Replying to interaction");
        self.lock_history().push(ReplyRecord {
            at: Local::now(),
            author: interaction.author.clone(),
            comment: interaction.text.clone(),
            kind: interaction.kind,
            reply: reply.clone(),
        });

        match self.playback.speak(&reply).await {
            AudioOutcome::Completed => ReplyOutcome::Spoken { reply },
            AudioOutcome::Failed(reason) => {
                tracing::warn!(author = %interaction.author, %reason, "Reply playback failed, skipping");
                ReplyOutcome::Skipped(reason)
            }
        }
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, ReplyHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn latest_reply(&self) -> Option<ReplyRecord> {
        self.lock_history().latest().cloned()
    }

    pub fn history_len(&self) -> usize {
        self.lock_history().len()
    }
}
