//! 朗读过程事件：句子开始 / 结束、打断、互动回复、故事结束（可序列化为 JSON）

use serde::Serialize;

use crate::interaction::InteractionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NarrationEvent {
    /// 开始播放某个故事的第一句
    StoryStarted { story_id: String },
    /// 开始播放一句（resumed = 打断后的重播）
    SentenceStarted {
        story_id: String,
        index: usize,
        text: String,
        resumed: bool,
    },
    /// 句子播完并前进
    SentenceCompleted { story_id: String, index: usize },
    /// 句子在播放期间被打断，稍后重播
    SentenceInterrupted { story_id: String, index: usize },
    /// 合成或播放失败，跳过该句
    SentenceSkipped {
        story_id: String,
        index: usize,
        reason: String,
    },
    /// 开始排空互动
    DrainStarted { pending: usize },
    /// 已回复一条互动
    ReplySpoken {
        author: String,
        kind: InteractionKind,
        reply: String,
    },
    /// 互动回复失败
    ReplySkipped {
        author: String,
        kind: InteractionKind,
        reason: String,
    },
    /// 排空结束，回到朗读
    DrainFinished { serviced: usize },
    /// 全部故事播完
    Finished,
}
