//! 状态定义：协调器状态、扬声器占用状态与对外投影的快照
//!
//! 快照经 tokio::sync::watch 发布，只读，给日志 / 外部观察者用；真实状态只在协调器内部。

use serde::Serialize;

/// 协调器状态机
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Narrating,
    /// 正在排空互动缓存
    Draining,
    /// 所有故事已播完
    Finished,
}

/// 谁在占用扬声器
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    NarratingSentence,
    RespondingToInteraction,
}

/// 协调器对外投影
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NarrationSnapshot {
    pub state: CoordinatorState,
    pub playback: PlaybackState,
    pub story_id: Option<String>,
    pub sentence_index: usize,
    pub pending_sentence: Option<String>,
    pub pending_interactions: usize,
    pub sentences_spoken: usize,
    pub replies_spoken: usize,
}

impl Default for NarrationSnapshot {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Narrating,
            playback: PlaybackState::Idle,
            story_id: None,
            sentence_index: 0,
            pending_sentence: None,
            pending_interactions: 0,
            sentences_spoken: 0,
            replies_spoken: 0,
        }
    }
}

impl NarrationSnapshot {
    pub fn is_finished(&self) -> bool {
        self.state == CoordinatorState::Finished
    }
}
