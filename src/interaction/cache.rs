//! 互动缓存：抓取线程与协调循环之间唯一的共享邮箱
//!
//! 待处理列表、去重键集合和三个信号标志（paused_requested / processing / sentence_finished）
//! 由同一把互斥锁保护，锁只在「检查 + 修改」期间持有，从不跨越 I/O 或 await。

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::dedup::Deduplicator;
use super::types::Interaction;

#[derive(Debug, Default)]
struct CacheState {
    pending: Vec<Interaction>,
    dedup: Deduplicator,
    /// 抓取侧 -> 协调器：「有互动在等」
    paused_requested: bool,
    /// 协调器正在处理互动批次
    processing: bool,
    /// 当前朗读单元已自然播完
    sentence_finished: bool,
}

/// 信号标志的只读快照
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignalSnapshot {
    pub paused_requested: bool,
    pub processing: bool,
    pub sentence_finished: bool,
    pub pending: usize,
}

#[derive(Debug)]
pub struct InteractionCache {
    state: Mutex<CacheState>,
    notify: Notify,
}

impl Default for InteractionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                sentence_finished: true,
                ..CacheState::default()
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 去重后追加；未在处理互动时升起 paused_requested。返回是否被接纳。
    pub fn offer(&self, interaction: Interaction) -> bool {
        let mut state = self.lock();
        if !state.dedup.admit(&interaction) {
            tracing::debug!(author = %interaction.author, text = %interaction.text, "Duplicate interaction dropped");
            return false;
        }

        tracing::info!(
            author = %interaction.author,
            text = %interaction.text,
            kind = %interaction.kind,
            "Interaction cached"
        );
        state.pending.push(interaction);

        if !state.processing && !state.paused_requested {
            state.paused_requested = true;
            if state.sentence_finished {
                tracing::debug!("Pause requested at unit boundary");
            } else {
                tracing::debug!("Pause requested, waiting for current unit to finish");
            }
        }
        drop(state);

        self.notify.notify_one();
        true
    }

    /// 原子地取走全部待处理互动并清空，同时释放这些条目的去重键
    pub fn drain_all(&self) -> Vec<Interaction> {
        let mut state = self.lock();
        let batch = std::mem::take(&mut state.pending);
        for item in &batch {
            state.dedup.release(&item.identity_key());
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn paused_requested(&self) -> bool {
        self.lock().paused_requested
    }

    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        let state = self.lock();
        SignalSnapshot {
            paused_requested: state.paused_requested,
            processing: state.processing,
            sentence_finished: state.sentence_finished,
            pending: state.pending.len(),
        }
    }

    /// 进入互动处理：之后到达的互动不再升起 paused_requested，由排空循环兜底
    pub fn begin_processing(&self) {
        self.lock().processing = true;
    }

    /// 尝试结束互动处理。缓存仍有条目时返回 false（继续排空）；
    /// 否则在同一把锁内清除 processing 与 paused_requested 并返回 true。
    pub fn finish_processing(&self) -> bool {
        let mut state = self.lock();
        if !state.pending.is_empty() {
            return false;
        }
        state.processing = false;
        state.paused_requested = false;
        true
    }

    /// 丢弃全部待处理互动并清除所有标志（退出时使用），返回丢弃的条数
    pub fn reset(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.dedup.clear();
        state.processing = false;
        state.paused_requested = false;
        dropped
    }

    /// 朗读单元开始播放
    pub fn begin_unit(&self) {
        self.lock().sentence_finished = false;
    }

    /// 朗读单元播完：记录 sentence_finished，返回在此之前是否已有打断请求
    pub fn finish_unit(&self) -> bool {
        let mut state = self.lock();
        state.sentence_finished = true;
        state.paused_requested
    }

    /// 挂起直到缓存非空
    pub async fn wait_for_pending(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
