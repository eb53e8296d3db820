//! 互动去重：只针对「当前待处理」的条目
//!
//! 已被取走处理过的 (author, text) 可以再次进入（观众重复刷同一句话）。
//! 自身不加锁，由 InteractionCache 在其互斥锁内调用，保证检查与插入是原子的。

use std::collections::HashSet;

use super::types::{IdentityKey, Interaction};

#[derive(Debug, Default)]
pub struct Deduplicator {
    pending: HashSet<IdentityKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 键未在待处理集合中时登记并返回 true，否则拒绝
    pub fn admit(&mut self, interaction: &Interaction) -> bool {
        self.pending.insert(interaction.identity_key())
    }

    /// 条目被取走后释放其键
    pub fn release(&mut self, key: &IdentityKey) {
        self.pending.remove(key);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
