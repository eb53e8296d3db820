//! 回复历史：最新一条回复 + 有上限的历史（仅内存，不持久化）

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::interaction::InteractionKind;

#[derive(Clone, Debug, Serialize)]
pub struct ReplyRecord {
    pub at: DateTime<Local>,
    pub author: String,
    pub comment: String,
    pub kind: InteractionKind,
    pub reply: String,
}

#[derive(Debug)]
pub struct ReplyHistory {
    records: VecDeque<ReplyRecord>,
    limit: usize,
}

impl ReplyHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// 追加一条记录，超出上限时丢弃最旧的
    pub fn push(&mut self, record: ReplyRecord) {
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn latest(&self) -> Option<&ReplyRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 从旧到新
    pub fn records(&self) -> impl Iterator<Item = &ReplyRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reply: &str) -> ReplyRecord {
        ReplyRecord {
            at: Local::now(),
            author: "u1".into(),
            comment: "hi".into(),
            kind: InteractionKind::Comment,
            reply: reply.into(),
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = ReplyHistory::new(2);
        history.push(record("r1"));
        history.push(record("r2"));
        history.push(record("r3"));
        assert_eq!(history.len(), 2);
        let replies: Vec<_> = history.records().map(|r| r.reply.as_str()).collect();
        assert_eq!(replies, vec!["r2", "r3"]);
        assert_eq!(history.latest().unwrap().reply, "r3");
    }

    #[test]
    fn test_empty_history() {
        let history = ReplyHistory::new(0);
        assert!(history.is_empty());
        assert!(history.latest().is_none());
    }
}
