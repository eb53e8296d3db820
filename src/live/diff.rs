//! 两次抓取之间的聊天列表差分
//!
//! 只记住上一次抓取到的文本及其出现次数，内存随页面上可见的条目数而定，不随直播时长增长。
//! 某段文本本轮出现的次数比上一轮多几次，就当作新到几条，所以观众重复发同一句话也会被转发。
//! 已知局限：新的一条与旧的同文本条目恰好在同一轮里一进一出时，计数不变，这一条会被漏掉。

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ChatDiff {
    previous: HashMap<String, usize>,
}

impl ChatDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以本轮抓取结果替换上一轮，返回新增的条目（保持页面顺序；同一文本新增几次就返回几次，取靠后的那几条）
    pub fn new_items(&mut self, items: Vec<String>) -> Vec<String> {
        let mut current: HashMap<String, usize> = HashMap::with_capacity(items.len());
        for raw in &items {
            *current.entry(raw.clone()).or_insert(0) += 1;
        }

        let mut to_skip: HashMap<&str, usize> = current
            .iter()
            .map(|(raw, count)| {
                let before = self.previous.get(raw).copied().unwrap_or(0);
                (raw.as_str(), before.min(*count))
            })
            .collect();

        let mut fresh = Vec::new();
        for raw in &items {
            match to_skip.get_mut(raw.as_str()) {
                Some(skip) if *skip > 0 => *skip -= 1,
                _ => fresh.push(raw.clone()),
            }
        }

        self.previous = current;
        fresh
    }

    /// 上一轮抓到的不同文本数
    pub fn tracked(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_poll_returns_everything() {
        let mut diff = ChatDiff::new();
        assert_eq!(diff.new_items(items(&["a：1", "b：2"])), items(&["a：1", "b：2"]));
        assert_eq!(diff.tracked(), 2);
    }

    #[test]
    fn test_items_still_visible_are_not_resent() {
        let mut diff = ChatDiff::new();
        diff.new_items(items(&["a：1", "b：2"]));
        assert!(diff.new_items(items(&["a：1", "b：2"])).is_empty());
        assert_eq!(diff.new_items(items(&["a：1", "b：2", "c：3"])), items(&["c：3"]));
    }

    #[test]
    fn test_repeated_phrase_is_forwarded_again() {
        let mut diff = ChatDiff::new();
        diff.new_items(items(&["a：来了"]));
        assert_eq!(diff.new_items(items(&["a：来了", "b：hi", "a：来了"])), items(&["b：hi", "a：来了"]));
        assert_eq!(diff.new_items(items(&["a：来了", "b：hi", "a：来了", "a：来了"])), items(&["a：来了"]));
    }

    #[test]
    fn test_memory_follows_visible_list() {
        let mut diff = ChatDiff::new();
        for round in 0..1000 {
            let window: Vec<String> = (round..round + 20).map(|i| format!("u{i}：msg")).collect();
            diff.new_items(window);
        }
        assert_eq!(diff.tracked(), 20);
    }

    #[test]
    fn test_scrolled_away_then_new_items() {
        let mut diff = ChatDiff::new();
        diff.new_items(items(&["a：1", "b：2", "c：3"]));
        assert_eq!(diff.new_items(items(&["c：3", "d：4"])), items(&["d：4"]));
        assert!(diff.new_items(Vec::new()).is_empty());
        assert_eq!(diff.tracked(), 0);
    }
}
