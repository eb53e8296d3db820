//! 朗读游标：story -> sentence 的确定性推进，支持打断后逐字重播
//!
//! 只归协调器所有；播放引擎从不修改它。
//! 一句话只有在「播放到结尾且期间未观察到打断信号」时才 mark_completed；
//! 合成失败的句子同样 mark_completed（记录日志后前进，避免朗读永久卡住）。

use super::story::Story;

/// next_unit 返回的朗读单元
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrationUnit {
    pub story_id: String,
    /// 0 起始的句子下标
    pub index: usize,
    pub total: usize,
    pub text: String,
    /// 是否为被打断句子的重播
    pub resumed: bool,
}

#[derive(Debug)]
pub struct NarrationCursor {
    stories: Vec<Story>,
    story_index: usize,
    sentence_index: usize,
    pending_sentence_text: Option<String>,
}

impl NarrationCursor {
    pub fn new(stories: Vec<Story>) -> Self {
        let mut cursor = Self {
            stories,
            story_index: 0,
            sentence_index: 0,
            pending_sentence_text: None,
        };
        cursor.skip_exhausted_stories();
        cursor
    }

    /// 下一个要播的单元；有待重播句子时原样返回它且不推进下标。全部播完返回 None。
    pub fn next_unit(&self) -> Option<NarrationUnit> {
        let story = self.stories.get(self.story_index)?;
        if let Some(text) = &self.pending_sentence_text {
            return Some(NarrationUnit {
                story_id: story.id.clone(),
                index: self.sentence_index,
                total: story.len(),
                text: text.clone(),
                resumed: true,
            });
        }
        let text = story.sentences.get(self.sentence_index)?;
        Some(NarrationUnit {
            story_id: story.id.clone(),
            index: self.sentence_index,
            total: story.len(),
            text: text.clone(),
            resumed: false,
        })
    }

    /// 记录被打断的在播句子，下一次 next_unit 将重播它
    pub fn mark_interrupted(&mut self, sentence_text: impl Into<String>) {
        self.pending_sentence_text = Some(sentence_text.into());
    }

    /// 清除待重播句子并前进一句；故事播完时切到下一个非空故事
    pub fn mark_completed(&mut self) {
        self.pending_sentence_text = None;
        if self.is_finished() {
            return;
        }
        self.sentence_index += 1;
        if self.sentence_index >= self.stories[self.story_index].len() {
            tracing::info!(story = %self.stories[self.story_index].id, "Story finished");
            self.story_index += 1;
            self.sentence_index = 0;
            self.skip_exhausted_stories();
        }
    }

    fn skip_exhausted_stories(&mut self) {
        while self
            .stories
            .get(self.story_index)
            .is_some_and(|s| self.sentence_index >= s.len())
        {
            self.story_index += 1;
            self.sentence_index = 0;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.story_index >= self.stories.len()
    }

    pub fn pending_sentence(&self) -> Option<&str> {
        self.pending_sentence_text.as_deref()
    }

    pub fn story_id(&self) -> Option<&str> {
        self.stories.get(self.story_index).map(|s| s.id.as_str())
    }

    pub fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    /// 是否位于某个故事的第一句（用于「开始播放故事」日志）
    pub fn at_story_start(&self) -> bool {
        self.sentence_index == 0 && self.pending_sentence_text.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, sentences: &[&str]) -> Story {
        Story::new(id, sentences.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_sequential_advance_across_stories() {
        let mut cursor = NarrationCursor::new(vec![
            story("s1", &["A。", "B。"]),
            story("empty", &[]),
            story("s2", &["C。"]),
        ]);
        let mut spoken = Vec::new();
        while let Some(unit) = cursor.next_unit() {
            assert!(!unit.resumed);
            spoken.push((unit.story_id, unit.text));
            cursor.mark_completed();
        }
        assert_eq!(
            spoken,
            vec![
                ("s1".to_string(), "A。".to_string()),
                ("s1".to_string(), "B。".to_string()),
                ("s2".to_string(), "C。".to_string()),
            ]
        );
        assert!(cursor.is_finished());
    }

    #[test]
    fn test_interrupted_sentence_replays_without_advancing() {
        let mut cursor = NarrationCursor::new(vec![story("s1", &["A。", "B。"])]);
        let unit = cursor.next_unit().unwrap();
        cursor.mark_interrupted(unit.text.clone());

        let replay = cursor.next_unit().unwrap();
        assert!(replay.resumed);
        assert_eq!(replay.text, "A。");
        assert_eq!(replay.index, 0);

        // next_unit 是幂等的
        assert_eq!(cursor.next_unit().unwrap(), replay);

        cursor.mark_completed();
        let next = cursor.next_unit().unwrap();
        assert!(!next.resumed);
        assert_eq!(next.text, "B。");
        assert!(cursor.pending_sentence().is_none());
    }

    #[test]
    fn test_empty_sources_are_finished() {
        assert!(NarrationCursor::new(vec![]).is_finished());
        let cursor = NarrationCursor::new(vec![story("empty", &[])]);
        assert!(cursor.is_finished());
        assert!(cursor.next_unit().is_none());
    }

    #[test]
    fn test_mark_completed_after_finish_is_noop() {
        let mut cursor = NarrationCursor::new(vec![story("s1", &["A。"])]);
        cursor.mark_completed();
        assert!(cursor.is_finished());
        cursor.mark_completed();
        assert!(cursor.is_finished());
        assert!(cursor.story_id().is_none());
    }
}
