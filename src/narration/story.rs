//! 故事源：从 story 目录读取 .txt 故事并切分成句
//!
//! 文件按文件名排序，文件名（去掉扩展名）即故事 ID；空文件跳过，单个文件读取失败只告警。

use std::path::Path;

use crate::core::StorycastError;

const SENTENCE_ENDINGS: [char; 4] = ['。', '！', '？', '…'];

/// 一个故事：ID 与有序句子
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Story {
    pub id: String,
    pub sentences: Vec<String>,
}

impl Story {
    pub fn new(id: impl Into<String>, sentences: Vec<String>) -> Self {
        Self {
            id: id.into(),
            sentences,
        }
    }

    /// 由整段正文构建，自动切句
    pub fn from_text(id: impl Into<String>, text: &str) -> Self {
        Self::new(id, split_into_sentences(text))
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// 按句号切分；不以 。！？… 结尾的片段补一个句号
pub fn split_into_sentences(text: &str) -> Vec<String> {
    text.split('。')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut sentence = s.to_string();
            if !s.ends_with(&SENTENCE_ENDINGS[..]) {
                sentence.push('。');
            }
            sentence
        })
        .collect()
}

/// 读取目录下全部 .txt 故事
pub fn load_story_dir(dir: &Path) -> Result<Vec<Story>, StorycastError> {
    if !dir.is_dir() {
        return Err(StorycastError::StoryFolderMissing(dir.to_path_buf()));
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    files.sort();

    let mut stories = Vec::new();
    for path in files {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let story = Story::from_text(id, content.trim());
                if story.is_empty() {
                    tracing::debug!(path = %path.display(), "Skipping empty story file");
                    continue;
                }
                tracing::info!(story = %story.id, sentences = story.len(), "Story loaded");
                stories.push(story);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read story file");
            }
        }
    }

    if stories.is_empty() {
        return Err(StorycastError::NoStories(dir.to_path_buf()));
    }
    Ok(stories)
}
