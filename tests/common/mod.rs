//! 集成测试用的脚本化协作方：记录播放区间的声卡、可注入互动 / 失败的合成器、
//! 按脚本返回的 Token 源和按作者回复的 LLM。

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use storycast::config::ResponderSection;
use storycast::core::Coordinator;
use storycast::interaction::{Interaction, InteractionCache};
use storycast::llm::{LlmClient, LlmError, Message, Role};
use storycast::narration::{NarrationCursor, Story};
use storycast::playback::wav::has_wav_header;
use storycast::playback::{AudioError, AudioSink, PlaybackEngine};
use storycast::responder::InteractionResponder;
use storycast::tts::{SpeechSynthesizer, SynthesisError, TokenError, TokenSource};
use tokio_util::sync::CancellationToken;

const WAV_HEADER_LEN: usize = 44;

/// 一次播放：文本与起止时刻
#[derive(Clone, Debug)]
pub struct PlayRecord {
    pub text: String,
    pub started: Instant,
    pub ended: Instant,
}

pub struct RecordingSink {
    delay: Duration,
    records: Mutex<Vec<PlayRecord>>,
}

impl RecordingSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<PlayRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.text).collect()
    }

    /// 所有播放区间两两不重叠
    pub fn assert_no_overlap(&self) {
        let mut records = self.records();
        records.sort_by_key(|r| r.started);
        for pair in records.windows(2) {
            assert!(
                pair[0].ended <= pair[1].started,
                "playback of {:?} overlaps {:?}",
                pair[0].text,
                pair[1].text
            );
        }
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, audio: Bytes) -> Result<(), AudioError> {
        let started = Instant::now();
        let payload = if has_wav_header(&audio) {
            &audio[WAV_HEADER_LEN..]
        } else {
            &audio[..]
        };
        let text = String::from_utf8_lossy(payload).into_owned();
        tokio::time::sleep(self.delay).await;
        self.records.lock().unwrap().push(PlayRecord {
            text,
            started,
            ended: Instant::now(),
        });
        Ok(())
    }
}

/// 合成器：文本即音频；可在合成某句时向缓存注入互动（只触发一次），可对某些文本或 Token 失败
pub struct ScriptedSynthesizer {
    cache: Arc<InteractionCache>,
    triggers: Mutex<HashMap<String, Vec<Interaction>>>,
    failures: HashMap<String, SynthesisError>,
    expired_tokens: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedSynthesizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str, token: &str) -> Result<Bytes, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.expired_tokens.contains(token) {
            return Err(SynthesisError::TokenExpired);
        }
        if let Some(err) = self.failures.get(text) {
            return Err(err.clone());
        }
        let triggered = self.triggers.lock().unwrap().remove(text);
        for interaction in triggered.unwrap_or_default() {
            self.cache.offer(interaction);
        }
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// 依次返回脚本里的结果，脚本用完后一直返回 "fresh"
pub struct ScriptedTokens {
    script: Mutex<VecDeque<Result<String, TokenError>>>,
    calls: AtomicUsize,
}

impl ScriptedTokens {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for ScriptedTokens {
    async fn acquire_token(&self) -> Result<String, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("fresh".to_string()))
    }
}

/// 回复 "reply-to-{author}"；对 failing 中的作者返回错误
pub struct ScriptedLlm {
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| LlmError::InvalidRequest("no user message".into()))?;
        let author = user.content.split_once(": ").map(|(a, _)| a).unwrap_or("");
        if self.failing.contains(author) {
            return Err(LlmError::Api(format!("scripted failure for {author}")));
        }
        Ok(format!("reply-to-{author}"))
    }
}

pub struct Harness {
    pub coordinator: Coordinator,
    pub cache: Arc<InteractionCache>,
    pub sink: Arc<RecordingSink>,
    pub synth: Arc<ScriptedSynthesizer>,
    pub tokens: Arc<ScriptedTokens>,
    pub llm: Arc<ScriptedLlm>,
    pub responder: Arc<InteractionResponder>,
    pub cancel: CancellationToken,
}

pub struct HarnessBuilder {
    stories: Vec<Story>,
    triggers: HashMap<String, Vec<Interaction>>,
    failures: HashMap<String, SynthesisError>,
    expired_tokens: HashSet<String>,
    token_script: VecDeque<Result<String, TokenError>>,
    failing_authors: HashSet<String>,
    play_delay: Duration,
}

/// 每个故事一个句子列表，故事 id 为 story-0、story-1 ...
pub fn builder(stories: &[&[&str]]) -> HarnessBuilder {
    let stories = stories
        .iter()
        .enumerate()
        .map(|(i, sentences)| {
            Story::new(
                format!("story-{i}"),
                sentences.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect();
    HarnessBuilder {
        stories,
        triggers: HashMap::new(),
        failures: HashMap::new(),
        expired_tokens: HashSet::new(),
        token_script: VecDeque::new(),
        failing_authors: HashSet::new(),
        play_delay: Duration::from_millis(2),
    }
}

impl HarnessBuilder {
    /// 合成 `text` 时注入互动
    pub fn offer_during(mut self, text: &str, interaction: Interaction) -> Self {
        self.triggers
            .entry(text.to_string())
            .or_default()
            .push(interaction);
        self
    }

    pub fn fail_synthesis(mut self, text: &str, err: SynthesisError) -> Self {
        self.failures.insert(text.to_string(), err);
        self
    }

    pub fn expired_token(mut self, token: &str) -> Self {
        self.expired_tokens.insert(token.to_string());
        self
    }

    pub fn token_results(mut self, results: Vec<Result<String, TokenError>>) -> Self {
        self.token_script = results.into();
        self
    }

    pub fn failing_author(mut self, author: &str) -> Self {
        self.failing_authors.insert(author.to_string());
        self
    }

    pub fn play_delay(mut self, delay: Duration) -> Self {
        self.play_delay = delay;
        self
    }

    pub fn build(self) -> Harness {
        let cache = Arc::new(InteractionCache::new());
        let sink = Arc::new(RecordingSink::new(self.play_delay));
        let synth = Arc::new(ScriptedSynthesizer {
            cache: Arc::clone(&cache),
            triggers: Mutex::new(self.triggers),
            failures: self.failures,
            expired_tokens: self.expired_tokens,
            calls: AtomicUsize::new(0),
        });
        let tokens = Arc::new(ScriptedTokens {
            script: Mutex::new(self.token_script),
            calls: AtomicUsize::new(0),
        });
        let llm = Arc::new(ScriptedLlm {
            failing: self.failing_authors,
            calls: AtomicUsize::new(0),
        });
        let playback = Arc::new(PlaybackEngine::new(
            synth.clone(),
            tokens.clone(),
            sink.clone(),
        ));
        let responder = Arc::new(InteractionResponder::new(
            llm.clone(),
            Arc::clone(&playback),
            ResponderSection::default(),
        ));
        let cancel = CancellationToken::new();
        let coordinator = Coordinator::new(
            NarrationCursor::new(self.stories),
            Arc::clone(&cache),
            playback,
            Arc::clone(&responder),
            cancel.clone(),
        );
        Harness {
            coordinator,
            cache,
            sink,
            synth,
            tokens,
            llm,
            responder,
            cancel,
        }
    }
}
