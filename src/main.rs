//! Storycast - 直播讲故事 Agent
//!
//! 入口：加载 .env 与配置、装配合成 / 播放 / 回复组件、启动直播间监控，然后运行协调器直到故事播完或收到退出信号。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use storycast::config::{load_config, AppConfig, LiveSection};
use storycast::core::{Coordinator, CoordinatorState, ShutdownManager, ShutdownReason};
use storycast::interaction::{feed_channel, FeedSender, InteractionCache};
use storycast::llm::create_llm_from_config;
use storycast::narration::{load_story_dir, NarrationCursor};
use storycast::observability;
use storycast::playback::{AudioSink, NullSink, PcmFormat, PlaybackEngine};
use storycast::responder::InteractionResponder;
use storycast::tts::{
    AliyunSynthesizer, AliyunTokenSource, EchoSynthesizer, SpeechSynthesizer, StaticTokenSource,
    TokenSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let stories = load_story_dir(&cfg.app.story_dir)
        .with_context(|| format!("Failed to load stories from {}", cfg.app.story_dir.display()))?;
    tracing::info!(stories = stories.len(), dir = %cfg.app.story_dir.display(), "Stories loaded");

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let playback = Arc::new(build_playback(&cfg)?);
    playback.warm_up().await;

    let llm = create_llm_from_config(&cfg.llm);
    let responder = Arc::new(InteractionResponder::new(
        llm,
        Arc::clone(&playback),
        cfg.responder.clone(),
    ));

    let cache = Arc::new(InteractionCache::new());
    let (feed_tx, feed_rx) = feed_channel(cfg.live.channel_capacity);
    let pump = tokio::spawn(feed_rx.pump(Arc::clone(&cache), shutdown.token()));

    let live_url = resolve_live_url(&cfg.live).await;
    start_live_watcher(&cfg.live, live_url, feed_tx, shutdown.token())?;

    let mut coordinator = Coordinator::new(
        NarrationCursor::new(stories),
        Arc::clone(&cache),
        playback,
        responder,
        shutdown.token(),
    );
    spawn_snapshot_logger(&coordinator, shutdown.token());

    let state = coordinator.run().await;
    if state == CoordinatorState::Finished && cfg.app.serve_after_stories && !shutdown.is_shutdown() {
        coordinator.serve_until_shutdown().await;
    }

    shutdown.shutdown(ShutdownReason::StoriesFinished);
    let _ = pump.await;
    let snapshot = coordinator.snapshot();
    tracing::info!(
        sentences = snapshot.sentences_spoken,
        replies = snapshot.replies_spoken,
        "Storycast stopped"
    );
    Ok(())
}

/// 合成 / Token / 输出三件套。凭证不全时退回离线合成 + 空输出（dry run）。
fn build_playback(cfg: &AppConfig) -> anyhow::Result<PlaybackEngine> {
    let pcm_format = PcmFormat {
        sample_rate: cfg.audio.raw_sample_rate,
        channels: cfg.audio.raw_channels,
        bits_per_sample: cfg.audio.raw_bits_per_sample,
    };

    let appkey = std::env::var("ALIYUN_NLS_APPKEY").unwrap_or_else(|_| cfg.tts.appkey.clone());
    let online = match (appkey.is_empty(), AliyunTokenSource::from_env(&cfg.token)) {
        (false, Ok(tokens)) => {
            let synthesizer = AliyunSynthesizer::new(&cfg.tts, appkey)
                .context("Failed to create speech synthesizer")?;
            Some((
                Arc::new(synthesizer) as Arc<dyn SpeechSynthesizer>,
                Arc::new(tokens) as Arc<dyn TokenSource>,
            ))
        }
        (true, _) => {
            tracing::warn!("ALIYUN_NLS_APPKEY not set, running offline dry run");
            None
        }
        (false, Err(e)) => {
            tracing::warn!(error = %e, "Speech token source unavailable, running offline dry run");
            None
        }
    };

    let engine = match online {
        Some((synthesizer, tokens)) => PlaybackEngine::new(synthesizer, tokens, build_sink(cfg)?),
        None => PlaybackEngine::new(
            Arc::new(EchoSynthesizer),
            Arc::new(StaticTokenSource::default()),
            Arc::new(NullSink),
        ),
    };
    Ok(engine.with_pcm_format(pcm_format))
}

fn build_sink(cfg: &AppConfig) -> anyhow::Result<Arc<dyn AudioSink>> {
    match cfg.audio.backend.to_lowercase().as_str() {
        "null" => {
            tracing::info!("Audio output disabled");
            Ok(Arc::new(NullSink))
        }
        #[cfg(feature = "audio")]
        _ => {
            let sink = storycast::playback::RodioSink::spawn(&cfg.audio.output_device)
                .context("Failed to open audio output")?;
            Ok(Arc::new(sink))
        }
        #[cfg(not(feature = "audio"))]
        other => {
            tracing::warn!(backend = other, "Built without the audio feature, audio output disabled");
            Ok(Arc::new(NullSink))
        }
    }
}

/// 配置里没有直播间地址时在终端询问；留空表示不监控
async fn resolve_live_url(live: &LiveSection) -> Option<String> {
    let configured = live.url.trim();
    if !configured.is_empty() {
        return Some(configured.to_string());
    }

    println!("请输入直播间地址（留空则不监控评论）：");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    match stdin.read_line(&mut line).await {
        Ok(_) => {
            let url = line.trim();
            (!url.is_empty()).then(|| url.to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read live room url");
            None
        }
    }
}

#[cfg(feature = "browser")]
fn start_live_watcher(
    live: &LiveSection,
    url: Option<String>,
    feed: FeedSender,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let Some(url) = url else {
        tracing::info!("No live room url, interaction monitoring disabled");
        return Ok(());
    };
    let settings = LiveSection {
        url,
        ..live.clone()
    };
    storycast::live::ChatWatcher::new(settings, feed, cancel)
        .spawn()
        .context("Failed to start live chat watcher")?;
    Ok(())
}

#[cfg(not(feature = "browser"))]
fn start_live_watcher(
    _live: &LiveSection,
    url: Option<String>,
    _feed: FeedSender,
    _cancel: CancellationToken,
) -> anyhow::Result<()> {
    if url.is_some() {
        tracing::warn!("Built without the browser feature, interaction monitoring disabled");
    }
    Ok(())
}

/// 状态变化写 debug 日志
fn spawn_snapshot_logger(coordinator: &Coordinator, cancel: CancellationToken) {
    let mut rx = coordinator.subscribe_snapshot();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    tracing::debug!(
                        state = ?snapshot.state,
                        playback = ?snapshot.playback,
                        story = ?snapshot.story_id,
                        index = snapshot.sentence_index,
                        pending = snapshot.pending_interactions,
                        "Narration state"
                    );
                }
            }
        }
    });
}
