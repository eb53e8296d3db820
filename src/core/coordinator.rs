//! 协调器：朗读与互动应答之间的状态机
//!
//! 每播完一个单元（句子或回复）才检查一次 paused_requested，播放中途从不切换。
//! 排空互动时持有 interaction_lock，并一直排到「取空后立即复查仍为空」为止；
//! 复查与清除 processing / paused_requested 在缓存的同一把锁内完成。

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;

use super::events::NarrationEvent;
use super::state::{CoordinatorState, NarrationSnapshot, PlaybackState};
use crate::interaction::InteractionCache;
use crate::narration::NarrationCursor;
use crate::playback::{AudioOutcome, PlaybackEngine};
use crate::responder::{InteractionResponder, ReplyOutcome};

const EVENT_CAPACITY: usize = 256;

pub struct Coordinator {
    cursor: NarrationCursor,
    cache: Arc<InteractionCache>,
    playback: Arc<PlaybackEngine>,
    responder: Arc<InteractionResponder>,
    /// 任意时刻最多一次排空
    interaction_lock: Arc<Mutex<()>>,
    cancel: CancellationToken,
    state: CoordinatorState,
    playback_state: PlaybackState,
    sentences_spoken: usize,
    replies_spoken: usize,
    snapshot_tx: watch::Sender<NarrationSnapshot>,
    events_tx: broadcast::Sender<NarrationEvent>,
}

impl Coordinator {
    pub fn new(
        cursor: NarrationCursor,
        cache: Arc<InteractionCache>,
        playback: Arc<PlaybackEngine>,
        responder: Arc<InteractionResponder>,
        cancel: CancellationToken,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(NarrationSnapshot::default());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let mut coordinator = Self {
            cursor,
            cache,
            playback,
            responder,
            interaction_lock: Arc::new(Mutex::new(())),
            cancel,
            state: CoordinatorState::Narrating,
            playback_state: PlaybackState::Idle,
            sentences_spoken: 0,
            replies_spoken: 0,
            snapshot_tx,
            events_tx,
        };
        if coordinator.cursor.is_finished() {
            coordinator.state = CoordinatorState::Finished;
        }
        coordinator.publish();
        coordinator
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<NarrationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NarrationEvent> {
        self.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        NarrationSnapshot {
            state: self.state,
            playback: self.playback_state,
            story_id: self.cursor.story_id().map(String::from),
            sentence_index: self.cursor.sentence_index(),
            pending_sentence: self.cursor.pending_sentence().map(String::from),
            pending_interactions: self.cache.len(),
            sentences_spoken: self.sentences_spoken,
            replies_spoken: self.replies_spoken,
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: NarrationEvent) {
        let _ = self.events_tx.send(event);
    }

    fn set_state(&mut self, state: CoordinatorState, playback: PlaybackState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "Coordinator transition");
        }
        self.state = state;
        self.playback_state = playback;
        self.publish();
    }

    /// 朗读全部故事，期间按单元边界响应互动。返回 Finished，或在取消时返回当时的状态。
    pub async fn run(&mut self) -> CoordinatorState {
        loop {
            // 单元边界：先让出一次，接入侧在检查之前把已到达的互动送进缓存
            tokio::task::yield_now().await;
            if self.cancel.is_cancelled() {
                break;
            }
            if self.cache.paused_requested() {
                self.drain().await;
                continue;
            }

            let Some(unit) = self.cursor.next_unit() else {
                tracing::info!(
                    sentences = self.sentences_spoken,
                    replies = self.replies_spoken,
                    "All stories finished"
                );
                self.set_state(CoordinatorState::Finished, PlaybackState::Idle);
                self.emit(NarrationEvent::Finished);
                break;
            };

            if self.cursor.at_story_start() {
                tracing::info!(story = %unit.story_id, sentences = unit.total, "Starting story");
                self.emit(NarrationEvent::StoryStarted {
                    story_id: unit.story_id.clone(),
                });
            }

            tracing::info!(
                story = %unit.story_id,
                index = unit.index + 1,
                total = unit.total,
                resumed = unit.resumed,
                text = %unit.text,
                "Narrating sentence"
            );
            self.emit(NarrationEvent::SentenceStarted {
                story_id: unit.story_id.clone(),
                index: unit.index,
                text: unit.text.clone(),
                resumed: unit.resumed,
            });

            self.cache.begin_unit();
            self.set_state(CoordinatorState::Narrating, PlaybackState::NarratingSentence);
            let outcome = self.playback.speak(&unit.text).await;
            let interrupted = self.cache.finish_unit();

            match outcome {
                AudioOutcome::Completed if interrupted => {
                    tracing::info!(story = %unit.story_id, index = unit.index + 1, "Sentence interrupted, will replay");
                    self.cursor.mark_interrupted(unit.text);
                    self.emit(NarrationEvent::SentenceInterrupted {
                        story_id: unit.story_id,
                        index: unit.index,
                    });
                }
                AudioOutcome::Completed => {
                    self.sentences_spoken += 1;
                    self.cursor.mark_completed();
                    self.emit(NarrationEvent::SentenceCompleted {
                        story_id: unit.story_id,
                        index: unit.index,
                    });
                }
                AudioOutcome::Failed(reason) => {
                    tracing::warn!(story = %unit.story_id, index = unit.index + 1, %reason, "Sentence skipped");
                    self.cursor.mark_completed();
                    self.emit(NarrationEvent::SentenceSkipped {
                        story_id: unit.story_id,
                        index: unit.index,
                        reason,
                    });
                }
            }
            self.set_state(CoordinatorState::Narrating, PlaybackState::Idle);
        }
        self.state
    }

    /// 故事播完后继续回复互动，直到取消
    pub async fn serve_until_shutdown(&mut self) {
        tracing::info!("Stories finished, still answering interactions");
        let cancel = self.cancel.clone();
        let cache = Arc::clone(&self.cache);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cache.wait_for_pending() => {
                    let state = self.state;
                    self.drain().await;
                    self.set_state(state, PlaybackState::Idle);
                }
            }
        }
    }

    /// 排空互动缓存：逐条回复，直到缓存在清标志的同一把锁内被确认为空
    async fn drain(&mut self) {
        let lock = Arc::clone(&self.interaction_lock);
        let _guard = lock.lock().await;

        let resume_state = self.state;
        self.cache.begin_processing();
        self.set_state(CoordinatorState::Draining, PlaybackState::Idle);

        let mut serviced = 0;
        loop {
            let batch = self.cache.drain_all();
            if batch.is_empty() {
                if self.cache.finish_processing() {
                    break;
                }
                continue;
            }

            tracing::info!(pending = batch.len(), "Servicing interactions");
            self.emit(NarrationEvent::DrainStarted {
                pending: batch.len(),
            });

            for interaction in batch {
                if self.cancel.is_cancelled() {
                    tracing::info!("Shutdown requested, leaving remaining interactions");
                    break;
                }
                self.set_state(
                    CoordinatorState::Draining,
                    PlaybackState::RespondingToInteraction,
                );
                match self.responder.respond(&interaction).await {
                    ReplyOutcome::Spoken { reply } => {
                        self.replies_spoken += 1;
                        self.emit(NarrationEvent::ReplySpoken {
                            author: interaction.author,
                            kind: interaction.kind,
                            reply,
                        });
                    }
                    ReplyOutcome::Skipped(reason) => {
                        self.emit(NarrationEvent::ReplySkipped {
                            author: interaction.author,
                            kind: interaction.kind,
                            reason,
                        });
                    }
                }
                serviced += 1;
            }

            if self.cancel.is_cancelled() {
                let dropped = self.cache.reset();
                if dropped > 0 {
                    tracing::info!(dropped, "Dropped pending interactions on shutdown");
                }
                break;
            }
        }

        let next = match resume_state {
            CoordinatorState::Finished => CoordinatorState::Finished,
            _ => CoordinatorState::Narrating,
        };
        tracing::info!(serviced, "Interactions serviced, resuming");
        self.emit(NarrationEvent::DrainFinished { serviced });
        self.set_state(next, PlaybackState::Idle);
    }
}
