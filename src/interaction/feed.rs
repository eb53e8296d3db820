//! 互动接入通道：抓取线程 -> 有界通道 -> 缓存
//!
//! 抓取侧只调用 `FeedSender::on_interaction`，从不阻塞，也不接触朗读状态；
//! 通道满时丢弃并告警。`FeedReceiver::pump` 在异步侧把消息转交给 InteractionCache。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::cache::InteractionCache;
use super::types::{Interaction, InteractionKind};

/// 创建一对接入端，capacity 至少为 1
pub fn channel(capacity: usize) -> (FeedSender, FeedReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FeedSender { tx }, FeedReceiver { rx })
}

/// 抓取侧句柄，可跨线程克隆
#[derive(Clone, Debug)]
pub struct FeedSender {
    tx: mpsc::Sender<Interaction>,
}

impl FeedSender {
    /// 每条已解析的评论 / 礼物调用一次；可在任意非播放线程调用。返回是否入队。
    pub fn on_interaction(&self, author: &str, text: &str, kind: InteractionKind) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        match self.tx.try_send(Interaction::new(author.trim(), text, kind)) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(author = %dropped.author, "Interaction feed full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Debug)]
pub struct FeedReceiver {
    rx: mpsc::Receiver<Interaction>,
}

impl FeedReceiver {
    /// 持续把接入的互动转交缓存，直到所有发送端关闭或收到取消
    pub async fn pump(mut self, cache: Arc<InteractionCache>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                item = self.rx.recv() => match item {
                    Some(interaction) => {
                        cache.offer(interaction);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Interaction feed pump stopped");
    }
}
