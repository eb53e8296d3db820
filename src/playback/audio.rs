//! 音频输出协作方
//!
//! `AudioSink::play` 在声卡播完之前不返回，这是协调器判断「一个单元结束」的同步点。
//! `rodio::OutputStream` 在部分平台上是 `!Send`，因此 RodioSink 把它封闭在独立的音频线程里，
//! 异步侧只持有命令通道。

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Failed to open audio output: {0}")]
    OutputUnavailable(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Audio thread stopped")]
    ThreadStopped,
}

/// play(bytes) -> 播完后返回 | 失败
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: Bytes) -> Result<(), AudioError>;
}

/// 丢弃音频，立即返回（dry run）
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, audio: Bytes) -> Result<(), AudioError> {
        tracing::debug!(bytes = audio.len(), "Null sink swallowed audio");
        Ok(())
    }
}

/// 在设备名列表里找第一个包含 `wanted`（忽略大小写）的设备下标；`wanted` 为空表示默认设备
pub fn match_output_device<S: AsRef<str>>(names: &[S], wanted: &str) -> Option<usize> {
    let wanted = wanted.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    names
        .iter()
        .position(|name| name.as_ref().to_lowercase().contains(&wanted))
}

#[cfg(feature = "audio")]
pub use rodio_sink::RodioSink;

#[cfg(feature = "audio")]
mod rodio_sink {
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::thread;

    use async_trait::async_trait;
    use bytes::Bytes;
    use rodio::cpal::traits::{DeviceTrait, HostTrait};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use tokio::sync::oneshot;

    use super::{match_output_device, AudioError, AudioSink};

    struct PlayCommand {
        audio: Bytes,
        reply: oneshot::Sender<Result<(), AudioError>>,
    }

    /// 指定（或默认）输出设备上的阻塞式播放
    pub struct RodioSink {
        cmd_tx: mpsc::Sender<PlayCommand>,
    }

    impl RodioSink {
        /// 启动音频线程并打开输出设备。`output_device` 为设备名子串（如虚拟声卡 "CABLE Input"），
        /// 为空时用系统默认设备；找不到匹配设备时列出可用设备并退回默认设备。
        pub fn spawn(output_device: &str) -> Result<Self, AudioError> {
            let (cmd_tx, cmd_rx) = mpsc::channel::<PlayCommand>();
            let (init_tx, init_rx) = mpsc::channel::<Result<(), AudioError>>();
            let wanted = output_device.to_string();

            thread::Builder::new()
                .name("storycast-audio".into())
                .spawn(move || Self::run(&wanted, cmd_rx, init_tx))
                .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;

            init_rx.recv().map_err(|_| AudioError::ThreadStopped)??;
            Ok(Self { cmd_tx })
        }

        fn open_stream(wanted: &str) -> Result<(OutputStream, OutputStreamHandle), AudioError> {
            if wanted.trim().is_empty() {
                tracing::info!("Audio playback on default output device");
                return OutputStream::try_default()
                    .map_err(|e| AudioError::OutputUnavailable(e.to_string()));
            }

            let host = rodio::cpal::default_host();
            let devices: Vec<_> = host
                .output_devices()
                .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?
                .collect();
            let names: Vec<String> = devices
                .iter()
                .map(|d| d.name().unwrap_or_default())
                .collect();

            match match_output_device(&names, wanted).and_then(|i| devices.get(i).zip(names.get(i))) {
                Some((device, name)) => {
                    tracing::info!(device = %name, "Audio playback on selected output device");
                    OutputStream::try_from_device(device)
                        .map_err(|e| AudioError::OutputUnavailable(format!("{name}: {e}")))
                }
                None => {
                    tracing::warn!(
                        wanted,
                        available = ?names,
                        "Output device not found, falling back to default"
                    );
                    OutputStream::try_default()
                        .map_err(|e| AudioError::OutputUnavailable(e.to_string()))
                }
            }
        }

        fn run(
            wanted: &str,
            cmd_rx: mpsc::Receiver<PlayCommand>,
            init_tx: mpsc::Sender<Result<(), AudioError>>,
        ) {
            let (_stream, handle) = match Self::open_stream(wanted) {
                Ok(pair) => {
                    let _ = init_tx.send(Ok(()));
                    pair
                }
                Err(e) => {
                    let _ = init_tx.send(Err(e));
                    return;
                }
            };

            // 所有发送端关闭后退出
            while let Ok(cmd) = cmd_rx.recv() {
                let _ = cmd.reply.send(Self::play_blocking(&handle, cmd.audio));
            }
            tracing::debug!("Audio thread exiting");
        }

        fn play_blocking(handle: &OutputStreamHandle, audio: Bytes) -> Result<(), AudioError> {
            let sink = Sink::try_new(handle)
                .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;
            let source =
                Decoder::new(Cursor::new(audio)).map_err(|e| AudioError::Decode(e.to_string()))?;
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        }
    }

    #[async_trait]
    impl AudioSink for RodioSink {
        async fn play(&self, audio: Bytes) -> Result<(), AudioError> {
            let (reply, done) = oneshot::channel();
            self.cmd_tx
                .send(PlayCommand { audio, reply })
                .map_err(|_| AudioError::ThreadStopped)?;
            done.await.map_err(|_| AudioError::ThreadStopped)?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_output_device_by_substring() {
        let names = ["Speakers (Realtek Audio)", "CABLE Input (VB-Audio Virtual Cable)", "cable output"];
        assert_eq!(match_output_device(&names, "CABLE"), Some(1));
        assert_eq!(match_output_device(&names, "  realtek "), Some(0));
        assert_eq!(match_output_device(&names, "cable output"), Some(2));
    }

    #[test]
    fn test_match_output_device_empty_or_missing() {
        let names = vec!["Speakers".to_string()];
        assert_eq!(match_output_device(&names, ""), None);
        assert_eq!(match_output_device(&names, "   "), None);
        assert_eq!(match_output_device(&names, "Headphones"), None);
        assert_eq!(match_output_device::<String>(&[], "Speakers"), None);
    }

    #[tokio::test]
    async fn test_null_sink_returns_immediately() {
        assert!(NullSink.play(Bytes::from_static(b"RIFF")).await.is_ok());
    }
}
