//! 播放层：音频输出、WAV 头补齐、播放引擎

pub mod audio;
pub mod engine;
pub mod wav;

#[cfg(feature = "audio")]
pub use audio::RodioSink;
pub use audio::{match_output_device, AudioError, AudioSink, NullSink};
pub use engine::{AudioOutcome, PlaybackEngine};
pub use wav::{add_wav_header_if_needed, PcmFormat};
