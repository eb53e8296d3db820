//! 为裸 PCM 补 WAV 头
//!
//! 合成服务有时返回不带 RIFF 头的 PCM，声卡解码前需要补齐 44 字节标准头。

use bytes::{BufMut, Bytes, BytesMut};

/// 裸 PCM 的格式参数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

pub fn has_wav_header(audio: &[u8]) -> bool {
    audio.len() > 44 && &audio[..4] == b"RIFF" && &audio[8..12] == b"WAVE"
}

/// 已有 WAV 头时原样返回，否则在前面拼上 PCM 头
pub fn add_wav_header_if_needed(audio: Bytes, format: PcmFormat) -> Bytes {
    if has_wav_header(&audio) {
        return audio;
    }

    let data_size = audio.len() as u32;
    let block_align = format.channels * format.bits_per_sample / 8;
    let byte_rate = format.sample_rate * u32::from(block_align);

    let mut out = BytesMut::with_capacity(44 + audio.len());
    out.put_slice(b"RIFF");
    out.put_u32_le(36 + data_size);
    out.put_slice(b"WAVE");
    out.put_slice(b"fmt ");
    out.put_u32_le(16);
    out.put_u16_le(1); // PCM
    out.put_u16_le(format.channels);
    out.put_u32_le(format.sample_rate);
    out.put_u32_le(byte_rate);
    out.put_u16_le(block_align);
    out.put_u16_le(format.bits_per_sample);
    out.put_slice(b"data");
    out.put_u32_le(data_size);
    out.put_slice(&audio);
    out.freeze()
}
