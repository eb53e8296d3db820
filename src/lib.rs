//! Storycast - 直播讲故事 Agent
//!
//! 持续把预先写好的故事逐句合成语音播出；直播间来了评论或礼物时，在句子边界暂停，
//! 生成并播出 AI 回复，再从被打断的那一句原样继续。
//!
//! 模块划分：
//! - **interaction**: 互动类型、去重、共享缓存与接入通道
//! - **narration**: 故事加载、分句与朗读游标
//! - **tts**: 语音合成与 Token 获取（阿里云 NLS / 离线实现）
//! - **playback**: 音频输出、WAV 头补齐与播放引擎
//! - **llm**: 回复生成客户端（OpenAI 兼容 / 千问 / Mock）
//! - **responder**: 单条互动的回复与播出
//! - **core**: 协调器状态机、事件、错误与退出信号
//! - **live**: 直播间聊天解析与浏览器监控
//! - **config**: 应用配置加载（TOML + 环境变量）

pub mod config;
pub mod core;
pub mod interaction;
pub mod live;
pub mod llm;
pub mod narration;
pub mod observability;
pub mod playback;
pub mod responder;
pub mod tts;

pub use crate::core::{Coordinator, CoordinatorState, NarrationEvent, StorycastError};
