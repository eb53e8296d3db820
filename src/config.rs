//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STORYCAST__*` 覆盖（双下划线表示嵌套，如 `STORYCAST__TTS__VOICE=zhixiaobai`）。
//! 密钥不进配置文件：DASHSCOPE_API_KEY、ALIYUN_AK_ID、ALIYUN_AK_SECRET、ALIYUN_NLS_APPKEY 直接读环境变量。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub responder: ResponderSection,
    pub tts: TtsSection,
    pub token: TokenSection,
    pub audio: AudioSection,
    pub live: LiveSection,
}

/// [app] 段：故事目录、故事播完后是否继续回复互动
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_story_dir")]
    pub story_dir: PathBuf,
    #[serde(default)]
    pub serve_after_stories: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            story_dir: default_story_dir(),
            serve_after_stories: false,
        }
    }
}

fn default_story_dir() -> PathBuf {
    PathBuf::from("story")
}

/// [llm] 段：回复生成后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// qianwen / openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_provider() -> String {
    "qianwen".to_string()
}

fn default_model() -> String {
    "qwen-plus".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

/// [responder] 段：提示词、礼物附加语、欢迎语快捷回复、回复历史上限
#[derive(Debug, Clone, Deserialize)]
pub struct ResponderSection {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_gift_suffix")]
    pub gift_suffix: String,
    /// 文本与其中任一项完全相同时跳过 LLM，直接播欢迎语
    #[serde(default = "default_greeting_triggers")]
    pub greeting_triggers: Vec<String>,
    /// `{author}` 会被替换为观众昵称
    #[serde(default = "default_greeting_template")]
    pub greeting_template: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ResponderSection {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            gift_suffix: default_gift_suffix(),
            greeting_triggers: default_greeting_triggers(),
            greeting_template: default_greeting_template(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_system_prompt() -> String {
    "你是一个友好、幽默的直播助手，负责回答直播间观众的问题和评论。回复要简洁、有趣，不超过50个字。"
        .to_string()
}

fn default_gift_suffix() -> String {
    "这是一个礼物，请表达感谢。".to_string()
}

fn default_greeting_triggers() -> Vec<String> {
    vec!["来了".into()]
}

fn default_greeting_template() -> String {
    "欢迎{author}来到直播间，故事马上继续！".to_string()
}

fn default_history_limit() -> usize {
    100
}

/// [tts] 段：阿里云智能语音交互 RESTful 合成参数
#[derive(Debug, Clone, Deserialize)]
pub struct TtsSection {
    #[serde(default = "default_tts_endpoint")]
    pub endpoint: String,
    /// 可被环境变量 ALIYUN_NLS_APPKEY 覆盖
    #[serde(default)]
    pub appkey: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub speech_rate: i32,
    #[serde(default)]
    pub pitch_rate: i32,
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

impl Default for TtsSection {
    fn default() -> Self {
        Self {
            endpoint: default_tts_endpoint(),
            appkey: String::new(),
            voice: default_voice(),
            format: default_format(),
            sample_rate: default_sample_rate(),
            volume: default_volume(),
            speech_rate: 0,
            pitch_rate: 0,
            timeout_secs: default_tts_timeout(),
        }
    }
}

fn default_tts_endpoint() -> String {
    "https://nls-gateway-cn-shanghai.aliyuncs.com/stream/v1/tts".to_string()
}

fn default_voice() -> String {
    "zhixiaobai".to_string()
}

fn default_format() -> String {
    "wav".to_string()
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_volume() -> u8 {
    50
}

fn default_tts_timeout() -> u64 {
    30
}

/// [token] 段：CreateToken 接口
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSection {
    #[serde(default = "default_token_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_token_timeout")]
    pub timeout_secs: u64,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            endpoint: default_token_endpoint(),
            region: default_region(),
            timeout_secs: default_token_timeout(),
        }
    }
}

fn default_token_endpoint() -> String {
    "https://nls-meta.cn-shanghai.aliyuncs.com".to_string()
}

fn default_region() -> String {
    "cn-shanghai".to_string()
}

fn default_token_timeout() -> u64 {
    15
}

/// [audio] 段：输出后端与裸 PCM 参数（合成结果缺少 WAV 头时使用）
#[derive(Debug, Clone, Deserialize)]
pub struct AudioSection {
    /// rodio / null
    #[serde(default = "default_audio_backend")]
    pub backend: String,
    /// 输出设备名（子串匹配，忽略大小写）；为空使用系统默认设备
    #[serde(default)]
    pub output_device: String,
    #[serde(default = "default_sample_rate")]
    pub raw_sample_rate: u32,
    #[serde(default = "default_raw_channels")]
    pub raw_channels: u16,
    #[serde(default = "default_raw_bits")]
    pub raw_bits_per_sample: u16,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            backend: default_audio_backend(),
            output_device: String::new(),
            raw_sample_rate: default_sample_rate(),
            raw_channels: default_raw_channels(),
            raw_bits_per_sample: default_raw_bits(),
        }
    }
}

fn default_audio_backend() -> String {
    "rodio".to_string()
}

fn default_raw_channels() -> u16 {
    1
}

fn default_raw_bits() -> u16 {
    16
}

/// [live] 段：直播间评论监控
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSection {
    /// 为空时在终端询问；询问也留空则不监控评论
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_poll_min_ms")]
    pub poll_min_ms: u64,
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,
    #[serde(default = "default_chat_list_selector")]
    pub chat_list_selector: String,
    #[serde(default = "default_chat_item_selector")]
    pub chat_item_selector: String,
}

impl Default for LiveSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            channel_capacity: default_channel_capacity(),
            poll_min_ms: default_poll_min_ms(),
            poll_max_ms: default_poll_max_ms(),
            page_load_timeout_secs: default_page_load_timeout(),
            chat_list_selector: default_chat_list_selector(),
            chat_item_selector: default_chat_item_selector(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_poll_min_ms() -> u64 {
    500
}

fn default_poll_max_ms() -> u64 {
    1500
}

fn default_page_load_timeout() -> u64 {
    60
}

fn default_chat_list_selector() -> String {
    "[class*='webcast-chatroom___list']".to_string()
}

fn default_chat_item_selector() -> String {
    "[class*='webcast-chatroom___item']".to_string()
}

/// 从 config 目录加载配置，环境变量 STORYCAST__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STORYCAST__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("STORYCAST")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.story_dir, PathBuf::from("story"));
        assert_eq!(cfg.llm.model, "qwen-plus");
        assert_eq!(cfg.tts.voice, "zhixiaobai");
        assert_eq!(cfg.tts.sample_rate, 24000);
        assert_eq!(cfg.responder.greeting_triggers, vec!["来了".to_string()]);
        assert_eq!(cfg.live.poll_min_ms, 500);
        assert!(cfg.audio.output_device.is_empty());
    }

    #[test]
    fn test_load_explicit_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[tts]\nvoice = \"aixia\"\n\n[app]\nserve_after_stories = true\n\n[audio]\noutput_device = \"CABLE Input\"\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.tts.voice, "aixia");
        assert!(cfg.app.serve_after_stories);
        assert_eq!(cfg.tts.format, "wav");
        assert_eq!(cfg.audio.output_device, "CABLE Input");
        assert_eq!(cfg.audio.backend, "rodio");
    }
}
