//! 直播间聊天监控（需启用 feature "browser" 且系统已安装 Chrome/Chromium）
//!
//! 在独立 OS 线程里驱动 Headless Chrome：打开直播间，等待聊天列表出现，
//! 之后以 0.5–1.5 s 的随机间隔抓取全部聊天条目文本。每轮结果与上一轮做差分（见 `ChatDiff`），
//! 新条目解析后经 FeedSender 送入互动缓存，线程本身从不接触朗读状态。

use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::diff::ChatDiff;
use super::parse::parse_chat_item;
use crate::config::LiveSection;
use crate::core::StorycastError;
use crate::interaction::FeedSender;

const ANTI_DETECTION_JS: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
Object.defineProperty(navigator, 'languages', { get: () => ['zh-CN', 'zh', 'en'] });
"#;

pub struct ChatWatcher {
    settings: LiveSection,
    feed: FeedSender,
    cancel: CancellationToken,
    diff: ChatDiff,
}

impl ChatWatcher {
    pub fn new(settings: LiveSection, feed: FeedSender, cancel: CancellationToken) -> Self {
        Self {
            settings,
            feed,
            cancel,
            diff: ChatDiff::new(),
        }
    }

    /// 在名为 storycast-live 的线程里运行，直到取消或通道关闭
    pub fn spawn(self) -> Result<thread::JoinHandle<()>, StorycastError> {
        let handle = thread::Builder::new()
            .name("storycast-live".into())
            .spawn(move || {
                let url = self.settings.url.clone();
                if let Err(e) = self.run() {
                    tracing::error!(url = %url, error = %e, "Live chat watcher stopped");
                }
            })?;
        Ok(handle)
    }

    fn launch(&self) -> Result<(Browser, Arc<Tab>), StorycastError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(24 * 3600))
            .args(vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| StorycastError::Browser(format!("Launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| StorycastError::Browser(format!("Chrome launch failed: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| StorycastError::Browser(format!("Browser tab failed: {e}")))?;
        tab.set_default_timeout(Duration::from_secs(self.settings.page_load_timeout_secs));
        Ok((browser, tab))
    }

    fn open_room(&self, tab: &Arc<Tab>) -> Result<(), StorycastError> {
        tracing::info!(url = %self.settings.url, "Opening live room");
        tab.navigate_to(&self.settings.url)
            .map_err(|e| StorycastError::Browser(format!("Navigate failed: {e}")))?;
        tab.wait_for_element("body")
            .map_err(|e| StorycastError::Browser(format!("Page load failed: {e}")))?;
        if let Err(e) = tab.evaluate(ANTI_DETECTION_JS, false) {
            tracing::debug!(error = %e, "Anti detection script failed");
        }

        if let Ok(title) = tab.get_title() {
            tracing::info!(%title, "Live room loaded");
            if title.contains("Eden") {
                tracing::warn!("Possibly redirected by anti-bot page, waiting longer");
                thread::sleep(Duration::from_secs(10));
            }
        }

        tab.wait_for_element_with_custom_timeout(
            &self.settings.chat_list_selector,
            Duration::from_secs(self.settings.page_load_timeout_secs),
        )
        .map_err(|e| StorycastError::Browser(format!("Chat list not found: {e}")))?;
        tracing::info!("Chat list found, monitoring");
        Ok(())
    }

    fn fetch_items(&self, tab: &Arc<Tab>) -> Result<Vec<String>, StorycastError> {
        let selector = serde_json::to_string(&self.settings.chat_item_selector)
            .map_err(|e| StorycastError::Browser(e.to_string()))?;
        let js = format!(
            "JSON.stringify(Array.from(document.querySelectorAll({selector})).map(el => el.textContent || ''))"
        );
        let result = tab
            .evaluate(&js, false)
            .map_err(|e| StorycastError::Browser(format!("Evaluate failed: {e}")))?;
        let raw = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or("[]");
        serde_json::from_str(raw).map_err(|e| StorycastError::Browser(e.to_string()))
    }

    /// 只转发比上一轮新增的条目；返回送入通道的条目数
    fn forward_new(&mut self, items: Vec<String>) -> usize {
        let mut forwarded = 0;
        for raw in self.diff.new_items(items) {
            let Some(item) = parse_chat_item(&raw) else {
                continue;
            };
            tracing::debug!(author = %item.author, text = %item.text, kind = %item.kind, "Chat item");
            if self.feed.on_interaction(&item.author, &item.text, item.kind) {
                forwarded += 1;
            }
        }
        forwarded
    }

    fn poll_delay(&self) -> Duration {
        let min = self.settings.poll_min_ms.min(self.settings.poll_max_ms);
        let max = self.settings.poll_min_ms.max(self.settings.poll_max_ms);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn run(mut self) -> Result<(), StorycastError> {
        let (_browser, tab) = self.launch()?;
        self.open_room(&tab)?;

        while !self.cancel.is_cancelled() && !self.feed.is_closed() {
            match self.fetch_items(&tab) {
                Ok(items) => {
                    let forwarded = self.forward_new(items);
                    if forwarded > 0 {
                        tracing::debug!(forwarded, tracked = self.diff.tracked(), "New chat items");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Fetching chat items failed, skipping this round"),
            }
            thread::sleep(self.poll_delay());
        }
        tracing::info!("Live chat watcher exiting");
        Ok(())
    }
}
