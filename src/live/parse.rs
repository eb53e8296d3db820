//! 直播间聊天条目解析
//!
//! 含「送出了」的条目视为礼物：`昵称送出了小心心` -> (昵称, "送出了小心心")；
//! 其余视为评论，按第一个 `:` / `：` 拆出昵称。拆不开时昵称为空、整条作为内容。

use std::sync::OnceLock;

use regex::Regex;

use crate::interaction::InteractionKind;

const GIFT_MARKER: &str = "送出了";

static COMMENT_RE: OnceLock<Option<Regex>> = OnceLock::new();
static GIFT_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// 解析后的聊天条目
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatItem {
    pub author: String,
    pub text: String,
    pub kind: InteractionKind,
}

fn comment_re() -> Option<&'static Regex> {
    COMMENT_RE
        .get_or_init(|| Regex::new(r"^(.*?)[:：](.*)").ok())
        .as_ref()
}

fn gift_re() -> Option<&'static Regex> {
    GIFT_RE
        .get_or_init(|| Regex::new(r"^(.*?)送出了(.*)").ok())
        .as_ref()
}

/// 解析一条原始文本；空白条目返回 None
pub fn parse_chat_item(raw: &str) -> Option<ChatItem> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let item = if raw.contains(GIFT_MARKER) {
        match gift_re().and_then(|re| re.captures(raw)) {
            Some(caps) => ChatItem {
                author: caps[1].trim().to_string(),
                text: format!("{GIFT_MARKER}{}", caps[2].trim()),
                kind: InteractionKind::Gift,
            },
            None => ChatItem {
                author: String::new(),
                text: raw.to_string(),
                kind: InteractionKind::Gift,
            },
        }
    } else {
        match comment_re().and_then(|re| re.captures(raw)) {
            Some(caps) => ChatItem {
                author: caps[1].trim().to_string(),
                text: caps[2].trim().to_string(),
                kind: InteractionKind::Comment,
            },
            None => ChatItem {
                author: String::new(),
                text: raw.to_string(),
                kind: InteractionKind::Comment,
            },
        }
    };

    (!item.text.is_empty()).then_some(item)
}
