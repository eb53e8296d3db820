//! 观众互动：评论 / 礼物
//!
//! 由抓取侧创建，交给缓存去重后被 Responder 恰好消费一次；创建后不再修改。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::Serialize;

/// 互动类型（评论与礼物共享同一去重键空间）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Comment,
    Gift,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Gift => "gift",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comment" | "评论" => Ok(Self::Comment),
            "gift" | "礼物" => Ok(Self::Gift),
            other => Err(format!("Unknown interaction kind: {other}")),
        }
    }
}

/// 去重键：(author, text)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub author: String,
    pub text: String,
}

/// 单条观众互动
#[derive(Clone, Debug, Serialize)]
pub struct Interaction {
    pub author: String,
    pub text: String,
    pub kind: InteractionKind,
    pub received_at: DateTime<Local>,
}

impl Interaction {
    pub fn new(author: impl Into<String>, text: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            kind,
            received_at: Local::now(),
        }
    }

    pub fn comment(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, text, InteractionKind::Comment)
    }

    pub fn gift(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, text, InteractionKind::Gift)
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            author: self.author.clone(),
            text: self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("comment".parse::<InteractionKind>().unwrap(), InteractionKind::Comment);
        assert_eq!("GIFT".parse::<InteractionKind>().unwrap(), InteractionKind::Gift);
        assert_eq!("礼物".parse::<InteractionKind>().unwrap(), InteractionKind::Gift);
        assert!("like".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn test_identity_key_ignores_kind() {
        let a = Interaction::comment("u1", "666");
        let b = Interaction::gift("u1", "666");
        assert_eq!(a.identity_key(), b.identity_key());
    }
}
