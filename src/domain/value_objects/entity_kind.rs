use serde::{Deserialize, Serialize};
use std::fmt;

/// リモートのどのコレクションを対象とするかを示すタグ。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    MoodEntry,
    Settings,
    TutorialProgress,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::MoodEntry,
        EntityKind::Settings,
        EntityKind::TutorialProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::MoodEntry => "mood_entry",
            EntityKind::Settings => "settings",
            EntityKind::TutorialProgress => "tutorial_progress",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "mood_entry" => Ok(EntityKind::MoodEntry),
            "settings" => Ok(EntityKind::Settings),
            "tutorial_progress" => Ok(EntityKind::TutorialProgress),
            other => Err(format!("Unknown entity kind: {other}")),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
