use serde::{Deserialize, Serialize};

/// MoodSense の気分記録。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodEntry {
    pub mood: String,
    pub emoji: String,
    #[serde(default)]
    pub journal_entry: String,
    pub energy_level: u8,
    pub sleep_hours: f32,
}

impl MoodEntry {
    pub fn new(mood: String, emoji: String, journal_entry: String) -> Self {
        Self {
            mood,
            emoji,
            journal_entry,
            energy_level: 5,
            sleep_hours: 7.0,
        }
    }
}
