use serde::{Deserialize, Serialize};

/// ユーザーごとに1件だけ存在する設定スナップショット。
/// 保存のたびに丸ごと上書きされ、差分としてキューに積まれることはない
/// （最後のローカル書き込みが勝つ）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsSnapshot {
    pub dark_mode: bool,
    pub high_contrast: bool,
    pub large_text: bool,
    pub voice_navigation: bool,
    pub notifications: bool,
    pub font_size: u16,
    pub voice_speed: f32,
    pub voice_pitch: f32,
    pub language: String,
    pub dyslexia_font: String,
    pub color_blind_mode: String,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            dark_mode: false,
            high_contrast: false,
            large_text: false,
            voice_navigation: false,
            notifications: true,
            font_size: 16,
            voice_speed: 1.0,
            voice_pitch: 1.0,
            language: "en".to_string(),
            dyslexia_font: "default".to_string(),
            color_blind_mode: "none".to_string(),
        }
    }
}
