use crate::domain::value_objects::FeatureName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// (ユーザー, 機能) ごとのチュートリアル進捗。クライアントからは削除しない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TutorialProgress {
    pub feature_name: FeatureName,
    /// 完了したステップの集合。挿入順は意味を持たない。
    pub completed_step_ids: BTreeSet<String>,
    pub last_step_id: Option<String>,
    /// completed / total から毎回再計算される派生値。独立にドリフトしない。
    pub progress_percentage: u8,
    pub is_completed: bool,
    pub skipped: bool,
    pub completion_date: Option<DateTime<Utc>>,
}

impl TutorialProgress {
    pub fn start(feature_name: FeatureName) -> Self {
        Self {
            feature_name,
            completed_step_ids: BTreeSet::new(),
            last_step_id: None,
            progress_percentage: 0,
            is_completed: false,
            skipped: false,
            completion_date: None,
        }
    }

    /// 終端フラグが立った進捗は閉じたものとして扱い、UIは再表示しない。
    pub fn is_closed(&self) -> bool {
        self.is_completed || self.skipped
    }

    pub fn record_step(&mut self, step_id: &str, total_steps: usize) {
        self.completed_step_ids.insert(step_id.to_string());
        self.last_step_id = Some(step_id.to_string());
        self.recompute_percentage(total_steps);
    }

    pub fn complete(&mut self, all_step_ids: impl IntoIterator<Item = String>) {
        self.completed_step_ids.extend(all_step_ids);
        self.is_completed = true;
        self.progress_percentage = 100;
        self.completion_date = Some(Utc::now());
    }

    pub fn skip(&mut self) {
        self.skipped = true;
        self.progress_percentage = 0;
    }

    fn recompute_percentage(&mut self, total_steps: usize) {
        if total_steps == 0 {
            self.progress_percentage = 0;
            return;
        }
        let ratio = self.completed_step_ids.len() as f64 / total_steps as f64;
        self.progress_percentage = (ratio * 100.0).round().min(100.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature() -> FeatureName {
        FeatureName::new("MoodSense".into()).unwrap()
    }

    #[test]
    fn test_percentage_recomputed_from_step_set() {
        let mut progress = TutorialProgress::start(feature());
        // 以前の値がどうであれ、集合サイズから再計算される
        progress.progress_percentage = 93;
        progress.record_step("a", 4);
        progress.record_step("b", 4);
        assert_eq!(progress.progress_percentage, 50);
        assert_eq!(progress.last_step_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_duplicate_steps_do_not_inflate_percentage() {
        let mut progress = TutorialProgress::start(feature());
        progress.record_step("a", 2);
        progress.record_step("a", 2);
        assert_eq!(progress.progress_percentage, 50);
    }

    #[test]
    fn test_complete_and_skip_close_the_record() {
        let mut done = TutorialProgress::start(feature());
        done.complete(["a".to_string(), "b".to_string()]);
        assert!(done.is_closed());
        assert_eq!(done.progress_percentage, 100);
        assert!(done.completion_date.is_some());

        let mut skipped = TutorialProgress::start(feature());
        skipped.skip();
        assert!(skipped.is_closed());
        assert_eq!(skipped.progress_percentage, 0);
    }
}
