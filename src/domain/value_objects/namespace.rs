use crate::domain::value_objects::{EntityKind, FeatureName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ローカル永続ストアの論理パーティション。
///
/// ディスク上のレイアウト:
/// `settings` / `tutorial:<feature>` / `pending-mutations` / `cache:<entity>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Settings,
    Tutorial(FeatureName),
    PendingMutations,
    Cache(EntityKind),
}

impl Namespace {
    pub fn as_key(&self) -> String {
        match self {
            Namespace::Settings => "settings".to_string(),
            Namespace::Tutorial(feature) => format!("tutorial:{feature}"),
            Namespace::PendingMutations => "pending-mutations".to_string(),
            Namespace::Cache(kind) => format!("cache:{kind}"),
        }
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, Namespace::Cache(_))
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        if value == "settings" {
            return Ok(Namespace::Settings);
        }
        if value == "pending-mutations" {
            return Ok(Namespace::PendingMutations);
        }
        if let Some(feature) = value.strip_prefix("tutorial:") {
            return Ok(Namespace::Tutorial(FeatureName::new(feature.to_string())?));
        }
        if let Some(kind) = value.strip_prefix("cache:") {
            return Ok(Namespace::Cache(EntityKind::parse(kind)?));
        }
        Err(format!("Unknown namespace: {value}"))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_round_trip() {
        let namespaces = [
            Namespace::Settings,
            Namespace::PendingMutations,
            Namespace::Tutorial(FeatureName::new("MoodSense".into()).unwrap()),
            Namespace::Cache(EntityKind::MoodEntry),
        ];
        for ns in namespaces {
            assert_eq!(Namespace::parse(&ns.as_key()).unwrap(), ns);
        }
    }

    #[test]
    fn test_unknown_namespace_rejected() {
        assert!(Namespace::parse("scratch").is_err());
        assert!(Namespace::parse("cache:unknown_kind").is_err());
    }
}
