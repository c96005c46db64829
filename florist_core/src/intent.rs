//! Intent classification vocabulary.
//!
//! The classifier maps free text onto a closed set of intents plus any named
//! entities it managed to extract (for example `occasion`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    OrderFlowers,
    AskForRecommendation,
    CheckDeliveryStatus,
    AskAboutPayment,
    Unknown,
}

impl Intent {
    /// Map a classifier label onto the closed set. Unrecognised labels are `Unknown`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "greeting" => Self::Greeting,
            "farewell" => Self::Farewell,
            "order_flowers" => Self::OrderFlowers,
            "ask_for_recommendation" => Self::AskForRecommendation,
            "check_delivery_status" => Self::CheckDeliveryStatus,
            "ask_about_payment" => Self::AskAboutPayment,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::OrderFlowers => "order_flowers",
            Self::AskForRecommendation => "ask_for_recommendation",
            Self::CheckDeliveryStatus => "check_delivery_status",
            Self::AskAboutPayment => "ask_about_payment",
            Self::Unknown => "unknown",
        }
    }

    /// Intents that open the guided recommendation flow.
    #[must_use]
    pub const fn starts_flow(self) -> bool {
        matches!(self, Self::OrderFlowers | Self::AskForRecommendation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    #[serde(default)]
    pub entities: HashMap<String, String>,
}

impl IntentResult {
    #[must_use]
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            entities: HashMap::new(),
        }
    }

    /// Result used whenever classification is unavailable.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(Intent::Unknown)
    }

    #[must_use]
    pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.insert(name.into(), value.into());
        self
    }

    /// Non-blank value of a named entity.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Maps raw text to an [`IntentResult`].
///
/// Implementations never fail: transport or parse problems are logged and
/// reported as [`IntentResult::unknown`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, sender: &str, text: &str) -> IntentResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_closed_set() {
        assert_eq!(Intent::from_label("order_flowers"), Intent::OrderFlowers);
        assert_eq!(Intent::from_label(" greeting "), Intent::Greeting);
        assert_eq!(Intent::from_label("nlu_fallback"), Intent::Unknown);
        assert_eq!(Intent::from_label(""), Intent::Unknown);
    }

    #[test]
    fn label_is_inverse_of_from_label() {
        for intent in [
            Intent::Greeting,
            Intent::Farewell,
            Intent::OrderFlowers,
            Intent::AskForRecommendation,
            Intent::CheckDeliveryStatus,
            Intent::AskAboutPayment,
            Intent::Unknown,
        ] {
            assert_eq!(Intent::from_label(intent.label()), intent);
        }
    }

    #[test]
    fn only_order_intents_start_flow() {
        assert!(Intent::OrderFlowers.starts_flow());
        assert!(Intent::AskForRecommendation.starts_flow());
        assert!(!Intent::Greeting.starts_flow());
        assert!(!Intent::Unknown.starts_flow());
    }

    #[test]
    fn blank_entities_are_absent() {
        let result = IntentResult::new(Intent::OrderFlowers)
            .with_entity("occasion", "  ")
            .with_entity("color", "red");
        assert_eq!(result.entity("occasion"), None);
        assert_eq!(result.entity("color"), Some("red"));
        assert_eq!(result.entity("missing"), None);
    }
}
