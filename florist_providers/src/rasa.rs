use async_trait::async_trait;
use florist_core::{Intent, IntentClassifier, IntentResult};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

pub const DEFAULT_RASA_URL: &str = "http://localhost:5005/model/parse";

/// Intent classifier backed by a Rasa NLU server.
///
/// Accepts both the `/model/parse` response and the webhook-style list of
/// tracker events. Every failure degrades to [`IntentResult::unknown`].
#[derive(Clone)]
pub struct RasaClassifier {
    client: Client,
    url: String,
}

impl RasaClassifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn try_classify(&self, sender: &str, text: &str) -> anyhow::Result<IntentResult> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "text": text,
                "message_id": sender,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Rasa server returned status {status}: {body}");
        }

        let body = response.json::<Value>().await?;
        parse_response(&body)
            .ok_or_else(|| anyhow::anyhow!("Rasa response has no parse data: {body}"))
    }
}

/// Pull the intent and entities out of either response shape.
fn parse_response(body: &Value) -> Option<IntentResult> {
    match body {
        Value::Array(events) => events
            .iter()
            .rev()
            .find(|event| event["event"] == "user")
            .and_then(|event| parse_data(&event["parse_data"])),
        Value::Object(_) => parse_data(body),
        _ => None,
    }
}

fn parse_data(data: &Value) -> Option<IntentResult> {
    let name = data["intent"]["name"].as_str()?;
    let mut result = IntentResult::new(Intent::from_label(name));

    for entity in data["entities"].as_array().into_iter().flatten() {
        let (Some(key), Some(value)) = (entity["entity"].as_str(), entity_value(&entity["value"]))
        else {
            continue;
        };
        result.entities.entry(key.to_string()).or_insert(value);
    }

    Some(result)
}

fn entity_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl IntentClassifier for RasaClassifier {
    async fn classify(&self, sender: &str, text: &str) -> IntentResult {
        match self.try_classify(sender, text).await {
            Ok(result) => {
                debug!(
                    "Rasa classified message from {sender} as {} with {} entities",
                    result.intent.label(),
                    result.entities.len()
                );
                result
            }
            Err(e) if e.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_connect) => {
                error!("Could not connect to Rasa server at {}: {e}", self.url);
                IntentResult::unknown()
            }
            Err(e) => {
                warn!("Rasa classification failed: {e:#}");
                IntentResult::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_model_parse_response() {
        let body = json!({
            "text": "Хочу букет на свадьбу",
            "intent": {"name": "order_flowers", "confidence": 0.97},
            "entities": [
                {"entity": "occasion", "value": "свадьба", "start": 15, "end": 22},
                {"entity": "occasion", "value": "праздник"},
                {"entity": "quantity", "value": 5}
            ]
        });

        let result = parse_response(&body);
        let result = result.as_ref();
        assert_eq!(result.map(|r| r.intent), Some(Intent::OrderFlowers));
        assert_eq!(result.and_then(|r| r.entity("occasion")), Some("свадьба"));
        assert_eq!(result.and_then(|r| r.entity("quantity")), Some("5"));
    }

    #[test]
    fn parses_last_user_event_from_webhook_list() {
        let body = json!([
            {"event": "user", "parse_data": {"intent": {"name": "greeting"}, "entities": []}},
            {"event": "bot", "text": "Hi"},
            {"event": "user", "parse_data": {"intent": {"name": "ask_about_payment"}}},
            {"event": "action", "name": "action_listen"}
        ]);

        let result = parse_response(&body);
        assert_eq!(result.map(|r| r.intent), Some(Intent::AskAboutPayment));
    }

    #[test]
    fn unknown_label_maps_to_unknown() {
        let body = json!({"intent": {"name": "nlu_fallback"}, "entities": []});
        assert_eq!(
            parse_response(&body).map(|r| r.intent),
            Some(Intent::Unknown)
        );
    }

    #[test]
    fn unparseable_bodies_yield_nothing() {
        assert!(parse_response(&json!([])).is_none());
        assert!(parse_response(&json!({"intent": null})).is_none());
        assert!(parse_response(&json!("oops")).is_none());
        assert!(parse_response(&json!([{"event": "bot"}])).is_none());
    }

    #[tokio::test]
    async fn unreachable_server_degrades_to_unknown() {
        let classifier = RasaClassifier::new("http://127.0.0.1:9/model/parse".to_string());
        let result = classifier.classify("1", "привет").await;
        assert_eq!(result, IntentResult::unknown());
    }
}
