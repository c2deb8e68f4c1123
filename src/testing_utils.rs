use crate::api::{ApiOutcome, ApiSource, Record};
use serde_json::Value;
use std::sync::Mutex;

/// A request seen by [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl ApiCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory [`ApiSource`] answering every request through a closure and
/// remembering what was asked, in order.
pub struct ScriptedApi<F>
where
    F: Fn(&ApiCall) -> ApiOutcome,
{
    respond: F,
    calls: Mutex<Vec<ApiCall>>,
}

impl<F> ScriptedApi<F>
where
    F: Fn(&ApiCall) -> ApiOutcome,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl<F> ApiSource for ScriptedApi<F>
where
    F: Fn(&ApiCall) -> ApiOutcome,
{
    async fn get(&self, path: &str, params: &[(&str, String)]) -> ApiOutcome {
        let call = ApiCall {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        };
        let outcome = (self.respond)(&call);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
        outcome
    }
}

/// Test utilities for building API payloads
pub struct TestDataBuilder;

impl TestDataBuilder {
    /// Converts a JSON object literal into a record. Non-objects become an empty record.
    pub fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// `count` records with sequential ids starting at `first_id`, each tagged with `label`.
    pub fn records_with_ids(first_id: i64, count: usize, label: &str) -> Vec<Record> {
        (0..count as i64)
            .map(|offset| {
                Self::record(serde_json::json!({
                    "id": first_id + offset,
                    "label": label,
                }))
            })
            .collect()
    }

    /// A `/games` style payload for the given ids.
    pub fn games(ids: &[i64]) -> Vec<Record> {
        ids.iter()
            .map(|id| {
                Self::record(serde_json::json!({"id": id, "homeTeam": "Home", "awayTeam": "Away"}))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_api_records_calls() {
        let api = ScriptedApi::new(|call| {
            if call.param("week") == Some("2") {
                ApiOutcome::NoData
            } else {
                ApiOutcome::Records(TestDataBuilder::records_with_ids(1, 2, "x"))
            }
        });

        let first = api.get("/plays", &[("week", "1".to_string())]).await;
        let second = api.get("/plays", &[("week", "2".to_string())]).await;

        assert!(matches!(first, ApiOutcome::Records(ref r) if r.len() == 2));
        assert!(matches!(second, ApiOutcome::NoData));
        assert_eq!(api.call_count(), 2);
        assert_eq!(api.calls()[1].param("week"), Some("2"));
    }

    #[test]
    fn test_builder_records() {
        let records = TestDataBuilder::records_with_ids(10, 3, "regular");
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["id"], 12);
        assert_eq!(records[0]["label"], "regular");
        assert_eq!(TestDataBuilder::games(&[5, 6])[1]["id"], 6);
    }
}
