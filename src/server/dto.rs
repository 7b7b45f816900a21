use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::admin::SyncReport;
use crate::standings::RankedList;

#[derive(Debug, Deserialize)]
pub struct AddPlayerRequest {
    pub name: String,
}

/// `delta` arrives either as a JSON number or as the raw text an operator
/// typed.
#[derive(Debug, Deserialize)]
pub struct ScoreDeltaRequest {
    pub delta: Value,
}

impl ScoreDeltaRequest {
    pub fn raw(&self) -> String {
        match &self.delta {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    #[serde(flatten)]
    pub report: SyncReport,
    pub players: RankedList,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
