use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{ScoredPoint, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::eligibility::Criteria;

pub const PAYLOAD_NCT_ID: &str = "nct_id";
pub const PAYLOAD_TITLE: &str = "title";
pub const PAYLOAD_STRUCTURED_CRITERIA: &str = "structured_criteria";

/// Trial metadata stored alongside each vector.
///
/// `structured_criteria` is the JSON-encoded [`Criteria`] text exactly as stored; decoding is
/// left to the retrieval stage so a malformed record only affects its own candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialMetadata {
    pub nct_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_criteria: Option<String>,
}

impl TrialMetadata {
    pub fn new(nct_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            nct_id: nct_id.into(),
            title: title.into(),
            structured_criteria: None,
        }
    }

    /// Encodes `criteria` into the payload.
    pub fn with_criteria(mut self, criteria: &Criteria) -> Self {
        self.structured_criteria = serde_json::to_string(criteria).ok();
        self
    }

    /// Stores raw criteria text as-is.
    pub fn with_raw_criteria(mut self, raw: impl Into<String>) -> Self {
        self.structured_criteria = Some(raw.into());
        self
    }

    pub(crate) fn from_payload(payload: &HashMap<String, QdrantValue>) -> Option<Self> {
        let nct_id = payload.get(PAYLOAD_NCT_ID)?.as_str()?.to_string();

        let title = payload
            .get(PAYLOAD_TITLE)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let structured_criteria = payload
            .get(PAYLOAD_STRUCTURED_CRITERIA)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Some(Self {
            nct_id,
            title,
            structured_criteria,
        })
    }
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialHit {
    /// Point id as reported by the index (numeric ids rendered in decimal).
    pub point_id: String,
    pub score: f32,
    pub metadata: TrialMetadata,
}

impl TrialHit {
    /// Converts a Qdrant result. Points without an id or an `nct_id` payload are logged and
    /// dropped.
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let point_id = match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => n.to_string(),
            Some(PointIdOptions::Uuid(uuid)) => uuid,
            None => {
                warn!(score = point.score, "Search hit has no point id, skipping");
                return None;
            }
        };

        let Some(metadata) = TrialMetadata::from_payload(&point.payload) else {
            warn!(point_id = %point_id, "Search hit has no nct_id payload, skipping");
            return None;
        };

        Some(TrialHit {
            point_id,
            score: point.score,
            metadata,
        })
    }
}
