//! The Exercise Session Service contract.
//!
//! The engine consumes this trait; `memtrain-client` implements it over HTTP,
//! offline, and as a scripted mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ExerciseKind, Item, PacingConfig};

/// Backend that issues exercise items and scores submissions.
#[async_trait]
pub trait ExerciseApi: Send + Sync {
    /// Human-readable service name (e.g. "http").
    fn name(&self) -> &str;

    /// Open a session and receive the items to study.
    async fn start(&self, request: &StartRequest) -> anyhow::Result<StartResponse>;

    /// Submit aligned answers for authoritative scoring.
    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<SubmitResponse>;
}

/// Request to open a new exercise session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub exercise_kind: ExerciseKind,
}

/// Items and settings for a freshly opened session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: String,
    pub target_items: Vec<Item>,
    /// The player's current skill level, if the service tracks one.
    #[serde(default)]
    pub skill_level: Option<i32>,
    /// Service-chosen pacing. When absent the engine computes its own.
    #[serde(default)]
    pub pacing: Option<PacingConfig>,
}

/// Answers for a finished recall phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub session_id: String,
    pub exercise_kind: ExerciseKind,
    /// The items exactly as they were studied.
    pub shown_targets: Vec<Item>,
    /// One answer per target position.
    pub positioned_answers: Vec<String>,
}

/// Authoritative scoring for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub total: usize,
    pub unordered_correct_count: usize,
    pub ordered_correct_count: usize,
    #[serde(default)]
    pub missed_targets: Vec<String>,
    #[serde(default)]
    pub extra_answers: Vec<String>,
    #[serde(default)]
    pub points_earned: i64,
    #[serde(default)]
    pub new_badges: Vec<String>,
    #[serde(default)]
    pub updated_skill_level: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_response_optional_fields() {
        let json = r#"{
            "sessionId": "abc",
            "targetItems": [{"type": "word", "word": "sun"}]
        }"#;
        let response: StartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.session_id, "abc");
        assert_eq!(response.target_items, vec![Item::word("sun")]);
        assert_eq!(response.skill_level, None);
        assert_eq!(response.pacing, None);
    }

    #[test]
    fn submit_request_wire_names() {
        let request = SubmitRequest {
            session_id: "abc".into(),
            exercise_kind: ExerciseKind::SequenceOfDigits,
            shown_targets: vec![Item::digit(1, "tie")],
            positioned_answers: vec!["1".into()],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["exerciseKind"], "SEQUENCE_OF_DIGITS");
        assert_eq!(json["positionedAnswers"][0], "1");
        assert_eq!(json["shownTargets"][0]["hint"], "tie");
    }

    #[test]
    fn submit_response_defaults() {
        let json = r#"{"total": 3, "unorderedCorrectCount": 2, "orderedCorrectCount": 1}"#;
        let response: SubmitResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.points_earned, 0);
        assert!(response.new_badges.is_empty());
        assert_eq!(response.updated_skill_level, None);
    }
}
