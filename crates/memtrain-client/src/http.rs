//! HTTP client for the Exercise Session Service.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use memtrain_core::error::ServiceError;
use memtrain_core::traits::{
    ExerciseApi, StartRequest, StartResponse, SubmitRequest, SubmitResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Exercise service reached over JSON/HTTP.
pub struct HttpExerciseApi {
    base_url: String,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpExerciseApi {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json");
        if let Some(token) = &self.api_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout_secs)
            } else {
                ServiceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                * 1000;
            return Err(ServiceError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::AuthenticationFailed(body));
        }
        if status == 404 {
            return Err(ServiceError::NotFound(url));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status,
                message: body,
            });
        }

        response.json::<R>().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout_secs)
            } else {
                ServiceError::InvalidResponse(e.to_string())
            }
        })
    }
}

#[async_trait]
impl ExerciseApi for HttpExerciseApi {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(kind = %request.exercise_kind))]
    async fn start(&self, request: &StartRequest) -> anyhow::Result<StartResponse> {
        let url = format!("{}/api/sessions", self.base_url);
        let response: StartResponse = self.post(url, request).await?;
        tracing::debug!(
            session_id = %response.session_id,
            items = response.target_items.len(),
            "session issued"
        );
        Ok(response)
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<SubmitResponse> {
        let url = format!(
            "{}/api/sessions/{}/submit",
            self.base_url, request.session_id
        );
        Ok(self.post(url, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memtrain_core::model::{ExerciseKind, Item};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpExerciseApi {
        HttpExerciseApi::new(&server.uri(), Some("test-token".into()), 5).unwrap()
    }

    fn start_request() -> StartRequest {
        StartRequest {
            exercise_kind: ExerciseKind::SequenceOfWords,
        }
    }

    fn service_error(err: anyhow::Error) -> ServiceError {
        err.downcast::<ServiceError>().unwrap()
    }

    #[tokio::test]
    async fn start_session() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "sessionId": "s-42",
            "targetItems": [
                {"type": "word", "word": "river"},
                {"type": "word", "word": "lamp"}
            ],
            "skillLevel": 3,
            "pacing": {"totalStudySeconds": 20.0, "perItemShowMs": 2500, "interItemGapMs": 625}
        });

        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_partial_json(
                serde_json::json!({"exerciseKind": "SEQUENCE_OF_WORDS"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .expect(1)
            .mount(&server)
            .await;

        let response = api(&server).start(&start_request()).await.unwrap();
        assert_eq!(response.session_id, "s-42");
        assert_eq!(
            response.target_items,
            vec![Item::word("river"), Item::word("lamp")]
        );
        assert_eq!(response.skill_level, Some(3));
        assert_eq!(response.pacing.unwrap().per_item_show_ms, 2500);
    }

    #[tokio::test]
    async fn submit_posts_to_session_path() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/sessions/s-42/submit"))
            .and(body_partial_json(serde_json::json!({
                "sessionId": "s-42",
                "positionedAnswers": ["river", ""]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 2,
                "unorderedCorrectCount": 1,
                "orderedCorrectCount": 1,
                "missedTargets": ["lamp"],
                "pointsEarned": 2,
                "newBadges": ["first-steps"]
            })))
            .mount(&server)
            .await;

        let request = SubmitRequest {
            session_id: "s-42".into(),
            exercise_kind: ExerciseKind::SequenceOfWords,
            shown_targets: vec![Item::word("river"), Item::word("lamp")],
            positioned_answers: vec!["river".into(), String::new()],
        };
        let response = api(&server).submit(&request).await.unwrap();
        assert_eq!(response.unordered_correct_count, 1);
        assert_eq!(response.points_earned, 2);
        assert_eq!(response.new_badges, vec!["first-steps"]);
        assert!(response.extra_answers.is_empty());
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = api(&server).start(&start_request()).await.unwrap_err();
        let err = service_error(err);
        assert!(matches!(err, ServiceError::AuthenticationFailed(ref body) if body == "invalid token"));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn forbidden_is_authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = api(&server).start(&start_request()).await.unwrap_err();
        assert!(matches!(
            service_error(err),
            ServiceError::AuthenticationFailed(_)
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/sessions/gone/submit"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = SubmitRequest {
            session_id: "gone".into(),
            exercise_kind: ExerciseKind::SequenceOfDigits,
            shown_targets: vec![Item::digit(7, "cow")],
            positioned_answers: vec!["7".into()],
        };
        let err = service_error(api(&server).submit(&request).await.unwrap_err());
        assert!(matches!(err, ServiceError::NotFound(ref url) if url.ends_with("/api/sessions/gone/submit")));
    }

    #[tokio::test]
    async fn rate_limiting() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let err = service_error(api(&server).start(&start_request()).await.unwrap_err());
        assert_eq!(err.retry_after_ms(), Some(3000));
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = service_error(api(&server).start(&start_request()).await.unwrap_err());
        assert!(matches!(
            err,
            ServiceError::Api { status: 503, ref message } if message == "maintenance"
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = service_error(api(&server).start(&start_request()).await.unwrap_err());
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let api = HttpExerciseApi::new(&server.uri(), None, 1).unwrap();
        let err = service_error(api.start(&start_request()).await.unwrap_err());
        assert!(matches!(err, ServiceError::Timeout(1)));
    }

    #[tokio::test]
    async fn unreachable_service_is_network_error() {
        let api = HttpExerciseApi::new("http://127.0.0.1:1", None, 5).unwrap();
        let err = service_error(api.start(&start_request()).await.unwrap_err());
        assert!(matches!(err, ServiceError::Network(_)));
    }

    #[test]
    fn trailing_slash_and_empty_token_are_normalized() {
        let api = HttpExerciseApi::new("http://svc.local/", Some(String::new()), 5).unwrap();
        assert_eq!(api.base_url(), "http://svc.local");
        assert!(api.api_token.is_none());
    }
}
