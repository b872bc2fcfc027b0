//! Mock exercise service for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use memtrain_core::error::ServiceError;
use memtrain_core::model::Item;
use memtrain_core::reconcile::reconcile_fixed_slot;
use memtrain_core::traits::{
    ExerciseApi, StartRequest, StartResponse, SubmitRequest, SubmitResponse,
};

/// A mock exercise service for driving the session controller without a
/// real backend.
///
/// Always issues the same session and scores submissions by comparing the
/// positioned answers against the shown targets.
pub struct MockExerciseApi {
    start_response: StartResponse,
    /// Number of upcoming start calls that fail.
    start_failures: AtomicU32,
    /// Number of upcoming submit calls that fail.
    submit_failures: AtomicU32,
    start_calls: AtomicU32,
    submit_calls: AtomicU32,
    last_submit: Mutex<Option<SubmitRequest>>,
}

impl MockExerciseApi {
    /// Create a mock that answers every start with `response`.
    pub fn new(response: StartResponse) -> Self {
        Self {
            start_response: response,
            start_failures: AtomicU32::new(0),
            submit_failures: AtomicU32::new(0),
            start_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            last_submit: Mutex::new(None),
        }
    }

    /// Create a mock issuing `items` with no skill level or pacing.
    pub fn with_items(session_id: &str, items: Vec<Item>) -> Self {
        Self::new(StartResponse {
            session_id: session_id.to_string(),
            target_items: items,
            skill_level: None,
            pacing: None,
        })
    }

    /// Make the next `n` start calls fail with a network error.
    pub fn fail_next_starts(&self, n: u32) {
        self.start_failures.store(n, Ordering::Relaxed);
    }

    /// Make the next `n` submit calls fail with a network error.
    pub fn fail_next_submits(&self, n: u32) {
        self.submit_failures.store(n, Ordering::Relaxed);
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::Relaxed)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    /// Get the last submission received, failed or not.
    pub fn last_submit(&self) -> Option<SubmitRequest> {
        self.last_submit
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl ExerciseApi for MockExerciseApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self, _request: &StartRequest) -> anyhow::Result<StartResponse> {
        self.start_calls.fetch_add(1, Ordering::Relaxed);
        if take_failure(&self.start_failures) {
            return Err(ServiceError::Network("mock start failure".into()).into());
        }
        Ok(self.start_response.clone())
    }

    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<SubmitResponse> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_submit.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        if take_failure(&self.submit_failures) {
            return Err(ServiceError::Network("mock submit failure".into()).into());
        }

        let labels: Vec<String> = request
            .shown_targets
            .iter()
            .map(|item| item.label().into_owned())
            .collect();
        let result = reconcile_fixed_slot(&labels, &request.positioned_answers);

        Ok(SubmitResponse {
            total: labels.len(),
            unordered_correct_count: result.unordered_correct_count,
            ordered_correct_count: result.ordered_correct_count,
            missed_targets: result.missed_targets.into_iter().collect(),
            extra_answers: result.extra_answers.into_iter().collect(),
            points_earned: (result.unordered_correct_count + result.ordered_correct_count) as i64,
            new_badges: vec![],
            updated_skill_level: None,
        })
    }
}
