//! Session controller: `Idle -> Study -> Recall -> Summary -> Idle`.
//!
//! Owns the session record, its study scheduler and its recall answers, and
//! is the only component that talks to the exercise service. Methods take
//! `&mut self`, so at most one service call can be in flight per controller.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SessionStartError, SubmissionError};
use crate::model::{ExerciseKind, ExerciseSession, Item, PacingConfig, SessionPhase};
use crate::pacing::PacingPolicy;
use crate::recall::RecallCollector;
use crate::reconcile::reconcile;
use crate::scheduler::{PlaybackEvent, RevealPosition, RevealTick, StudyEvent, StudyScheduler};
use crate::summary::SessionSummary;
use crate::traits::{ExerciseApi, StartRequest, StartResponse, SubmitRequest};

/// Configuration for the session controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Bounds and tiers used to compute or sanitize pacing.
    pub pacing: PacingPolicy,
    /// Pause after the last item before recall starts.
    pub trailing_pause: Duration,
}

/// A service call the controller may be waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCall {
    Start,
    Submit,
}

/// Receives controller state changes so a front-end can render them.
pub trait SessionObserver: Send + Sync {
    fn on_phase_change(&self, from: SessionPhase, to: SessionPhase);
    fn on_loading(&self, call: ApiCall, loading: bool);
    fn on_error(&self, message: &str);
}

/// No-op session observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_phase_change(&self, _: SessionPhase, _: SessionPhase) {}
    fn on_loading(&self, _: ApiCall, _: bool) {}
    fn on_error(&self, _: &str) {}
}

/// The top-level exercise state machine.
pub struct SessionController {
    api: Arc<dyn ExerciseApi>,
    config: ControllerConfig,
    observer: Arc<dyn SessionObserver>,
    phase: SessionPhase,
    session: Option<ExerciseSession>,
    scheduler: Option<StudyScheduler>,
    recall: Option<RecallCollector>,
    summary: Option<SessionSummary>,
    loading: Option<ApiCall>,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(api: Arc<dyn ExerciseApi>, config: ControllerConfig) -> Self {
        Self {
            api,
            config,
            observer: Arc::new(NoopObserver),
            phase: SessionPhase::Idle,
            session: None,
            scheduler: None,
            recall: None,
            summary: None,
            loading: None,
            last_error: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&ExerciseSession> {
        self.session.as_ref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// The service call currently in flight, if any.
    pub fn loading(&self) -> Option<ApiCall> {
        self.loading
    }

    /// Message for the most recent recoverable error, until dismissed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn recall(&self) -> Option<&RecallCollector> {
        self.recall.as_ref()
    }

    /// Mutable access to the answers, only while in `Recall`.
    pub fn recall_mut(&mut self) -> Option<&mut RecallCollector> {
        if self.phase != SessionPhase::Recall {
            return None;
        }
        self.recall.as_mut()
    }

    pub fn reveal_position(&self) -> Option<RevealPosition> {
        self.scheduler.as_ref().map(StudyScheduler::position)
    }

    /// The item on screen right now, if any.
    pub fn visible_item(&self) -> Option<&Item> {
        let position = self.reveal_position()?;
        if position.tick != RevealTick::Show {
            return None;
        }
        self.session.as_ref()?.target_items().get(position.index)
    }

    pub fn is_study_paused(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(StudyScheduler::is_paused)
    }

    /// Open a session with the service and begin the study phase.
    ///
    /// On failure the controller stays in `Idle` and the error is kept as a
    /// dismissible message; calling again retries.
    pub async fn start_session(
        &mut self,
        kind: ExerciseKind,
    ) -> Result<&ExerciseSession, SessionStartError> {
        if self.phase != SessionPhase::Idle {
            return Err(SessionStartError::InvalidPhase(self.phase));
        }
        // Nothing from an earlier session may outlive the start of a new one.
        self.teardown_scheduler();
        self.last_error = None;

        let request = StartRequest {
            exercise_kind: kind,
        };
        self.begin_call(ApiCall::Start);
        let result = self.api.start(&request).await;
        self.end_call(ApiCall::Start);

        let built = match result {
            Ok(response) => self.build_session(kind, response),
            Err(e) => Err(SessionStartError::Request(e)),
        };
        let (session, item_count) = match built {
            Ok(built) => built,
            Err(err) => {
                self.record_error(&err.to_string());
                return Err(err);
            }
        };

        let scheduler = StudyScheduler::start(
            session.session_id(),
            item_count,
            session.pacing(),
            self.config.trailing_pause,
        );
        tracing::info!(
            session_id = session.session_id(),
            kind = %kind,
            items = session.item_count(),
            skill_level = ?session.skill_level(),
            "session started"
        );

        self.scheduler = Some(scheduler);
        self.set_phase(SessionPhase::Study);
        Ok(self.session.insert(session))
    }

    fn build_session(
        &self,
        kind: ExerciseKind,
        response: StartResponse,
    ) -> Result<(ExerciseSession, NonZeroUsize), SessionStartError> {
        let Some(item_count) = NonZeroUsize::new(response.target_items.len()) else {
            return Err(SessionStartError::NoItems);
        };
        if !response.target_items.iter().all(|item| kind.accepts(item)) {
            return Err(SessionStartError::MismatchedItems(kind));
        }

        let pacing: PacingConfig = match response.pacing {
            Some(pacing) => self.config.pacing.sanitize(pacing),
            None => self
                .config
                .pacing
                .compute(response.target_items.len(), response.skill_level)?,
        };

        let session = ExerciseSession::new(
            response.session_id,
            kind,
            response.target_items,
            response.skill_level,
            pacing,
        );
        Ok((session, item_count))
    }

    /// Wait for the next study transition of the current session.
    ///
    /// Moves to `Recall` when playback reports completion. Returns `None`
    /// outside the study phase and, while paused, only resolves once the
    /// session is torn down, so race it against user input. Cancel-safe.
    pub async fn next_study_event(&mut self) -> Option<StudyEvent> {
        loop {
            let scheduler = self.scheduler.as_mut()?;
            let event = scheduler.next_event().await?;

            let current = self.session.as_ref().map(ExerciseSession::session_id);
            if current != Some(&*event.session_id) {
                tracing::warn!(
                    stale_session = %event.session_id,
                    "discarding study event from a previous session"
                );
                continue;
            }
            if event.event == PlaybackEvent::Complete {
                self.complete_study();
            }
            return Some(event);
        }
    }

    pub fn pause_study(&mut self) -> Option<StudyEvent> {
        self.scheduler.as_mut()?.pause()
    }

    pub fn resume_study(&mut self) -> Option<StudyEvent> {
        self.scheduler.as_mut()?.resume()
    }

    /// Show the next item while paused. Skipping past the last item ends
    /// the study phase.
    pub fn skip_ahead(&mut self) -> Option<StudyEvent> {
        let event = self.scheduler.as_mut()?.skip_next()?;
        if event.event == PlaybackEvent::Complete {
            self.complete_study();
        }
        Some(event)
    }

    fn complete_study(&mut self) {
        if self.phase != SessionPhase::Study {
            return;
        }
        self.teardown_scheduler();
        let Some(session) = &self.session else {
            return;
        };
        self.recall = Some(RecallCollector::new(
            session.recall_mode(),
            session.item_count(),
        ));
        tracing::info!(session_id = session.session_id(), "study complete");
        self.set_phase(SessionPhase::Recall);
    }

    /// Reconcile the recall answers locally and submit them for scoring.
    ///
    /// On failure the controller stays in `Recall` with every answer intact.
    pub async fn submit(&mut self) -> Result<&SessionSummary, SubmissionError> {
        if self.phase != SessionPhase::Recall {
            return Err(SubmissionError::InvalidPhase(self.phase));
        }
        let (Some(session), Some(recall)) = (&self.session, &self.recall) else {
            return Err(SubmissionError::InvalidPhase(self.phase));
        };

        let local = reconcile(
            session.target_items(),
            recall.entries(),
            session.recall_mode(),
        );
        let request = SubmitRequest {
            session_id: session.session_id().to_string(),
            exercise_kind: session.exercise_kind(),
            shown_targets: session.target_items().to_vec(),
            positioned_answers: local.positioned_answers.clone(),
        };
        let skill_level = session.skill_level();
        let pacing = *session.pacing();

        self.begin_call(ApiCall::Submit);
        let result = self.api.submit(&request).await;
        self.end_call(ApiCall::Submit);

        let server = match result {
            Ok(server) => server,
            Err(e) => {
                let err = SubmissionError::Request(e);
                self.record_error(&err.to_string());
                return Err(err);
            }
        };

        let summary = SessionSummary {
            session_id: request.session_id,
            exercise_kind: request.exercise_kind,
            shown_targets: request.shown_targets,
            skill_level,
            pacing,
            local,
            server,
            completed_at: chrono::Utc::now(),
        };
        if summary.has_discrepancy() {
            tracing::warn!(
                session_id = %summary.session_id,
                local_unordered = summary.local.unordered_correct_count,
                server_unordered = summary.server.unordered_correct_count,
                local_ordered = summary.local.ordered_correct_count,
                server_ordered = summary.server.ordered_correct_count,
                "local reconciliation disagrees with service scoring, using service result"
            );
        }
        tracing::info!(
            session_id = %summary.session_id,
            correct = summary.server.unordered_correct_count,
            total = summary.server.total,
            points = summary.server.points_earned,
            "session submitted"
        );

        self.set_phase(SessionPhase::Summary);
        Ok(self.summary.insert(summary))
    }

    /// Discard the session from any phase and return to `Idle`.
    pub fn reset(&mut self) {
        self.teardown_scheduler();
        if let Some(session) = self.session.take() {
            tracing::info!(session_id = session.session_id(), phase = %self.phase, "session reset");
        }
        self.recall = None;
        self.summary = None;
        self.loading = None;
        self.last_error = None;
        self.set_phase(SessionPhase::Idle);
    }

    fn teardown_scheduler(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.cancel();
        }
    }

    fn set_phase(&mut self, to: SessionPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        tracing::debug!(%from, %to, "phase change");
        self.observer.on_phase_change(from, to);
    }

    fn begin_call(&mut self, call: ApiCall) {
        self.loading = Some(call);
        self.observer.on_loading(call, true);
    }

    fn end_call(&mut self, call: ApiCall) {
        self.loading = None;
        self.observer.on_loading(call, false);
    }

    fn record_error(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.last_error = Some(message.to_string());
        self.observer.on_error(message);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.teardown_scheduler();
    }
}
