//! memtrain-core: Timed study/recall exercise engine.
//!
//! This crate holds the session state machine and everything it is built
//! from: pacing, the study scheduler, recall collection, reconciliation and
//! the contract for the exercise service that issues and scores sessions.

pub mod error;
pub mod model;
pub mod pacing;
pub mod recall;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod summary;
pub mod traits;

pub use error::{PacingError, ServiceError, SessionStartError, SubmissionError};
pub use model::{ExerciseKind, ExerciseSession, Item, PacingConfig, RecallMode, SessionPhase};
pub use pacing::{compute_pacing, PacingPolicy};
pub use recall::RecallCollector;
pub use reconcile::{reconcile, ReconciliationResult};
pub use scheduler::{PlaybackEvent, RevealPosition, RevealTick, StudyEvent, StudyScheduler};
pub use session::{ApiCall, ControllerConfig, NoopObserver, SessionController, SessionObserver};
pub use summary::SessionSummary;
pub use traits::ExerciseApi;
