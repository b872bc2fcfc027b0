//! memtrain-client: Exercise service implementations.
//!
//! Implements the `ExerciseApi` trait over HTTP, as an offline local service
//! with built-in decks, and as a scripted mock, plus configuration loading.

pub mod config;
pub mod http;
pub mod local;
pub mod mock;

pub use config::{
    create_api, create_offline_api, load_config, load_config_from, MemtrainConfig, ServiceConfig,
};
pub use http::HttpExerciseApi;
pub use local::LocalExerciseApi;
pub use memtrain_core::error::ServiceError;
pub use mock::MockExerciseApi;
