//! Configuration loading and the exercise service factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use memtrain_core::model::ExerciseKind;
use memtrain_core::pacing::PacingPolicy;
use memtrain_core::session::ControllerConfig;
use memtrain_core::traits::ExerciseApi;

use crate::http::{HttpExerciseApi, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::local::{LocalExerciseApi, LocalSettings};

/// Where the exercise service lives and how to authenticate.
///
/// Note: Custom Debug impl masks the API token to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Supports `${VAR}` references.
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Study phase presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Pause after the last item before recall starts.
    #[serde(default = "default_trailing_pause")]
    pub trailing_pause_ms: u64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            trailing_pause_ms: default_trailing_pause(),
        }
    }
}

/// Session sizes for the offline service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    #[serde(default = "default_words")]
    pub words: usize,
    #[serde(default = "default_digits")]
    pub digits: usize,
    #[serde(default = "default_faces")]
    pub faces: usize,
    #[serde(default = "default_skill")]
    pub skill_level: i32,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            words: default_words(),
            digits: default_digits(),
            faces: default_faces(),
            skill_level: default_skill(),
        }
    }
}

/// Top-level memtrain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemtrainConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub pacing: PacingPolicy,
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
    /// Exercise kind used when none is requested.
    #[serde(default = "default_kind")]
    pub default_kind: ExerciseKind,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_trailing_pause() -> u64 {
    1000
}
fn default_words() -> usize {
    LocalSettings::default().words
}
fn default_digits() -> usize {
    LocalSettings::default().digits
}
fn default_faces() -> usize {
    LocalSettings::default().faces
}
fn default_skill() -> i32 {
    LocalSettings::default().skill_level
}
fn default_kind() -> ExerciseKind {
    ExerciseKind::SequenceOfWords
}

impl Default for MemtrainConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            pacing: PacingPolicy::default(),
            study: StudyConfig::default(),
            offline: OfflineConfig::default(),
            default_kind: default_kind(),
        }
    }
}

impl MemtrainConfig {
    /// Settings for the session controller.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            pacing: self.pacing.clone(),
            trailing_pause: Duration::from_millis(self.study.trailing_pause_ms),
        }
    }
}

/// Expand `${VAR_NAME}` references in a single pass.
///
/// Substituted values are copied verbatim and never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `memtrain.toml` in the current directory
/// 2. `~/.config/memtrain/config.toml`
///
/// Environment variable overrides: `MEMTRAIN_BASE_URL`, `MEMTRAIN_API_TOKEN`.
pub fn load_config() -> Result<MemtrainConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MemtrainConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("memtrain.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MemtrainConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MemtrainConfig::default(),
    };

    let config = apply_overrides(config, |key| std::env::var(key).ok());
    config
        .pacing
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid [pacing] config: {e}"))?;
    Ok(config)
}

/// Apply `MEMTRAIN_*` overrides, then resolve `${VAR}` references.
fn apply_overrides(
    mut config: MemtrainConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> MemtrainConfig {
    if let Some(url) = lookup("MEMTRAIN_BASE_URL") {
        config.service.base_url = url;
    }
    if let Some(token) = lookup("MEMTRAIN_API_TOKEN") {
        config.service.api_token = Some(token);
    }

    config.service.base_url = resolve_env_vars(&config.service.base_url);
    config.service.api_token = config
        .service
        .api_token
        .as_deref()
        .map(resolve_env_vars)
        .filter(|t| !t.is_empty());
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("memtrain"))
}

/// Create the HTTP exercise service from configuration.
pub fn create_api(config: &MemtrainConfig) -> Result<Arc<dyn ExerciseApi>> {
    let service = &config.service;
    let api = HttpExerciseApi::new(
        &service.base_url,
        service.api_token.clone(),
        service.timeout_secs,
    )?;
    Ok(Arc::new(api))
}

/// Create the offline exercise service from configuration.
pub fn create_offline_api(config: &MemtrainConfig) -> Arc<dyn ExerciseApi> {
    let offline = &config.offline;
    Arc::new(LocalExerciseApi::new(LocalSettings {
        words: offline.words,
        digits: offline.digits,
        faces: offline.faces,
        skill_level: offline.skill_level,
    }))
}
