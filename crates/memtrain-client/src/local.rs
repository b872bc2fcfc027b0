//! Offline exercise service with built-in decks.
//!
//! Issues sessions from fixed word, digit-peg and face decks and scores
//! submissions against the items it issued, so the engine can be played
//! without a backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use memtrain_core::error::ServiceError;
use memtrain_core::model::{ExerciseKind, Item};
use memtrain_core::reconcile::reconcile_fixed_slot;
use memtrain_core::traits::{
    ExerciseApi, StartRequest, StartResponse, SubmitRequest, SubmitResponse,
};

const WORDS: &[&str] = &[
    "anchor", "basket", "candle", "desert", "engine", "feather", "garden", "hammer", "island",
    "jacket", "kettle", "ladder", "magnet", "needle", "orchard", "pepper", "quarry", "ribbon",
    "saddle", "tunnel", "violin", "wallet", "window", "yogurt", "zipper", "bridge", "castle",
    "dragon", "forest", "glacier", "harbor", "lantern", "meadow", "pillow", "rocket", "silver",
];

/// Peg words for each digit, used as study hints.
const DIGIT_PEGS: [&str; 10] = [
    "sow", "tie", "noah", "ma", "rye", "law", "shoe", "cow", "ivy", "bee",
];

const FACES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
    "Radia", "Niklaus", "Hedy", "Donald", "Katherine", "Tim",
];

const MIN_SKILL: i32 = 1;
const MAX_SKILL: i32 = 10;

/// Unsubmitted sessions kept before the oldest is forgotten.
pub const MAX_OPEN_SESSIONS: usize = 64;

/// Session sizes and starting skill for the local service.
#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub words: usize,
    pub digits: usize,
    pub faces: usize,
    pub skill_level: i32,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            words: 10,
            digits: 12,
            faces: 6,
            skill_level: 3,
        }
    }
}

/// Issued items by session id, oldest first.
#[derive(Default)]
struct OpenSessions {
    order: VecDeque<String>,
    items: HashMap<String, Vec<Item>>,
}

impl OpenSessions {
    fn insert(&mut self, session_id: String, items: Vec<Item>) {
        self.order.push_back(session_id.clone());
        self.items.insert(session_id, items);
        while self.items.len() > MAX_OPEN_SESSIONS {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.items.remove(&oldest).is_some() {
                tracing::debug!(session_id = %oldest, "evicted abandoned session");
            }
        }
    }

    fn remove(&mut self, session_id: &str) -> Option<Vec<Item>> {
        let items = self.items.remove(session_id)?;
        self.order.retain(|id| id != session_id);
        Some(items)
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// In-process exercise service.
pub struct LocalExerciseApi {
    settings: LocalSettings,
    skill_level: Mutex<i32>,
    sessions: Mutex<OpenSessions>,
}

impl LocalExerciseApi {
    pub fn new(settings: LocalSettings) -> Self {
        let skill = settings.skill_level.clamp(MIN_SKILL, MAX_SKILL);
        Self {
            settings,
            skill_level: Mutex::new(skill),
            sessions: Mutex::new(OpenSessions::default()),
        }
    }

    pub fn skill_level(&self) -> i32 {
        *self.skill_level.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sessions started but not yet submitted.
    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn issue(&self, kind: ExerciseKind) -> Vec<Item> {
        let mut rng = thread_rng();
        match kind {
            ExerciseKind::SequenceOfWords => WORDS
                .choose_multiple(&mut rng, self.settings.words)
                .map(|word| Item::word(*word))
                .collect(),
            ExerciseKind::SequenceOfDigits => (0..self.settings.digits)
                .map(|_| {
                    let digit = rng.gen_range(0..DIGIT_PEGS.len());
                    Item::digit(digit as u8, DIGIT_PEGS[digit])
                })
                .collect(),
            ExerciseKind::SequenceOfFaces => FACES
                .choose_multiple(&mut rng, self.settings.faces)
                .map(|name| {
                    Item::face(*name, format!("faces/{}.png", name.to_lowercase()))
                })
                .collect(),
        }
    }

    fn adjust_skill(&self, accuracy: f64) -> i32 {
        let mut skill = self.skill_level.lock().unwrap_or_else(|e| e.into_inner());
        if accuracy >= 0.9 {
            *skill = (*skill + 1).min(MAX_SKILL);
        } else if accuracy < 0.5 {
            *skill = (*skill - 1).max(MIN_SKILL);
        }
        *skill
    }
}

impl Default for LocalExerciseApi {
    fn default() -> Self {
        Self::new(LocalSettings::default())
    }
}

#[async_trait]
impl ExerciseApi for LocalExerciseApi {
    fn name(&self) -> &str {
        "local"
    }

    async fn start(&self, request: &StartRequest) -> anyhow::Result<StartResponse> {
        let items = self.issue(request.exercise_kind);
        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.clone(), items.clone());

        Ok(StartResponse {
            session_id,
            target_items: items,
            skill_level: Some(self.skill_level()),
            pacing: None,
        })
    }

    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<SubmitResponse> {
        // Scored against what was issued, not what the client says it showed.
        let targets = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&request.session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("session {}", request.session_id)))?;

        let labels: Vec<String> = targets
            .iter()
            .map(|item| item.label().into_owned())
            .collect();
        let result = reconcile_fixed_slot(&labels, &request.positioned_answers);
        let total = labels.len();
        let accuracy = if total == 0 {
            0.0
        } else {
            result.unordered_correct_count as f64 / total as f64
        };

        let mut new_badges = Vec::new();
        if total > 0 && result.ordered_correct_count == total {
            new_badges.push("perfect-order".to_string());
        }

        Ok(SubmitResponse {
            total,
            unordered_correct_count: result.unordered_correct_count,
            ordered_correct_count: result.ordered_correct_count,
            missed_targets: result.missed_targets.into_iter().collect(),
            extra_answers: result.extra_answers.into_iter().collect(),
            points_earned: (result.unordered_correct_count + result.ordered_correct_count) as i64,
            new_badges,
            updated_skill_level: Some(self.adjust_skill(accuracy)),
        })
    }
}
