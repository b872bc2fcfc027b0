//! Core data model types for memtrain.
//!
//! These are the types every part of the engine shares: what kind of exercise
//! is running, the items being memorized, the pacing that governs the study
//! phase, and the session record the controller owns.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The family of memorization exercise being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseKind {
    SequenceOfWords,
    SequenceOfFaces,
    SequenceOfDigits,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 3] = [
        ExerciseKind::SequenceOfWords,
        ExerciseKind::SequenceOfFaces,
        ExerciseKind::SequenceOfDigits,
    ];

    /// How the recall screen collects answers for this kind.
    ///
    /// Word chains are reconstructed from memory without positional cues;
    /// faces and digits show one input per studied item.
    pub fn recall_mode(self) -> RecallMode {
        match self {
            ExerciseKind::SequenceOfWords => RecallMode::FreeForm,
            ExerciseKind::SequenceOfFaces | ExerciseKind::SequenceOfDigits => {
                RecallMode::FixedSlot
            }
        }
    }

    /// Whether `item` is a valid item for this kind.
    pub fn accepts(self, item: &Item) -> bool {
        matches!(
            (self, item),
            (ExerciseKind::SequenceOfWords, Item::Word { .. })
                | (ExerciseKind::SequenceOfFaces, Item::Face { .. })
                | (ExerciseKind::SequenceOfDigits, Item::Digit { .. })
        )
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseKind::SequenceOfWords => write!(f, "words"),
            ExerciseKind::SequenceOfFaces => write!(f, "faces"),
            ExerciseKind::SequenceOfDigits => write!(f, "digits"),
        }
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "words" | "word" | "sequence_of_words" => Ok(ExerciseKind::SequenceOfWords),
            "faces" | "face" | "names" | "sequence_of_faces" => Ok(ExerciseKind::SequenceOfFaces),
            "digits" | "digit" | "numbers" | "sequence_of_digits" => {
                Ok(ExerciseKind::SequenceOfDigits)
            }
            other => Err(format!("unknown exercise kind: {other}")),
        }
    }
}

/// Answer collection strategy used during the recall phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallMode {
    /// One slot per studied item; slot index is the target position.
    FixedSlot,
    /// A growing list in the order the user typed entries.
    FreeForm,
}

/// A single studied item. Immutable once issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    Word {
        word: String,
    },
    #[serde(rename_all = "camelCase")]
    Digit {
        digit: u8,
        /// Mnemonic peg shown alongside the digit.
        #[serde(default)]
        hint: String,
    },
    #[serde(rename_all = "camelCase")]
    Face {
        identity_label: String,
        image_reference: String,
    },
}

impl Item {
    pub fn word(word: impl Into<String>) -> Self {
        Item::Word { word: word.into() }
    }

    pub fn digit(digit: u8, hint: impl Into<String>) -> Self {
        Item::Digit {
            digit,
            hint: hint.into(),
        }
    }

    pub fn face(identity_label: impl Into<String>, image_reference: impl Into<String>) -> Self {
        Item::Face {
            identity_label: identity_label.into(),
            image_reference: image_reference.into(),
        }
    }

    /// The canonical label the user is expected to recall.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Item::Word { word } => Cow::Borrowed(word),
            Item::Digit { digit, .. } => Cow::Owned(digit.to_string()),
            Item::Face { identity_label, .. } => Cow::Borrowed(identity_label),
        }
    }
}

/// Timing parameters for the study phase.
///
/// Computed once per session (or taken from the service) and frozen once
/// playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingConfig {
    pub total_study_seconds: f64,
    pub per_item_show_ms: u64,
    pub inter_item_gap_ms: u64,
}

/// Phase of a session. Transitions are strictly linear except for an
/// explicit reset back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Idle,
    Study,
    Recall,
    Summary,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Study => write!(f, "study"),
            SessionPhase::Recall => write!(f, "recall"),
            SessionPhase::Summary => write!(f, "summary"),
        }
    }
}

/// A running exercise. Owned by the session controller and discarded on reset.
///
/// Fields are private so items and pacing stay frozen once study starts.
#[derive(Debug, Clone)]
pub struct ExerciseSession {
    session_id: String,
    exercise_kind: ExerciseKind,
    target_items: Vec<Item>,
    skill_level: Option<i32>,
    pacing: PacingConfig,
}

impl ExerciseSession {
    pub(crate) fn new(
        session_id: String,
        exercise_kind: ExerciseKind,
        target_items: Vec<Item>,
        skill_level: Option<i32>,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            session_id,
            exercise_kind,
            target_items,
            skill_level,
            pacing,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn exercise_kind(&self) -> ExerciseKind {
        self.exercise_kind
    }

    pub fn target_items(&self) -> &[Item] {
        &self.target_items
    }

    pub fn item_count(&self) -> usize {
        self.target_items.len()
    }

    pub fn skill_level(&self) -> Option<i32> {
        self.skill_level
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    pub fn recall_mode(&self) -> RecallMode {
        self.exercise_kind.recall_mode()
    }
}
