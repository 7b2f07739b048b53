//! State machine for a single lesson generation.
//!
//! ```text
//! Idle -> RequestingText -> ParsingText -> RequestingImages -> Assembling -> Done
//!   \__________\_______________\______________\__________________\______-> Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AcademyError, Result};

// ============================================================================
// GenerationStatus
// ============================================================================

/// Current step of a lesson generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Nothing has been sent yet.
    #[default]
    Idle,
    /// The text-generation call is in flight.
    RequestingText,
    /// The text response is being validated.
    ParsingText,
    /// Panel image calls are in flight.
    RequestingImages,
    /// Panels and content are being combined into a lesson.
    Assembling,
    /// A lesson was produced.
    Done,
    /// Generation stopped with an error.
    Failed,
}

impl GenerationStatus {
    /// Returns `true` if this status represents a terminal state.
    ///
    /// # Examples
    ///
    /// ```
    /// use academy_core::GenerationStatus;
    ///
    /// assert!(GenerationStatus::Done.is_terminal());
    /// assert!(GenerationStatus::Failed.is_terminal());
    /// assert!(!GenerationStatus::RequestingImages.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    ///
    /// Every non-terminal state may fail; otherwise only the next step in
    /// the pipeline is reachable.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed)
                | (Self::Idle, Self::RequestingText)
                | (Self::RequestingText, Self::ParsingText)
                | (Self::ParsingText, Self::RequestingImages)
                | (Self::RequestingImages, Self::Assembling)
                | (Self::Assembling, Self::Done)
        )
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::RequestingText => "requesting_text",
            Self::ParsingText => "parsing_text",
            Self::RequestingImages => "requesting_images",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// GenerationState
// ============================================================================

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Status before the change.
    pub from: GenerationStatus,
    /// Status after the change.
    pub to: GenerationStatus,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

/// Trace of a lesson generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationState {
    /// Current status.
    pub status: GenerationStatus,

    /// Every transition taken, in order.
    pub transitions: Vec<StateTransition>,

    /// Error message when the status is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// When the generation started.
    pub started_at: DateTime<Utc>,

    /// When the state was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationState {
    /// Creates a new state in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            status: GenerationStatus::Idle,
            transitions: Vec::new(),
            failure: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Moves to `next`, recording the transition.
    ///
    /// # Errors
    ///
    /// Returns `AcademyError::InvalidStateTransition` if the move is not allowed.
    pub fn transition(&mut self, next: GenerationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(AcademyError::invalid_transition(self.status, next));
        }

        tracing::info!(from = %self.status, to = %next, "Generation state changed");

        let now = Utc::now();
        self.transitions.push(StateTransition {
            from: self.status,
            to: next,
            at: now,
        });
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Moves to `Failed` and records the reason.
    ///
    /// Does nothing if the state is already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.transition(GenerationStatus::Failed).is_ok() {
            self.failure = Some(reason.into());
        }
    }

    /// Returns `true` if generation has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Statuses visited so far, starting with `Idle`.
    #[must_use]
    pub fn path(&self) -> Vec<GenerationStatus> {
        std::iter::once(GenerationStatus::Idle)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    /// Returns the duration since generation started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }
}
