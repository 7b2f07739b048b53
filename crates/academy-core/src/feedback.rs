//! Ratings and discussion for a delivered lesson.
//!
//! This is caller-side state: the generator never touches it. One
//! [`LessonFeedback`] tracks a single reader's vote and the comment thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lesson::Lesson;

/// Author name attached to every comment.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous User";

/// A reader's vote on a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Thumbs up.
    Like,
    /// Thumbs down.
    Dislike,
}

/// A discussion comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Display name of the author.
    pub author: String,
    /// Comment body.
    pub text: String,
    /// When the comment was posted.
    pub posted_at: DateTime<Utc>,
}

/// One reader's rating and the comment thread of a lesson.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonFeedback {
    rating: Option<Rating>,
    comments: Vec<Comment>,
}

impl LessonFeedback {
    /// Creates empty feedback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The reader's current vote, if any.
    #[must_use]
    pub const fn rating(&self) -> Option<Rating> {
        self.rating
    }

    /// Comments, newest first.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Applies a vote to the lesson counters.
    ///
    /// Voting the same way twice withdraws the vote; voting the other way
    /// moves it. Counters never drop below zero. Returns the vote now in effect.
    pub fn rate(&mut self, lesson: &mut Lesson, rating: Rating) -> Option<Rating> {
        if let Some(previous) = self.rating.take() {
            Self::adjust(lesson, previous, false);
            if previous == rating {
                return None;
            }
        }

        Self::adjust(lesson, rating, true);
        self.rating = Some(rating);
        self.rating
    }

    fn adjust(lesson: &mut Lesson, rating: Rating, add: bool) {
        let counter = match rating {
            Rating::Like => &mut lesson.likes,
            Rating::Dislike => &mut lesson.dislikes,
        };
        *counter = if add {
            counter.saturating_add(1)
        } else {
            counter.saturating_sub(1)
        };
    }

    /// Posts a comment. Blank text is ignored.
    ///
    /// Returns the stored comment, or `None` if nothing was posted.
    pub fn add_comment(&mut self, text: &str) -> Option<&Comment> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.comments.insert(
            0,
            Comment {
                author: ANONYMOUS_AUTHOR.to_string(),
                text: text.to_string(),
                posted_at: Utc::now(),
            },
        );
        self.comments.first()
    }
}
