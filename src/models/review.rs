use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};

use super::{check_length, Actor, UserId};

const DESCRIPTION_MAX_CHARS: usize = 200;

/// A star rating between 1 and 5 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

#[derive(Debug, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingOutOfRange(pub i64);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, RatingOutOfRange> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

/// One reviewer's rating of one title
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: UserId,
    /// Reviewer's username at the time of writing
    pub reviewer_username: String,
    pub title_id: Uuid,
    pub description: Option<String>,
    #[sqlx(try_from = "i16")]
    pub rating: Rating,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(reviewer: &Actor, title_id: Uuid, rating: Rating, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reviewer_id: reviewer.id,
            reviewer_username: reviewer.username.clone(),
            title_id,
            description,
            rating,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the provided fields and bumps `updated_at`
    pub fn apply(&mut self, changes: ReviewChanges) {
        if let Some(rating) = changes.rating {
            self.rating = rating;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(active) = changes.active {
            self.active = active;
        }
        self.updated_at = Utc::now();
    }
}

/// Review fields as submitted by a client
///
/// The rating is kept as a raw integer so out-of-range values surface as a
/// field error instead of a deserialization failure. `description` tells an
/// absent field (`None`) apart from an explicit `null` (`Some(None)`), which
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Validated review fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewChanges {
    pub rating: Option<Rating>,
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

/// Marks a field that was present in the payload, even when it was `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ReviewInput {
    fn check(&self, errors: &mut FieldErrors) -> Option<Rating> {
        if let Some(Some(description)) = &self.description {
            check_length(errors, "description", description, DESCRIPTION_MAX_CHARS);
        }

        match self.rating.map(Rating::new)? {
            Ok(rating) => Some(rating),
            Err(_) => {
                errors.add(
                    "rating",
                    format!(
                        "Ensure this value is between {} and {}.",
                        Rating::MIN,
                        Rating::MAX
                    ),
                );
                None
            }
        }
    }

    /// Validates a partial update, where every field is optional
    pub fn validate(self) -> AppResult<ReviewChanges> {
        let mut errors = FieldErrors::new();
        let rating = self.check(&mut errors);
        errors.into_result()?;

        Ok(ReviewChanges {
            rating,
            description: self.description,
            active: self.active,
        })
    }

    /// Validates input for a new review, where the rating is mandatory
    pub fn validate_new(self) -> AppResult<(Rating, Option<String>)> {
        let mut errors = FieldErrors::new();
        let rating = self.check(&mut errors);
        if self.rating.is_none() {
            errors.add("rating", "This field is required.");
        }

        match rating {
            Some(rating) if errors.is_empty() => Ok((rating, self.description.flatten())),
            _ => Err(AppError::Validation(errors)),
        }
    }
}
