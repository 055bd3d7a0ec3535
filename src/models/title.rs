use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};

use super::check_text;

const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 500;

/// A movie or show on a platform's watchlist
///
/// `avg_rating` and `number_rating` form the title's rating aggregate. They are
/// only ever written by the review ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Title {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub platform_id: Uuid,
    pub active: bool,
    pub avg_rating: f64,
    pub number_rating: i32,
    pub created_at: DateTime<Utc>,
}

impl Title {
    /// Creates an unrated title from validated input
    pub fn new(input: TitleInput, platform_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            platform_id,
            active: input.active,
            avg_rating: 0.0,
            number_rating: 0,
            created_at: Utc::now(),
        }
    }

    /// Replaces the writable fields. The rating aggregate and creation time are kept.
    pub fn apply(&mut self, input: TitleInput, platform_id: Uuid) {
        self.title = input.title;
        self.description = input.description;
        self.platform_id = platform_id;
        self.active = input.active;
    }
}

/// Writable title fields accepted on create and update
#[derive(Debug, Clone, Deserialize)]
pub struct TitleInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub platform_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl TitleInput {
    /// Checks field shapes and returns the referenced platform id
    ///
    /// Whether the platform exists is checked by the catalog against storage.
    pub fn validate(&self) -> AppResult<Uuid> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "title", &self.title, TITLE_MAX_CHARS);
        check_text(
            &mut errors,
            "description",
            &self.description,
            DESCRIPTION_MAX_CHARS,
        );
        let Some(platform_id) = self.platform_id else {
            errors.add("platform_id", "This field is required.");
            return Err(AppError::Validation(errors));
        };

        errors.into_result()?;
        Ok(platform_id)
    }
}

/// Search filter for title listings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TitleFilter {
    pub search: Option<String>,
}

impl TitleFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }

    fn terms(&self) -> Vec<String> {
        self.search
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Every term must occur in the title or equal the platform name, ignoring case
    pub fn matches(&self, title: &Title, platform_name: &str) -> bool {
        let name = title.title.to_lowercase();
        let platform = platform_name.to_lowercase();

        self.terms()
            .iter()
            .all(|term| name.contains(term.as_str()) || platform == *term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aladdin() -> TitleInput {
        TitleInput {
            title: "Aladdin".to_string(),
            description: "It is about a genie and a boy".to_string(),
            platform_id: Some(Uuid::new_v4()),
            active: true,
        }
    }

    #[test]
    fn test_new_title_is_unrated() {
        let input = aladdin();
        let platform_id = input.platform_id.unwrap();
        let title = Title::new(input, platform_id);
        assert_eq!(title.avg_rating, 0.0);
        assert_eq!(title.number_rating, 0);
        assert_eq!(title.platform_id, platform_id);
    }

    #[test]
    fn test_apply_preserves_aggregate() {
        let input = aladdin();
        let platform_id = input.platform_id.unwrap();
        let mut title = Title::new(input, platform_id);
        title.avg_rating = 4.5;
        title.number_rating = 2;

        let created_at = title.created_at;
        title.apply(
            TitleInput {
                title: "Aladdin (2019)".to_string(),
                active: false,
                ..aladdin()
            },
            platform_id,
        );

        assert_eq!(title.title, "Aladdin (2019)");
        assert!(!title.active);
        assert_eq!(title.avg_rating, 4.5);
        assert_eq!(title.number_rating, 2);
        assert_eq!(title.created_at, created_at);
    }

    #[test]
    fn test_missing_platform_rejected() {
        let input = TitleInput {
            platform_id: None,
            ..aladdin()
        };
        match input.validate() {
            Err(AppError::Validation(errors)) => assert!(errors.get("platform_id").is_some()),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_input_ignores_aggregate_fields() {
        let input: TitleInput = serde_json::from_value(serde_json::json!({
            "title": "47 Ronin",
            "description": "It is about 47 ronin",
            "platform_id": Uuid::new_v4(),
            "avg_rating": 5.0,
            "number_rating": 100
        }))
        .unwrap();
        assert!(input.active);

        let platform_id = input.validate().unwrap();
        let title = Title::new(input, platform_id);
        assert_eq!(title.avg_rating, 0.0);
        assert_eq!(title.number_rating, 0);
    }

    #[test]
    fn test_filter_substring_and_platform_name() {
        let input = aladdin();
        let platform_id = input.platform_id.unwrap();
        let title = Title::new(input, platform_id);

        assert!(TitleFilter::default().matches(&title, "netflix"));
        assert!(TitleFilter::search("ladd").matches(&title, "netflix"));
        assert!(TitleFilter::search("NETFLIX").matches(&title, "Netflix"));
        assert!(TitleFilter::search("aladdin, netflix").matches(&title, "netflix"));
        // platform name is an exact match, not a substring
        assert!(!TitleFilter::search("net").matches(&title, "netflix"));
        assert!(!TitleFilter::search("aladdin hulu").matches(&title, "netflix"));
    }
}
