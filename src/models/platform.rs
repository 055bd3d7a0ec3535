use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{AppResult, FieldErrors};

use super::{check_length, check_text};

const NAME_MAX_CHARS: usize = 30;
const ABOUT_MAX_CHARS: usize = 255;
const WEBSITE_MAX_CHARS: usize = 100;

/// A streaming platform hosting watchlisted titles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StreamPlatform {
    pub id: Uuid,
    pub name: String,
    pub about: String,
    pub website: String,
}

impl StreamPlatform {
    /// Creates a platform from validated input
    pub fn new(input: PlatformInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            about: input.about,
            website: input.website,
        }
    }

    /// Replaces every writable field, keeping the identity
    pub fn apply(&mut self, input: PlatformInput) {
        self.name = input.name;
        self.about = input.about;
        self.website = input.website;
    }
}

/// Writable platform fields accepted on create and update
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub website: String,
}

impl PlatformInput {
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();

        check_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check_text(&mut errors, "about", &self.about, ABOUT_MAX_CHARS);

        if self.website.trim().is_empty() {
            errors.add("website", "This field may not be blank.");
        } else {
            check_length(&mut errors, "website", &self.website, WEBSITE_MAX_CHARS);
            let valid = Url::parse(&self.website)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
                .unwrap_or(false);
            if !valid {
                errors.add("website", "Enter a valid URL.");
            }
        }

        errors.into_result()
    }
}
