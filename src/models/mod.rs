pub mod actor;
pub mod platform;
pub mod review;
pub mod title;

pub use actor::{Actor, UserId};
pub use platform::{PlatformInput, StreamPlatform};
pub use review::{Rating, RatingOutOfRange, Review, ReviewChanges, ReviewInput};
pub use title::{Title, TitleFilter, TitleInput};

use crate::error::FieldErrors;

/// Records a message when a required text field is blank or longer than `max_chars`
pub(crate) fn check_text(errors: &mut FieldErrors, field: &'static str, value: &str, max_chars: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else {
        check_length(errors, field, value, max_chars);
    }
}

pub(crate) fn check_length(errors: &mut FieldErrors, field: &'static str, value: &str, max_chars: usize) {
    if value.chars().count() > max_chars {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_chars),
        );
    }
}
