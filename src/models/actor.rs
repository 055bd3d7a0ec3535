use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// The authenticated identity performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub username: String,
    /// Staff accounts may write catalog data
    pub is_staff: bool,
}

impl Actor {
    pub fn new(username: impl Into<String>, is_staff: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            is_staff,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.is_staff
    }
}
