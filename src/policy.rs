//! Access decisions per resource kind
//!
//! Catalog data (platforms, titles) is readable by anyone and writable by staff.
//! Reviews are readable by anyone, creatable by any authenticated actor and
//! editable only by their author. Deleting a review is also open to staff.

use std::fmt;

use crate::{
    error::AppError,
    models::{Actor, UserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    StreamPlatform,
    Title,
    Review,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::StreamPlatform => write!(f, "stream platform"),
            ResourceKind::Title => write!(f, "title"),
            ResourceKind::Review => write!(f, "review"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_read(self) -> bool {
        matches!(self, Operation::List | Operation::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::List => "list",
            Operation::Get => "view",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{}", verb)
    }
}

/// Why an operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No identity was presented
    Unauthorized,
    /// The identity lacks the required privilege or ownership
    Forbidden,
}

/// Decides whether `actor` may perform `operation` on a resource of `kind`
///
/// `owner` is the author of the targeted review and is only consulted for
/// review updates and deletes.
pub fn authorize(
    actor: Option<&Actor>,
    kind: ResourceKind,
    operation: Operation,
    owner: Option<UserId>,
) -> Result<(), Denial> {
    if operation.is_read() {
        return Ok(());
    }

    match kind {
        // denial is based on privilege, so anonymous callers are Forbidden too
        ResourceKind::StreamPlatform | ResourceKind::Title => match actor {
            Some(actor) if actor.is_privileged() => Ok(()),
            _ => Err(Denial::Forbidden),
        },
        ResourceKind::Review => {
            let actor = actor.ok_or(Denial::Unauthorized)?;
            let is_owner = owner == Some(actor.id);

            match operation {
                Operation::Create => Ok(()),
                Operation::Update if is_owner => Ok(()),
                Operation::Delete if is_owner || actor.is_privileged() => Ok(()),
                _ => Err(Denial::Forbidden),
            }
        }
    }
}

pub fn allow(
    actor: Option<&Actor>,
    kind: ResourceKind,
    operation: Operation,
    owner: Option<UserId>,
) -> bool {
    authorize(actor, kind, operation, owner).is_ok()
}

const CREDENTIALS_MISSING: &str = "Authentication credentials were not provided";

/// Unwraps the actor, refusing anonymous callers
pub fn authenticated(actor: Option<&Actor>) -> Result<&Actor, AppError> {
    actor.ok_or_else(|| AppError::Unauthorized(CREDENTIALS_MISSING.to_string()))
}

/// Like [`authorize`], with the denial turned into the matching [`AppError`]
pub fn require(
    actor: Option<&Actor>,
    kind: ResourceKind,
    operation: Operation,
    owner: Option<UserId>,
) -> Result<(), AppError> {
    authorize(actor, kind, operation, owner).map_err(|denial| match denial {
        Denial::Unauthorized => AppError::Unauthorized(CREDENTIALS_MISSING.to_string()),
        Denial::Forbidden => AppError::Forbidden(format!(
            "You do not have permission to {} this {}",
            operation, kind
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: [ResourceKind; 2] = [ResourceKind::StreamPlatform, ResourceKind::Title];
    const WRITES: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Delete];
    const READS: [Operation; 2] = [Operation::List, Operation::Get];

    #[test]
    fn test_reads_open_to_everyone() {
        let user = Actor::new("jude", false);
        for kind in [
            ResourceKind::StreamPlatform,
            ResourceKind::Title,
            ResourceKind::Review,
        ] {
            for op in READS {
                assert!(allow(None, kind, op, None));
                assert!(allow(Some(&user), kind, op, None));
            }
        }
    }

    #[test]
    fn test_catalog_writes_require_staff() {
        let user = Actor::new("jude", false);
        let staff = Actor::new("admin", true);
        for kind in CATALOG {
            for op in WRITES {
                assert_eq!(authorize(None, kind, op, None), Err(Denial::Forbidden));
                assert_eq!(authorize(Some(&user), kind, op, None), Err(Denial::Forbidden));
                assert_eq!(authorize(Some(&staff), kind, op, None), Ok(()));
            }
        }
    }

    #[test]
    fn test_review_writes_require_identity() {
        for op in WRITES {
            assert_eq!(
                authorize(None, ResourceKind::Review, op, None),
                Err(Denial::Unauthorized)
            );
        }
    }

    #[test]
    fn test_any_user_may_create_review() {
        let user = Actor::new("jude", false);
        assert!(allow(Some(&user), ResourceKind::Review, Operation::Create, None));
    }

    #[test]
    fn test_review_update_is_owner_only() {
        let owner = Actor::new("jude", false);
        let other = Actor::new("ada", false);
        let staff = Actor::new("admin", true);

        let kind = ResourceKind::Review;
        assert!(allow(Some(&owner), kind, Operation::Update, Some(owner.id)));
        assert_eq!(
            authorize(Some(&other), kind, Operation::Update, Some(owner.id)),
            Err(Denial::Forbidden)
        );
        // privilege does not override ownership
        assert_eq!(
            authorize(Some(&staff), kind, Operation::Update, Some(owner.id)),
            Err(Denial::Forbidden)
        );
    }

    #[test]
    fn test_review_delete_allows_owner_and_staff() {
        let owner = Actor::new("jude", false);
        let other = Actor::new("ada", false);
        let staff = Actor::new("admin", true);

        let kind = ResourceKind::Review;
        assert!(allow(Some(&owner), kind, Operation::Delete, Some(owner.id)));
        assert!(allow(Some(&staff), kind, Operation::Delete, Some(owner.id)));
        assert_eq!(
            authorize(Some(&other), kind, Operation::Delete, Some(owner.id)),
            Err(Denial::Forbidden)
        );
    }

    #[test]
    fn test_authenticated() {
        let user = Actor::new("jude", false);
        assert_eq!(authenticated(Some(&user)).unwrap(), &user);
        assert!(matches!(authenticated(None), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_require_maps_denials() {
        let user = Actor::new("jude", false);
        assert!(matches!(
            require(None, ResourceKind::Review, Operation::Create, None),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            require(Some(&user), ResourceKind::Title, Operation::Delete, None),
            Err(AppError::Forbidden(msg)) if msg == "You do not have permission to delete this title"
        ));
    }
}
