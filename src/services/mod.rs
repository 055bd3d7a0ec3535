pub mod catalog;
pub mod ledger;

pub use catalog::{Catalog, PlatformDetail};
pub use ledger::{apply_rating, ReviewLedger, ReviewWrite};
