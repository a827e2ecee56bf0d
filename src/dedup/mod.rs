pub mod checker;
pub mod error;
pub mod resolution;
pub mod types;

pub use checker::{check_batch, check_one, optimized_check, MIN_LISTING_LIMIT};
pub use error::{DedupError, DedupResult};
pub use resolution::{
    generate_unique_filename, should_skip_duplicate, DuplicateReview, MAX_RENAME_ATTEMPTS,
};
pub use types::{BulkResolution, CheckOutcome, DuplicateCandidate, DuplicateResolution};
