//! Rate limiting logic and state management.

mod clock;
mod entry;
mod identifier;
mod limiter;
mod policy;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::RateLimitEntry;
pub use identifier::{derive_identifier, HeaderLookup, UNKNOWN_IDENTIFIER};
pub use limiter::{BackoffRateLimiter, RateLimitDecision};
pub use policy::BackoffPolicy;
pub use sweeper::CleanupTask;
