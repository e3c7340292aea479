use thiserror::Error;

/// Errors returned when building a cache.
///
/// Everything that can go wrong after construction is either reported
/// through a `None` return plus counters, or is a contract violation
/// that panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("cache {name}: cannot allocate {capacity} slots")]
    InsufficientMemory { name: String, capacity: u32 },

    #[error("cache {name}: capacity must be at least 1")]
    InvalidCapacity { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
