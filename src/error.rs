use thiserror::Error;

/// Errors raised by the routing core.
///
/// Every variant is a programming defect (a broken invariant inside the
/// label set or its queue), never a "no road found" condition. An
/// unreachable destination is expressed by its absence from the result map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("invalid node id passed to LabelSet::put")]
    InvalidNodeKey,

    #[error("invalid destination index passed to LabelSet::put")]
    InvalidDestinationKey,

    #[error("popped label has no status entry; the queue and status maps are out of sync")]
    StatusMissing,

    #[error("status index {status} is not synced up with the index {popped} popped from the queue")]
    StatusIndexMismatch { status: u32, popped: u32 },

    #[error("the principle of optimality is violated during routing, probably negative costs occurred")]
    OptimalityViolation,
}

pub type Result<T> = std::result::Result<T, RoutingError>;
