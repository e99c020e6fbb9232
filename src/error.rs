//! Crate error type.
//!
//! Capacity violations are always reported as a recoverable
//! [`RaffleError::CapacityExceeded`]; nothing in the crate aborts the process
//! or hands back a sentinel value. Operations that fail release whatever
//! distributions they allocated before returning.

use thiserror::Error;

use crate::types::Resource;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RaffleError {
    /// A fixed structural limit was exceeded.
    #[error("capacity exceeded: {requested} {resource} requested, limit is {limit}")]
    CapacityExceeded {
        resource: Resource,
        requested: usize,
        limit: usize,
    },

    /// Input rejected by raffle/prize validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A distribution handle was used after release, or belongs to another store.
    #[error("stale distribution handle")]
    StaleHandle,
}

impl RaffleError {
    pub(crate) fn capacity(resource: Resource, requested: usize, limit: usize) -> Self {
        RaffleError::CapacityExceeded {
            resource,
            requested,
            limit,
        }
    }
}

pub type Result<T> = std::result::Result<T, RaffleError>;
