use crate::{NodeId, Slot};

/// Errors surfaced by the filter and its sampling primitives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Attempt to draw from a zero-length distribution.
    #[error("cannot sample from an empty distribution")]
    EmptyDistribution,

    /// A weight vector whose total mass cannot be normalized.
    #[error("distribution mass {mass} cannot be normalized")]
    DegenerateDistribution {
        /// The offending total mass (zero, negative, or non-finite).
        mass: f64,
    },

    /// Every particle weight reached zero; the model has collapsed.
    ///
    /// The counts observed before the failure are still in place, so the
    /// caller may inspect state or stop.
    #[error("all {particles} particle weights are zero")]
    ParticleCollapse {
        /// Size of the collapsed population.
        particles: usize,
    },

    /// A read walked to a root of the assignment forest without finding the
    /// position. Indicates a driver bug: assignments are written before
    /// they are ever read.
    #[error("no assignment for node {node} at slot {slot}, position {position}")]
    AssignmentMissing {
        /// Node the read started from.
        node: NodeId,
        /// Reservoir slot of the document.
        slot: Slot,
        /// Word position within the document.
        position: usize,
    },

    /// A reservoir slot outside the configured capacity.
    #[error("reservoir slot {slot} out of range for capacity {capacity}")]
    SlotOutOfRange {
        /// The offending slot.
        slot: Slot,
        /// The reservoir capacity it was checked against.
        capacity: usize,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
