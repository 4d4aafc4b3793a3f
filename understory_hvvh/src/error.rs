// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types shared by all indexes.

/// A misuse of an index by its caller.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// The object is already tracked by this index.
    #[error("object is already tracked by this index")]
    AlreadyIndexed,
    /// The object is not tracked by this index.
    #[error("object is not tracked by this index")]
    NotIndexed,
    /// A defined region was required but an undefined one was given.
    #[error("region query requires a defined extent")]
    UndefinedRegion,
    /// A relative placement referred to an object the index does not track.
    #[error("reference object is not tracked by this index")]
    UnknownReference,
}

/// Errors returned by index operations.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// The caller broke the operation's contract; the index is unchanged.
    #[error("contract violation: {0}")]
    ContractViolation(#[from] Violation),
    /// Node or table storage could not grow; the index is unchanged.
    #[error("allocation failure while growing index storage")]
    AllocationFailure,
}

impl From<alloc::collections::TryReserveError> for IndexError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::AllocationFailure
    }
}

impl From<hashbrown::TryReserveError> for IndexError {
    fn from(_: hashbrown::TryReserveError) -> Self {
        Self::AllocationFailure
    }
}
