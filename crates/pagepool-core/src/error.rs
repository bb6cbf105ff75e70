//! Allocation failure modes.

use thiserror::Error;

/// Why a fallible allocation entry point failed.
///
/// Out-of-memory covers both an OS mapping refusal and an internal size
/// computation overflow; there is no retry policy, a failure is final for
/// that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("alignment is not a power of two")]
    InvalidAlignment,
}
