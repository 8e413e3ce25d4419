use thiserror::Error;

/// Errors surfaced by the node-numbering construction.
///
/// Internal-consistency violations (owner not the minimum rank, a contributor
/// list out of order, a shared index outside its expected global range) are
/// deliberately *not* variants here: per the algorithm's error taxonomy they are
/// unreachable in a correct release build and are checked with `debug_assert!`
/// at the point they would be violated (see [`crate::validate`]).
#[derive(Error, Debug)]
pub enum CoreError {
    /// The forest handed to the constructor violates a precondition the
    /// algorithm requires before traversal can start (not 2:1 balanced, or a
    /// ghost layer is missing where the traversal needs one).
    #[error("topology precondition violated: {0}")]
    Precondition(String),

    /// A send, receive, or wait on the message-passing substrate failed, or a
    /// completed message's byte count did not match what was posted. Fatal:
    /// callers must treat construction as having produced no output.
    #[error("transport fault: {0}")]
    Transport(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
