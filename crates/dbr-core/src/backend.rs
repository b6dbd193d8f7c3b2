//! The storage-provider plugin contract. The concrete Redis-like protocol encoder/decoder is an
//! external collaborator; only this contract is in scope here.

use crate::request::{Completion, RequestContext};

#[derive(thiserror::Error, Debug)]
pub enum PostError {
    #[error("backend rejected post: {0}")]
    Rejected(#[from] std::io::Error),
    #[error("backend is shutting down")]
    ShuttingDown,
}

/// A pluggable storage backend. Implementations must be safe to drive from a single thread that
/// calls `post`/`test_any`/`cancel` in a tight loop (the wait/event-loop "busy-wait with embedded
/// progress" contract, §9).
pub trait Backend: Send + Sync {
    /// Hands `ctx` to the backend, consuming it. `ctx.into_raw()` becomes the completion's
    /// `user_ptr`; the backend must echo it back unchanged. On failure the context is dropped and
    /// the caller surfaces `ErrorCode::ErrBePost`.
    fn post(&self, ctx: Box<RequestContext>) -> Result<(), PostError>;

    /// Polls for at most one completion without blocking. Drives backend progress as a side
    /// effect even when it returns `None`.
    fn test_any(&self) -> Option<Completion>;

    /// Requests cancellation of the in-flight operation addressed by `user_ptr`. The backend is
    /// expected to eventually surface a completion for it (possibly `ErrorCode::ErrCancelled`,
    /// possibly its true outcome if it raced to completion already).
    fn cancel(&self, user_ptr: u64);

    /// Releases any backend-held resources. Called once at server/client shutdown.
    fn exit(&self);
}
