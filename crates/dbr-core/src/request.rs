//! Request/completion data model shared by the client façade and the forwarding server.

use dbr_proto::{ErrorCode, FLAGS_PARTIAL};

/// Operation kind. `Unknown` preserves a raw wire opcode byte that matched none of the known
/// operations, so the completion engine can still map it to `ErrorCode::ErrInvalidOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Put,
    Get,
    Read,
    Directory,
    Remove,
    Iterator,
    NsCreate,
    NsAttach,
    NsDetach,
    NsDelete,
    NsQuery,
    NsAddUnits,
    NsRemoveUnits,
    Move,
    Unknown(u8),
}

/// An asynchronous operation posted to a namespace, addressed to `key`/`match` and carrying its
/// scatter-gather payload.
#[derive(Debug, Clone)]
pub struct Request {
    pub opcode: Opcode,
    pub namespace_handle: u64,
    pub group: u32,
    pub key: String,
    pub match_: String,
    pub sge: Vec<Vec<u8>>,
    pub flags: u32,
    /// Opaque to the core; the backend echoes this back in the completion.
    pub user_ptr: u64,
}

impl Request {
    /// Sum of the posted SGE element lengths (`rsize` in the completion mapping rules).
    pub fn rsize(&self) -> i64 {
        self.sge.iter().map(|s| s.len() as i64).sum()
    }

    pub fn is_partial(&self) -> bool {
        self.flags & FLAGS_PARTIAL != 0
    }
}

/// A terminal status record delivered by the backend for a previously posted request.
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub rc: i64,
    pub status: ErrorCode,
    pub user_ptr: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Ready,
}

/// Owns a request from post through retrieval. Allocated on the heap so its address can serve
/// as the backend's opaque `user_ptr`, enabling out-of-order completion lookup (§9).
#[derive(Debug)]
pub struct RequestContext {
    pub opcode: Opcode,
    pub request: Request,
    pub completion: Option<Completion>,
    pub tag: u32,
    pub rc_out: Option<i64>,
    pub status: RequestStatus,
}

impl RequestContext {
    pub fn new(tag: u32, request: Request) -> Self {
        let opcode = request.opcode;
        Self { opcode, request, completion: None, tag, rc_out: None, status: RequestStatus::Pending }
    }

    /// Consumes a boxed context into a stable integer identity, suitable for use as a backend
    /// `user_ptr`. Must be paired with exactly one [`RequestContext::from_raw`].
    pub fn into_raw(self: Box<Self>) -> u64 {
        Box::into_raw(self) as u64
    }

    /// Reconstructs a context previously handed to a backend via [`RequestContext::into_raw`].
    ///
    /// # Safety
    /// `ptr` must be a value returned by `into_raw` that has not already been reconstructed.
    pub unsafe fn from_raw(ptr: u64) -> Box<Self> {
        unsafe { Box::from_raw(ptr as *mut Self) }
    }
}
