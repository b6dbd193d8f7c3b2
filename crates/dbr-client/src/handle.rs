//! Namespace façade binding directly to a local [`dbr_core::Backend`], mirroring the
//! `tag_get → create_request_ctx → insert_request → post_request → wait_request →
//! check_response → remove_request` template every `libdbr*` entry point follows.

use std::sync::{Arc, Mutex};

use dbr_core::{Backend, Config, ErrorCode, Namespace, Request};
use dbr_proto::TAG_ERROR;

/// A handle to an attached namespace. Cheap to clone; the underlying [`Namespace`] is shared.
#[derive(Clone)]
pub struct NamespaceHandle {
    inner: Arc<Mutex<Namespace>>,
}

/// Outcome of a posted operation: the mapped status, and (for GET-shaped opcodes) the value the
/// backend wrote to the completion's `rc_out` slot.
pub struct OpResult {
    pub status: ErrorCode,
    pub rc_out: Option<i64>,
}

impl NamespaceHandle {
    pub fn new(name: impl Into<String>, tag_capacity: u32, config: Config, backend: Arc<dyn Backend>) -> Self {
        Self { inner: Arc::new(Mutex::new(Namespace::new(name, tag_capacity, config, backend))) }
    }

    pub fn name(&self) -> String {
        self.inner.lock().unwrap().name().to_owned()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending_count()
    }

    /// Runs `request` through the full post/wait/retrieve lifecycle, returning its final status.
    /// On any early failure (tag exhaustion, post rejection) no trace of the request remains in
    /// the namespace's pending table.
    pub(crate) fn run(&self, request: Request) -> OpResult {
        let mut ns = self.inner.lock().unwrap();
        let tag = ns.insert_request(request);
        if tag == TAG_ERROR {
            return OpResult { status: ErrorCode::ErrTagError, rc_out: None };
        }
        if let Err(err) = ns.post_request(tag) {
            tracing::warn!(%err, "post_request failed");
            return OpResult { status: ErrorCode::ErrBePost, rc_out: None };
        }
        let status = ns.wait_request(tag);
        match ns.remove_request(tag) {
            Some((_, rc_out)) => OpResult { status, rc_out },
            None => OpResult { status, rc_out: None },
        }
    }
}
