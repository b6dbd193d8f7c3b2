//! A namespace owns a tag pool and a pending table, and drives requests to completion against a
//! bound [`Backend`] (§4.4, §9 "global singleton backend" resolution).

use std::collections::HashMap;
use std::sync::Arc;

use dbr_timing::{Duration, Instant};

use dbr_proto::{ErrorCode, TAG_ERROR};

use crate::backend::{Backend, PostError};
use crate::completion::map_completion;
use crate::request::{Completion, Request, RequestContext, RequestStatus};
use crate::tag::TagPool;

/// How often (in wait-loop iterations) to consult the monotonic clock, bounding syscall overhead
/// on the busy-wait path (§4.4).
const CLOCK_CHECK_INTERVAL: u32 = 1 << 16;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub timeout_sec: Option<u64>,
}

impl Config {
    pub fn new(timeout_sec: Option<u64>) -> Self {
        Self { timeout_sec }
    }
}

/// A pending-table slot. A context is either still local (`NotPosted`), handed to the backend and
/// addressed only by its raw `user_ptr` (`InFlight`), or retrieved back and marked `READY`.
enum Slot {
    NotPosted(Box<RequestContext>),
    InFlight(u64),
    Ready(Box<RequestContext>),
}

pub struct Namespace {
    name: String,
    tag_pool: TagPool,
    pending: HashMap<u32, Slot>,
    config: Config,
    backend: Arc<dyn Backend>,
}

impl Namespace {
    pub fn new(name: impl Into<String>, tag_capacity: u32, config: Config, backend: Arc<dyn Backend>) -> Self {
        Self { name: name.into(), tag_pool: TagPool::new(tag_capacity), pending: HashMap::new(), config, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// `insert_request`: allocates a tag, wraps `request` in a context, and records it in the
    /// pending table. Returns `TAG_ERROR` (no context retained) if the tag pool is exhausted.
    pub fn insert_request(&mut self, request: Request) -> u32 {
        let tag = self.tag_pool.acquire();
        if tag == TAG_ERROR {
            return TAG_ERROR;
        }
        let ctx = Box::new(RequestContext::new(tag, request));
        self.pending.insert(tag, Slot::NotPosted(ctx));
        tag
    }

    /// `post_request`: hands the context for `tag` to the backend, with the context's raw
    /// pointer as the `user_ptr`. On failure the tag is released and no trace of it remains.
    pub fn post_request(&mut self, tag: u32) -> Result<(), PostError> {
        let ctx = match self.pending.remove(&tag) {
            Some(Slot::NotPosted(ctx)) => ctx,
            _ => return Err(PostError::ShuttingDown),
        };
        let user_ptr = ctx.into_raw();
        // Safety: user_ptr was just produced above and not yet reconstructed.
        let ctx = unsafe { RequestContext::from_raw(user_ptr) };
        match self.backend.post(ctx) {
            Ok(()) => {
                self.pending.insert(tag, Slot::InFlight(user_ptr));
                Ok(())
            }
            Err(e) => {
                self.tag_pool.release(tag);
                Err(e)
            }
        }
    }

    /// `process_completion`: verifies `cpl.user_ptr` addresses a context this namespace owns,
    /// applies the per-opcode mapping (§4.5), and marks it `READY`.
    fn process_completion(&mut self, cpl: Completion) {
        if cpl.user_ptr == 0 {
            tracing::error!("backend delivered a null user_ptr completion; protocol bug");
            return;
        }
        // Safety: user_ptr values only ever originate from RequestContext::into_raw calls made
        // by this namespace's post_request, and are reconstructed exactly once, here.
        let mut ctx = unsafe { RequestContext::from_raw(cpl.user_ptr) };
        let tag = ctx.tag;
        if !matches!(self.pending.get(&tag), Some(Slot::InFlight(ptr)) if *ptr == cpl.user_ptr) {
            tracing::error!(tag, "completion user_ptr does not match an in-flight request");
            return;
        }
        let rsize = ctx.request.rsize();
        let is_partial = ctx.request.is_partial();
        let (status, rc_out) = map_completion(ctx.opcode, cpl.rc, cpl.status, rsize, is_partial);
        ctx.completion = Some(Completion { rc: cpl.rc, status, user_ptr: cpl.user_ptr });
        ctx.rc_out = rc_out;
        ctx.status = RequestStatus::Ready;
        self.pending.insert(tag, Slot::Ready(ctx));
    }

    /// `test_request` (§4.4): drains at most one backend completion, then reports `target_tag`'s
    /// status. Returns `None` while still pending.
    pub fn test_request(&mut self, target_tag: u32) -> Option<ErrorCode> {
        if let Some(cpl) = self.backend.test_any() {
            self.process_completion(cpl);
        }
        match self.pending.get(&target_tag) {
            Some(Slot::Ready(ctx)) => {
                Some(ctx.completion.expect("ready context always carries a completion").status)
            }
            _ => None,
        }
    }

    /// `wait_request` (§4.4): polls `test_request` until ready or the namespace's configured
    /// timeout elapses, checking the clock only every [`CLOCK_CHECK_INTERVAL`] iterations. On
    /// timeout, issues a cancel and drains its synthetic completion before returning.
    pub fn wait_request(&mut self, target_tag: u32) -> ErrorCode {
        let start = Instant::now();
        let timeout = self.config.timeout_sec.map(Duration::from_secs);
        let mut iterations: u32 = 0;
        loop {
            if let Some(status) = self.test_request(target_tag) {
                return status;
            }
            iterations = iterations.wrapping_add(1);
            if let Some(timeout) = timeout {
                if iterations % CLOCK_CHECK_INTERVAL == 0 && start.elapsed() >= timeout {
                    return self.timeout_and_cancel(target_tag);
                }
            }
        }
    }

    fn timeout_and_cancel(&mut self, target_tag: u32) -> ErrorCode {
        if let Some(Slot::InFlight(user_ptr)) = self.pending.get(&target_tag) {
            self.backend.cancel(*user_ptr);
        }
        // Drain until the synthetic cancellation (or a genuine race-won completion) arrives.
        loop {
            if self.test_request(target_tag).is_some() {
                return ErrorCode::ErrTimeout;
            }
        }
    }

    /// `remove_request`: retires `tag`'s context (must be `READY`) and returns its completion,
    /// releasing the tag for reuse.
    pub fn remove_request(&mut self, tag: u32) -> Option<(Completion, Option<i64>)> {
        match self.pending.remove(&tag)? {
            Slot::Ready(ctx) => {
                self.tag_pool.release(tag);
                let completion = ctx.completion?;
                Some((completion, ctx.rc_out))
            }
            other => {
                // Not ready yet; put it back untouched.
                self.pending.insert(tag, other);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::request::Opcode;

    struct FakeBackend {
        completions: Mutex<Vec<Completion>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self { completions: Mutex::new(Vec::new()) }
        }

        fn complete(&self, user_ptr: u64, rc: i64, status: ErrorCode) {
            self.completions.lock().unwrap().push(Completion { rc, status, user_ptr });
        }
    }

    impl Backend for FakeBackend {
        fn post(&self, ctx: Box<RequestContext>) -> Result<(), PostError> {
            // Immediately "complete" the posted request for determinism in tests.
            let user_ptr = ctx.into_raw();
            self.complete(user_ptr, 1, ErrorCode::Success);
            Ok(())
        }

        fn test_any(&self) -> Option<Completion> {
            self.completions.lock().unwrap().pop()
        }

        fn cancel(&self, user_ptr: u64) {
            self.complete(user_ptr, 0, ErrorCode::ErrCancelled);
        }

        fn exit(&self) {}
    }

    fn fake_request() -> Request {
        Request {
            opcode: Opcode::Put,
            namespace_handle: 0,
            group: 0,
            key: "testkey".to_owned(),
            match_: String::new(),
            sge: vec![vec![0u8; 126]],
            flags: 0,
            user_ptr: 0,
        }
    }

    #[test]
    fn post_and_wait_round_trip() {
        let backend = Arc::new(FakeBackend::new());
        let mut ns = Namespace::new("ns0", 8, Config::new(None), backend);
        let tag = ns.insert_request(fake_request());
        assert_ne!(tag, TAG_ERROR);
        ns.post_request(tag).unwrap();
        let status = ns.wait_request(tag);
        assert_eq!(status, ErrorCode::Success);
        let (completion, _) = ns.remove_request(tag).unwrap();
        assert_eq!(completion.rc, 1);
    }

    #[test]
    fn tag_pool_exhaustion_returns_tag_error() {
        let backend = Arc::new(FakeBackend::new());
        let mut ns = Namespace::new("ns0", 1, Config::new(None), backend);
        let t0 = ns.insert_request(fake_request());
        assert_ne!(t0, TAG_ERROR);
        let t1 = ns.insert_request(fake_request());
        assert_eq!(t1, TAG_ERROR);
    }
}
