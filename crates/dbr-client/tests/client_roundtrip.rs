use std::sync::{Arc, Mutex};

use dbr_client::{Config, NamespaceHandle};
use dbr_core::{Backend, Completion, ErrorCode, PostError, RequestContext};

/// A backend whose reported `rc` for a GET/DIRECTORY-shaped completion is configurable,
/// independent of the request's actual buffer size, so undersized-read scenarios can be driven
/// deterministically.
struct CannedBackend {
    reported_rc: i64,
    completions: Mutex<Vec<Completion>>,
}

impl CannedBackend {
    fn new(reported_rc: i64) -> Self {
        Self { reported_rc, completions: Mutex::new(Vec::new()) }
    }
}

impl Backend for CannedBackend {
    fn post(&self, ctx: Box<RequestContext>) -> Result<(), PostError> {
        let user_ptr = ctx.into_raw();
        self.completions.lock().unwrap().push(Completion {
            rc: self.reported_rc,
            status: ErrorCode::Success,
            user_ptr,
        });
        Ok(())
    }

    fn test_any(&self) -> Option<Completion> {
        self.completions.lock().unwrap().pop()
    }

    fn cancel(&self, user_ptr: u64) {
        self.completions.lock().unwrap().push(Completion { rc: 0, status: ErrorCode::ErrCancelled, user_ptr });
    }

    fn exit(&self) {}
}

#[test]
fn put_round_trip_reports_bytes_accepted() {
    let backend: Arc<dyn Backend> = Arc::new(CannedBackend::new(11));
    let ns = NamespaceHandle::new("ns0", 16, Config::new(None), backend);
    let rc = ns.put("k1", b"hello world").unwrap();
    assert_eq!(rc, 11);
}

#[test]
fn get_undersized_without_partial_is_ubuffer() {
    // Backend reports an actual size (252) larger than the 126-byte buffer the request posted.
    let backend: Arc<dyn Backend> = Arc::new(CannedBackend::new(252));
    let ns = NamespaceHandle::new("ns0", 16, Config::new(None), backend);
    let err = ns.get("k1", "", 126, false).unwrap_err();
    assert_eq!(err, ErrorCode::ErrUbuffer);
}

#[test]
fn get_undersized_with_partial_reports_actual_size() {
    let backend: Arc<dyn Backend> = Arc::new(CannedBackend::new(252));
    let ns = NamespaceHandle::new("ns0", 16, Config::new(None), backend);
    let rc = ns.get("k1", "", 126, true).unwrap();
    assert_eq!(rc, 252);
}

#[test]
fn move_is_unsupported() {
    let backend: Arc<dyn Backend> = Arc::new(CannedBackend::new(0));
    let ns = NamespaceHandle::new("ns0", 16, Config::new(None), backend);
    assert_eq!(ns.move_("a", "b"), Err(ErrorCode::ErrNotImpl));
}
