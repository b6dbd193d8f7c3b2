//! A synchronous in-memory stand-in for the storage backend.
//!
//! The concrete Redis-like protocol encoder/decoder is explicitly out of scope (§1): only the
//! `Backend` contract matters. This implementation satisfies that contract well enough to run
//! the forwarding server end-to-end without a real backend process, and is what `fship_srv`
//! links against by default.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use dbr_core::{Backend, Completion, ErrorCode, Opcode, PostError, RequestContext};

#[derive(Default)]
pub struct MemoryBackend {
    store: Mutex<HashMap<String, Vec<u8>>>,
    ready: Mutex<VecDeque<Completion>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn post(&self, mut ctx: Box<RequestContext>) -> Result<(), PostError> {
        let user_ptr = (&*ctx as *const RequestContext) as u64;
        let (rc, status) = match ctx.opcode {
            Opcode::Put => {
                let data: Vec<u8> = ctx.request.sge.iter().flat_map(|v| v.iter()).copied().collect();
                let len = data.len() as i64;
                self.store.lock().unwrap().insert(ctx.request.key.clone(), data);
                (len, ErrorCode::Success)
            }
            Opcode::Get | Opcode::Read => {
                let store = self.store.lock().unwrap();
                match store.get(&ctx.request.key) {
                    Some(data) => {
                        let n = data.len().min(ctx.request.sge.first().map_or(0, Vec::len));
                        if let Some(dst) = ctx.request.sge.first_mut() {
                            dst[..n].copy_from_slice(&data[..n]);
                        }
                        (data.len() as i64, ErrorCode::Success)
                    }
                    None => (0, ErrorCode::ErrUnavail),
                }
            }
            Opcode::Remove => {
                let removed = self.store.lock().unwrap().remove(&ctx.request.key).is_some();
                (0, if removed { ErrorCode::Success } else { ErrorCode::ErrUnavail })
            }
            Opcode::Directory => {
                let store = self.store.lock().unwrap();
                let listing = store.keys().cloned().collect::<Vec<_>>().join("\n");
                let bytes = listing.into_bytes();
                let n = bytes.len().min(ctx.request.sge.first().map_or(0, Vec::len));
                if let Some(dst) = ctx.request.sge.first_mut() {
                    dst[..n].copy_from_slice(&bytes[..n]);
                }
                (bytes.len() as i64, ErrorCode::Success)
            }
            _ => (0, ErrorCode::ErrNotImpl),
        };
        self.ready.lock().unwrap().push_back(Completion { rc, status, user_ptr });
        std::mem::forget(ctx); // ownership now solely tracked by `user_ptr`, reclaimed in test_any
        Ok(())
    }

    fn test_any(&self) -> Option<Completion> {
        self.ready.lock().unwrap().pop_front()
    }

    fn cancel(&self, user_ptr: u64) {
        self.ready.lock().unwrap().push_back(Completion { rc: 0, status: ErrorCode::ErrCancelled, user_ptr });
    }

    fn exit(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbr_core::Request;

    fn put_request(key: &str, data: &[u8]) -> Request {
        Request {
            opcode: Opcode::Put,
            namespace_handle: 0,
            group: 0,
            key: key.to_owned(),
            match_: String::new(),
            sge: vec![data.to_vec()],
            flags: 0,
            user_ptr: 7,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let backend = MemoryBackend::new();
        let ctx = Box::new(RequestContext::new(0, put_request("k", b"value")));
        backend.post(ctx).unwrap();
        let put_completion = backend.test_any().unwrap();
        assert_eq!(put_completion.rc, 5);

        let get_req = Request {
            opcode: Opcode::Get,
            namespace_handle: 0,
            group: 0,
            key: "k".to_owned(),
            match_: String::new(),
            sge: vec![vec![0u8; 16]],
            flags: 0,
            user_ptr: 8,
        };
        backend.post(Box::new(RequestContext::new(0, get_req))).unwrap();
        let get_completion = backend.test_any().unwrap();
        assert_eq!(get_completion.status, ErrorCode::Success);
        assert_eq!(get_completion.rc, 5);
    }

    #[test]
    fn get_missing_key_is_unavail() {
        let backend = MemoryBackend::new();
        let get_req = Request {
            opcode: Opcode::Get,
            namespace_handle: 0,
            group: 0,
            key: "missing".to_owned(),
            match_: String::new(),
            sge: vec![vec![0u8; 16]],
            flags: 0,
            user_ptr: 1,
        };
        backend.post(Box::new(RequestContext::new(0, get_req))).unwrap();
        let completion = backend.test_any().unwrap();
        assert_eq!(completion.status, ErrorCode::ErrUnavail);
    }
}
