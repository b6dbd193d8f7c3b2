//! Operation entry points. Each is a thin `build request → run` call; the lifecycle and
//! completion mapping live in [`dbr_core`].

use dbr_core::{Opcode, Request};
use dbr_proto::{ErrorCode, FLAGS_PARTIAL};

use crate::handle::{NamespaceHandle, OpResult};

fn base_request(opcode: Opcode, key: &str, match_: &str, sge: Vec<Vec<u8>>, flags: u32) -> Request {
    Request {
        opcode,
        namespace_handle: 0,
        group: 0,
        key: key.to_owned(),
        match_: match_.to_owned(),
        sge,
        flags,
        user_ptr: 0,
    }
}

impl NamespaceHandle {
    /// `PUT`: writes `data` at `key`. Returns the number of bytes accepted on success.
    pub fn put(&self, key: &str, data: &[u8]) -> Result<i64, ErrorCode> {
        let request = base_request(Opcode::Put, key, "", vec![data.to_vec()], 0);
        into_result(self.run(request))
    }

    /// `GET`: reads at most `buf.len()` bytes matching `key`/`match_` into `buf`.
    /// `partial` accepts a truncated read instead of failing with `ERR_UBUFFER`.
    pub fn get(&self, key: &str, match_: &str, buf_len: usize, partial: bool) -> Result<i64, ErrorCode> {
        let flags = if partial { FLAGS_PARTIAL } else { 0 };
        let request = base_request(Opcode::Get, key, match_, vec![vec![0u8; buf_len]], flags);
        into_result(self.run(request))
    }

    /// `READ`: as `GET`, but a backend-reported failure is softened to `ERR_UNAVAIL` rather than
    /// propagated verbatim (§4.5's READ→GET cascade).
    pub fn read(&self, key: &str, match_: &str, buf_len: usize, partial: bool) -> Result<i64, ErrorCode> {
        let flags = if partial { FLAGS_PARTIAL } else { 0 };
        let request = base_request(Opcode::Read, key, match_, vec![vec![0u8; buf_len]], flags);
        into_result(self.run(request))
    }

    /// `REMOVE`: deletes the entry at `key`.
    pub fn remove(&self, key: &str) -> Result<(), ErrorCode> {
        let request = base_request(Opcode::Remove, key, "", Vec::new(), 0);
        into_result(self.run(request)).map(|_| ())
    }

    /// `DIRECTORY`: lists keys matching `match_` into `buf`.
    pub fn directory(&self, match_: &str, buf_len: usize) -> Result<i64, ErrorCode> {
        let request = base_request(Opcode::Directory, "", match_, vec![vec![0u8; buf_len]], 0);
        into_result(self.run(request))
    }

    /// `ITERATOR`: advances a directory-style cursor over `match_`, naming the result in
    /// `tuple_name`. Mirrors the original `libdbrIterator` template exactly, including clearing
    /// the output on any early failure.
    pub fn iterator(&self, group: u32, match_: &str, tuple_name_len: usize) -> Result<i64, ErrorCode> {
        let mut request = base_request(Opcode::Iterator, "", match_, vec![vec![0u8; tuple_name_len]], 0);
        request.group = group;
        into_result(self.run(request))
    }

    /// `NSCREATE`: creates a namespace.
    pub fn ns_create(&self, name: &str) -> Result<(), ErrorCode> {
        let request = base_request(Opcode::NsCreate, name, "", Vec::new(), 0);
        into_result(self.run(request)).map(|_| ())
    }

    /// `NSATTACH`: attaches to `name`, returning the resulting reference count.
    pub fn ns_attach(&self, name: &str) -> Result<i64, ErrorCode> {
        let request = base_request(Opcode::NsAttach, name, "", Vec::new(), 0);
        into_result(self.run(request))
    }

    /// `NSDETACH`: detaches from `name`, returning the resulting reference count.
    pub fn ns_detach(&self, name: &str) -> Result<i64, ErrorCode> {
        let request = base_request(Opcode::NsDetach, name, "", Vec::new(), 0);
        into_result(self.run(request))
    }

    /// `NSDELETE`: deletes a namespace (must have no remaining attachments).
    pub fn ns_delete(&self, name: &str) -> Result<(), ErrorCode> {
        let request = base_request(Opcode::NsDelete, name, "", Vec::new(), 0);
        into_result(self.run(request)).map(|_| ())
    }

    /// `NSQUERY`: reads namespace metadata into `buf`.
    pub fn ns_query(&self, name: &str, buf_len: usize) -> Result<i64, ErrorCode> {
        let request = base_request(Opcode::NsQuery, name, "", vec![vec![0u8; buf_len]], 0);
        into_result(self.run(request))
    }

    /// `NSADDUNITS`: grows a namespace's backing storage allocation by `units`.
    pub fn ns_add_units(&self, name: &str, units: i64) -> Result<(), ErrorCode> {
        let request = base_request(Opcode::NsAddUnits, name, "", vec![units.to_le_bytes().to_vec()], 0);
        into_result(self.run(request)).map(|_| ())
    }

    /// `NSREMOVEUNITS`: shrinks a namespace's backing storage allocation by `units`.
    pub fn ns_remove_units(&self, name: &str, units: i64) -> Result<(), ErrorCode> {
        let request = base_request(Opcode::NsRemoveUnits, name, "", vec![units.to_le_bytes().to_vec()], 0);
        into_result(self.run(request)).map(|_| ())
    }

    /// `MOVE`: unsupported (§4.5); always yields `ERR_NOTIMPL` without reaching the backend.
    pub fn move_(&self, _src: &str, _dst: &str) -> Result<(), ErrorCode> {
        Err(ErrorCode::ErrNotImpl)
    }
}

fn into_result(result: OpResult) -> Result<i64, ErrorCode> {
    if result.status == ErrorCode::Success {
        Ok(result.rc_out.unwrap_or(0))
    } else {
        Err(result.status)
    }
}
