//! The forwarding server's concrete wire layout for requests and completions, built on top of
//! the generic SGE codec (`dbr_proto::sge`). §6: "its exact field layout is backend-defined and
//! echoed back in completions" — this is this implementation's choice of that layout.
//!
//! A request frame is an SGE list whose first element is a fixed binary header (opcode, group,
//! namespace handle, flags, user_ptr, then length-prefixed key/match strings) and whose
//! remaining elements are the request's payload SGEs. A completion frame mirrors this: a header
//! element (opcode, rc, status, user_ptr) followed by whatever payload the backend returned.

use dbr_core::{Completion, Opcode, Request};
use dbr_proto::sge::{self, ParseResult, SgeError};
use dbr_proto::ErrorCode;

fn opcode_to_wire(opcode: Opcode) -> u8 {
    match opcode {
        Opcode::Put => 0,
        Opcode::Get => 1,
        Opcode::Read => 2,
        Opcode::Directory => 3,
        Opcode::Remove => 4,
        Opcode::Iterator => 5,
        Opcode::NsCreate => 6,
        Opcode::NsAttach => 7,
        Opcode::NsDetach => 8,
        Opcode::NsDelete => 9,
        Opcode::NsQuery => 10,
        Opcode::NsAddUnits => 11,
        Opcode::NsRemoveUnits => 12,
        Opcode::Move => 13,
        Opcode::Unknown(b) => b,
    }
}

fn opcode_from_wire(b: u8) -> Opcode {
    match b {
        0 => Opcode::Put,
        1 => Opcode::Get,
        2 => Opcode::Read,
        3 => Opcode::Directory,
        4 => Opcode::Remove,
        5 => Opcode::Iterator,
        6 => Opcode::NsCreate,
        7 => Opcode::NsAttach,
        8 => Opcode::NsDetach,
        9 => Opcode::NsDelete,
        10 => Opcode::NsQuery,
        11 => Opcode::NsAddUnits,
        12 => Opcode::NsRemoveUnits,
        13 => Opcode::Move,
        other => Opcode::Unknown(other),
    }
}

fn encode_request_header(req: &Request) -> Vec<u8> {
    let key = req.key.as_bytes();
    let match_ = req.match_.as_bytes();
    let mut out = Vec::with_capacity(27 + key.len() + 2 + match_.len());
    out.push(opcode_to_wire(req.opcode));
    out.extend_from_slice(&req.group.to_le_bytes());
    out.extend_from_slice(&req.namespace_handle.to_le_bytes());
    out.extend_from_slice(&req.flags.to_le_bytes());
    out.extend_from_slice(&req.user_ptr.to_le_bytes());
    out.extend_from_slice(&(key.len() as u16).to_le_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(&(match_.len() as u16).to_le_bytes());
    out.extend_from_slice(match_);
    out
}

fn decode_request_header(h: &[u8]) -> Result<Request, SgeError> {
    if h.len() < 27 {
        return Err(SgeError::BadMsg);
    }
    let opcode = opcode_from_wire(h[0]);
    let group = u32::from_le_bytes(h[1..5].try_into().unwrap());
    let namespace_handle = u64::from_le_bytes(h[5..13].try_into().unwrap());
    let flags = u32::from_le_bytes(h[13..17].try_into().unwrap());
    let user_ptr = u64::from_le_bytes(h[17..25].try_into().unwrap());
    let key_len = u16::from_le_bytes(h[25..27].try_into().unwrap()) as usize;
    let mut pos = 27;
    if h.len() < pos + key_len + 2 {
        return Err(SgeError::BadMsg);
    }
    let key = std::str::from_utf8(&h[pos..pos + key_len]).map_err(|_| SgeError::BadMsg)?.to_owned();
    pos += key_len;
    let match_len = u16::from_le_bytes(h[pos..pos + 2].try_into().unwrap()) as usize;
    pos += 2;
    if h.len() < pos + match_len {
        return Err(SgeError::BadMsg);
    }
    let match_ = std::str::from_utf8(&h[pos..pos + match_len]).map_err(|_| SgeError::BadMsg)?.to_owned();

    Ok(Request { opcode, namespace_handle, group, key, match_, sge: Vec::new(), flags, user_ptr })
}

/// Serializes a request frame into `out`, returning the number of bytes written (the `\0`
/// terminator lands at `out[written]`, matching [`sge::serialize`]'s contract).
pub fn serialize_request(req: &Request, out: &mut [u8]) -> Result<usize, SgeError> {
    let header = encode_request_header(req);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(1 + req.sge.len());
    parts.push(&header);
    for s in &req.sge {
        parts.push(s);
    }
    sge::serialize(&parts, out)
}

/// Parses one request frame out of `data`, without copying the payload SGEs.
pub fn deserialize_request(data: &mut [u8]) -> Result<Option<(Request, usize)>, SgeError> {
    match sge::deserialize(data)? {
        ParseResult::NeedMoreBytes => Ok(None),
        ParseResult::Complete(list) => {
            let elements = list.as_slice();
            let Some((header, payload)) = elements.split_first() else {
                return Err(SgeError::BadMsg);
            };
            let mut req = decode_request_header(header.as_slice())?;
            req.sge = payload.iter().map(|s| s.as_slice().to_vec()).collect();
            Ok(Some((req, list.consumed)))
        }
    }
}

fn encode_completion_header(opcode: Opcode, completion: &Completion) -> [u8; 21] {
    let mut out = [0u8; 21];
    out[0] = opcode_to_wire(opcode);
    out[1..9].copy_from_slice(&completion.rc.to_le_bytes());
    out[9..13].copy_from_slice(&(completion.status as i32).to_le_bytes());
    out[13..21].copy_from_slice(&completion.user_ptr.to_le_bytes());
    out
}

/// Serializes `(opcode, completion, payload)` into `out`, mirroring the request framing.
pub fn serialize_completion(opcode: Opcode, completion: &Completion, payload: &[Vec<u8>], out: &mut [u8]) -> Result<usize, SgeError> {
    let header = encode_completion_header(opcode, completion);
    let mut parts: Vec<&[u8]> = Vec::with_capacity(1 + payload.len());
    parts.push(&header);
    for s in payload {
        parts.push(s);
    }
    sge::serialize(&parts, out)
}

/// Parses a completion frame, used by a counterpart client reading from the forwarding server.
pub fn deserialize_completion(data: &mut [u8]) -> Result<Option<(Opcode, Completion, Vec<Vec<u8>>, usize)>, SgeError> {
    match sge::deserialize(data)? {
        ParseResult::NeedMoreBytes => Ok(None),
        ParseResult::Complete(list) => {
            let elements = list.as_slice();
            let Some((header, payload)) = elements.split_first() else {
                return Err(SgeError::BadMsg);
            };
            let h = header.as_slice();
            if h.len() < 21 {
                return Err(SgeError::BadMsg);
            }
            let opcode = opcode_from_wire(h[0]);
            let rc = i64::from_le_bytes(h[1..9].try_into().unwrap());
            let status_raw = i32::from_le_bytes(h[9..13].try_into().unwrap());
            let status = ErrorCode::from_i32(status_raw).unwrap_or(ErrorCode::ErrGeneric);
            let user_ptr = u64::from_le_bytes(h[13..21].try_into().unwrap());
            let payload = payload.iter().map(|s| s.as_slice().to_vec()).collect();
            Ok(Some((opcode, Completion { rc, status, user_ptr }, payload, list.consumed)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip_preserves_fields() {
        let req = Request {
            opcode: Opcode::Put,
            namespace_handle: 42,
            group: 7,
            key: "testkey".to_owned(),
            match_: String::new(),
            sge: vec![b"payload-bytes".to_vec()],
            flags: 0,
            user_ptr: 0xdead_beef,
        };
        let mut buf = vec![0u8; 4096];
        let written = serialize_request(&req, &mut buf).unwrap();
        let (decoded, consumed) = deserialize_request(&mut buf[..written + 1]).unwrap().unwrap();
        assert_eq!(consumed, written + 1);
        assert_eq!(decoded.opcode, Opcode::Put);
        assert_eq!(decoded.namespace_handle, 42);
        assert_eq!(decoded.group, 7);
        assert_eq!(decoded.key, "testkey");
        assert_eq!(decoded.user_ptr, 0xdead_beef);
        assert_eq!(decoded.sge, vec![b"payload-bytes".to_vec()]);
    }

    #[test]
    fn completion_round_trip_preserves_fields() {
        let completion = Completion { rc: 11, status: ErrorCode::Success, user_ptr: 99 };
        let mut buf = vec![0u8; 4096];
        let written = serialize_completion(Opcode::Put, &completion, &[], &mut buf).unwrap();
        let (opcode, decoded, payload, consumed) = deserialize_completion(&mut buf[..written + 1]).unwrap().unwrap();
        assert_eq!(consumed, written + 1);
        assert_eq!(opcode, Opcode::Put);
        assert_eq!(decoded.rc, 11);
        assert_eq!(decoded.status, ErrorCode::Success);
        assert_eq!(decoded.user_ptr, 99);
        assert!(payload.is_empty());
    }

    #[test]
    fn deserialize_request_reports_need_more_bytes_on_partial_frame() {
        let req = Request {
            opcode: Opcode::Get,
            namespace_handle: 0,
            group: 0,
            key: "k".to_owned(),
            match_: String::new(),
            sge: vec![vec![1, 2, 3]],
            flags: 0,
            user_ptr: 1,
        };
        let mut buf = vec![0u8; 4096];
        let written = serialize_request(&req, &mut buf).unwrap();
        let mut partial = buf[..written / 2].to_vec();
        assert!(matches!(deserialize_request(&mut partial), Ok(None)));
    }
}
