//! Maps a backend completion into the wire-visible [`ErrorCode`], per opcode (§4.5).

use dbr_proto::ErrorCode;

use crate::request::Opcode;

/// Applies the per-opcode completion rules.
///
/// `rc` and `status` come straight off the backend completion; `rsize` is the sum of the
/// request's posted SGE lengths; `is_partial` reflects `FLAGS_PARTIAL` on the original request.
/// Returns the mapped status and, for GET-shaped opcodes, the value that should be written to the
/// caller's `rc_out` slot.
///
/// For any opcode other than READ, `rc < 0` re-derives the status by running `-status` back
/// through the generic errno table rather than trusting `status` or `rc` directly — the backend's
/// `status` field is mostly a generic placeholder with the real error living in the negative `rc`,
/// but the mapping is keyed off `status`, not `rc`.
pub fn map_completion(
    opcode: Opcode,
    mut rc: i64,
    status: ErrorCode,
    rsize: i64,
    is_partial: bool,
) -> (ErrorCode, Option<i64>) {
    // READ cascades into the GET rules after clamping a negative rc, matching the backend's
    // documented fallthrough (no `break` in the original switch).
    if matches!(opcode, Opcode::Read) && rc < 0 {
        return map_get_directory(Opcode::Read, 0, ErrorCode::ErrUnavail, rsize, is_partial);
    }

    match opcode {
        Opcode::Read => map_get_directory(opcode, rc, status, rsize, is_partial),
        Opcode::Put => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            if rc < 1 { (ErrorCode::ErrUbuffer, None) } else { (ErrorCode::Success, None) }
        }
        Opcode::Get | Opcode::Directory => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            map_get_directory(opcode, rc, status, rsize, is_partial)
        }
        Opcode::Remove => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            (status, None)
        }
        Opcode::NsCreate | Opcode::NsAddUnits | Opcode::NsRemoveUnits => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            if rc != 0 { (status, None) } else { (ErrorCode::Success, None) }
        }
        Opcode::NsAttach | Opcode::NsDetach => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            if rc <= 0 { (status, None) } else { (ErrorCode::Success, Some(rc)) }
        }
        Opcode::NsDelete => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            if rc != 0 && status == ErrorCode::Success {
                (ErrorCode::ErrBeGeneral, None)
            } else {
                (status, None)
            }
        }
        Opcode::NsQuery => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            if rsize < rc || rc == 0 { (ErrorCode::ErrUbuffer, None) } else { (ErrorCode::Success, Some(rc)) }
        }
        Opcode::Move => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            (ErrorCode::ErrNotImpl, None)
        }
        Opcode::Iterator => {
            if rc < 0 {
                return (ErrorCode::from_backend_rc(-(status as i32 as i64)), None);
            }
            map_get_directory(Opcode::Directory, rc, status, rsize, is_partial)
        }
        Opcode::Unknown(_) => {
            let _ = &mut rc;
            (ErrorCode::ErrInvalidOp, None)
        }
    }
}

fn map_get_directory(
    _opcode: Opcode,
    rc: i64,
    status: ErrorCode,
    rsize: i64,
    is_partial: bool,
) -> (ErrorCode, Option<i64>) {
    if rsize < rc {
        if is_partial {
            return (ErrorCode::Success, Some(rc));
        }
        return (ErrorCode::ErrUbuffer, None);
    }
    if status == ErrorCode::Success {
        if rc < 0 { (ErrorCode::ErrInvalid, None) } else { (ErrorCode::Success, Some(rc)) }
    } else {
        (status, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_success() {
        let (status, rc_out) = map_completion(Opcode::Put, 1, ErrorCode::Success, 126, false);
        assert_eq!(status, ErrorCode::Success);
        assert_eq!(rc_out, None);
    }

    #[test]
    fn put_zero_rc_is_ubuffer() {
        let (status, _) = map_completion(Opcode::Put, 0, ErrorCode::Success, 126, false);
        assert_eq!(status, ErrorCode::ErrUbuffer);
    }

    #[test]
    fn put_negative_rc_maps_from_status_not_rc() {
        // The mapping is keyed off `-status`, run back through the errno table; `rc`'s actual
        // negative value is irrelevant beyond signalling "error occurred".
        let status_in = ErrorCode::from_i32(libc::EEXIST).expect("EEXIST must fit the wire status range");
        let (status_out, _) = map_completion(Opcode::Put, -(libc::EPROTO as i64), status_in, 126, false);
        assert_eq!(status_out, ErrorCode::from_errno(libc::EEXIST));
    }

    #[test]
    fn get_undersized_without_partial_is_ubuffer() {
        let (status, rc_out) = map_completion(Opcode::Get, 252, ErrorCode::Success, 126, false);
        assert_eq!(status, ErrorCode::ErrUbuffer);
        assert_eq!(rc_out, None);
    }

    #[test]
    fn get_undersized_with_partial_is_success() {
        let (status, rc_out) = map_completion(Opcode::Get, 252, ErrorCode::Success, 126, true);
        assert_eq!(status, ErrorCode::Success);
        assert_eq!(rc_out, Some(252));
    }

    #[test]
    fn get_non_success_status_passes_through() {
        let (status, rc_out) = map_completion(Opcode::Get, 10, ErrorCode::ErrNoConnect, 126, false);
        assert_eq!(status, ErrorCode::ErrNoConnect);
        assert_eq!(rc_out, None);
    }

    #[test]
    fn read_negative_rc_cascades_into_get_rules() {
        let (status, _) = map_completion(Opcode::Read, -1, ErrorCode::ErrGeneric, 126, false);
        assert_eq!(status, ErrorCode::ErrUnavail);
    }

    #[test]
    fn remove_returns_status_verbatim() {
        let (status, _) = map_completion(Opcode::Remove, 0, ErrorCode::ErrUnavail, 0, false);
        assert_eq!(status, ErrorCode::ErrUnavail);
    }

    #[test]
    fn nsattach_positive_rc_is_refcount() {
        let (status, rc_out) = map_completion(Opcode::NsAttach, 3, ErrorCode::Success, 0, false);
        assert_eq!(status, ErrorCode::Success);
        assert_eq!(rc_out, Some(3));
    }

    #[test]
    fn nsdelete_protocol_bug_detected() {
        let (status, _) = map_completion(Opcode::NsDelete, 1, ErrorCode::Success, 0, false);
        assert_eq!(status, ErrorCode::ErrBeGeneral);
    }

    #[test]
    fn nsquery_zero_rc_is_ubuffer() {
        let (status, _) = map_completion(Opcode::NsQuery, 0, ErrorCode::Success, 0, false);
        assert_eq!(status, ErrorCode::ErrUbuffer);
    }

    #[test]
    fn move_is_not_implemented() {
        let (status, _) = map_completion(Opcode::Move, 0, ErrorCode::Success, 0, false);
        assert_eq!(status, ErrorCode::ErrNotImpl);
    }

    #[test]
    fn unknown_opcode_is_invalid_op() {
        let (status, _) = map_completion(Opcode::Unknown(99), 0, ErrorCode::Success, 0, false);
        assert_eq!(status, ErrorCode::ErrInvalidOp);
    }
}
