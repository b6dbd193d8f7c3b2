//! The wire-visible `DBR_ERR_*` status codes and their mapping from backend errno values.

/// Status reported to a client in a completion.
///
/// Numeric order is part of the wire contract: do not reorder variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    ErrGeneric,
    ErrInvalid,
    ErrHandle,
    ErrInProgress,
    ErrTimeout,
    ErrUbuffer,
    ErrUnavail,
    ErrExists,
    ErrNsBusy,
    ErrNsInval,
    ErrNoMemory,
    ErrTagError,
    ErrNoFile,
    ErrNoAuth,
    ErrNoConnect,
    ErrCancelled,
    ErrNotImpl,
    ErrInvalidOp,
    ErrBePost,
    ErrBeProto,
    ErrBeGeneral,
    ErrMaxError,
}

impl ErrorCode {
    /// Human-readable string exactly as mandated by the error-code test suite.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Operation successful",
            Self::ErrGeneric => "A general or unknown error has occurred",
            Self::ErrInvalid => "Invalid argument",
            Self::ErrHandle => "An invalid handle was encountered",
            Self::ErrInProgress => "Operation in progress",
            Self::ErrTimeout => "Operation timed out",
            Self::ErrUbuffer => "Provided user buffer problem (too small, not available)",
            Self::ErrUnavail => "Entry not available",
            Self::ErrExists => "Entry already exists",
            Self::ErrNsBusy => "Namespace still referenced by a client",
            Self::ErrNsInval => "Namespace is invalid",
            Self::ErrNoMemory => "Insufficient memory or storage",
            Self::ErrTagError => "Invalid tag",
            Self::ErrNoFile => "File not found",
            Self::ErrNoAuth => "Access authorization required or failed",
            Self::ErrNoConnect => "Connection to a storage backend failed",
            Self::ErrCancelled => "Operation was cancelled",
            Self::ErrNotImpl => "Operation not implemented",
            Self::ErrInvalidOp => "Invalid operation",
            Self::ErrBePost => "Failed to post request to back-end",
            Self::ErrBeProto => "A protocol error in the back-end was detected",
            Self::ErrBeGeneral => "Unspecified back-end error",
            Self::ErrMaxError => "Unknown Error",
        }
    }

    /// Looks up the human string for an arbitrary numeric code, the way `get_error` does on the
    /// wire: anything outside the known range (including `ErrMaxError` itself) is "Unknown Error".
    pub fn get_error(code: i32) -> &'static str {
        match Self::from_i32(code) {
            Some(c) if c != Self::ErrMaxError => c.as_str(),
            _ => "Unknown Error",
        }
    }

    pub const fn from_i32(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            1 => Self::ErrGeneric,
            2 => Self::ErrInvalid,
            3 => Self::ErrHandle,
            4 => Self::ErrInProgress,
            5 => Self::ErrTimeout,
            6 => Self::ErrUbuffer,
            7 => Self::ErrUnavail,
            8 => Self::ErrExists,
            9 => Self::ErrNsBusy,
            10 => Self::ErrNsInval,
            11 => Self::ErrNoMemory,
            12 => Self::ErrTagError,
            13 => Self::ErrNoFile,
            14 => Self::ErrNoAuth,
            15 => Self::ErrNoConnect,
            16 => Self::ErrCancelled,
            17 => Self::ErrNotImpl,
            18 => Self::ErrInvalidOp,
            19 => Self::ErrBePost,
            20 => Self::ErrBeProto,
            21 => Self::ErrBeGeneral,
            22 => Self::ErrMaxError,
            _ => return None,
        })
    }

    /// Maps a backend errno (as a positive `libc` error value, e.g. `libc::EINVAL`) to the
    /// corresponding wire status. `0` maps to `Success`.
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            0 => Self::Success,
            libc::EINVAL | libc::EMSGSIZE => Self::ErrInvalid,
            libc::ETIMEDOUT => Self::ErrTimeout,
            libc::ENODATA | libc::ENOENT => Self::ErrUnavail,
            libc::EEXIST => Self::ErrExists,
            libc::ENOMEM => Self::ErrNoMemory,
            libc::EBADF => Self::ErrNoFile,
            libc::EPERM => Self::ErrNoAuth,
            libc::ENOTCONN => Self::ErrNoConnect,
            libc::ENOTSUP | libc::ENOSYS => Self::ErrNotImpl,
            libc::EBADMSG => Self::ErrInvalidOp,
            libc::ENOMSG => Self::ErrBePost,
            libc::EPROTO => Self::ErrBeProto,
            _ => Self::ErrBeGeneral,
        }
    }

    /// Maps a raw backend return code, which is a negative errno (`-EINVAL`, ...) or `0` for
    /// success, the way the completion engine's generic table does.
    pub fn from_backend_rc(rc: i64) -> Self {
        if rc >= 0 { Self::Success } else { Self::from_errno((-rc) as i32) }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_match_mandated_table() {
        assert_eq!(ErrorCode::Success.as_str(), "Operation successful");
        assert_eq!(ErrorCode::ErrBeGeneral.as_str(), "Unspecified back-end error");
        assert_eq!(ErrorCode::ErrCancelled.as_str(), "Operation was cancelled");
    }

    #[test]
    fn out_of_range_is_unknown() {
        assert_eq!(ErrorCode::get_error(-1), "Unknown Error");
        assert_eq!(ErrorCode::get_error(ErrorCode::ErrMaxError as i32), "Unknown Error");
        assert_eq!(ErrorCode::get_error(10532), "Unknown Error");
    }

    #[test]
    fn errno_mapping_generic_table() {
        assert_eq!(ErrorCode::from_errno(libc::EINVAL), ErrorCode::ErrInvalid);
        assert_eq!(ErrorCode::from_errno(libc::ENOENT), ErrorCode::ErrUnavail);
        assert_eq!(ErrorCode::from_errno(libc::EPROTO), ErrorCode::ErrBeProto);
        assert_eq!(ErrorCode::from_errno(999_999), ErrorCode::ErrBeGeneral);
    }

    #[test]
    fn backend_rc_success_and_failure() {
        assert_eq!(ErrorCode::from_backend_rc(0), ErrorCode::Success);
        assert_eq!(ErrorCode::from_backend_rc(-(libc::ENOTCONN as i64)), ErrorCode::ErrNoConnect);
    }

    #[test]
    fn distinct_codes_count_matches_max_error() {
        let count = (0..=ErrorCode::ErrMaxError as i32)
            .filter_map(ErrorCode::from_i32)
            .count();
        assert_eq!(count as i32, ErrorCode::ErrMaxError as i32 + 1);
    }
}
