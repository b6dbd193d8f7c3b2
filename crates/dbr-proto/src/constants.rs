//! Wire-level constants shared between the client library and the forwarding server.

/// Maximum number of elements in a single scatter-gather list.
pub const SGE_MAX: usize = 256;

/// Growth step applied to a locator connection list's capacity each time it fills up.
pub const CONN_LIST_GRANULARITY: usize = 5;

/// Backend-defined upper bound on routable connection indices.
pub const MAX_CONNECTIONS: usize = 4096;

/// Sentinel value denoting "no connection" in a locator connection list.
pub const CONNECTION_INDEX_INVALID: usize = usize::MAX;

/// Server-configurable ceiling on the number of connections tracked by the ready queue.
pub const CONNECTIONS_LIMIT: usize = 1024;

/// Maximum length of a printable listen/peer address string.
pub const URL_MAX_LENGTH: usize = 256;

/// Sentinel tag returned when a namespace's tag pool is exhausted or on lookup failure.
pub const TAG_ERROR: u32 = u32::MAX;

/// Request flag: accept a truncated `GET` rather than failing with `ERR_UBUFFER`.
pub const FLAGS_PARTIAL: u32 = 1 << 0;
