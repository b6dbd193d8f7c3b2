//! Per-client bookkeeping: the accepted connection plus its in-flight request queue.

use std::collections::VecDeque;

use crate::connection::Connection;

/// Owns `connection` for the lifetime of the client. `pending` holds the raw `user_ptr` identity
/// of every request posted to the backend on behalf of this client and not yet completed, in
/// post order; completions unlink from an arbitrary position (§9, scenario 9), not only the head.
pub struct ClientContext {
    pub connection: Connection,
    pub pending: VecDeque<u64>,
}

impl ClientContext {
    pub fn new(connection: Connection) -> Self {
        Self { connection, pending: VecDeque::new() }
    }

    pub fn push_pending(&mut self, user_ptr: u64) {
        self.pending.push_back(user_ptr);
    }

    /// Removes `user_ptr` from anywhere in the pending queue. Returns whether it was present.
    pub fn unlink_pending(&mut self, user_ptr: u64) -> bool {
        if let Some(pos) = self.pending.iter().position(|&p| p == user_ptr) {
            self.pending.remove(pos);
            true
        } else {
            false
        }
    }
}
