//! The server's main-thread state: backend handle, shared SR arenas, per-client contexts, and
//! the bookkeeping needed to route an out-of-order completion back to its owning client.

use std::collections::HashMap;
use std::sync::Arc;

use dbr_core::{Arena, Backend, ReadyQueue};
use dbr_proto::CONNECTIONS_LIMIT;
use mio::Token;

use crate::client_context::ClientContext;
use crate::config::ServerConfig;

pub struct MainContext {
    pub backend: Arc<dyn Backend>,
    pub r_buf: Arena,
    pub s_buf: Arena,
    pub conn_queue: ReadyQueue<Token>,
    pub client_contexts: HashMap<Token, ClientContext>,
    /// Maps an in-flight request's raw `user_ptr` identity back to the client context that owns
    /// it, since a backend completion arrives with no other addressing information.
    pub inflight: HashMap<u64, Token>,
    pub total_pending: usize,
}

impl MainContext {
    pub fn new(cfg: &ServerConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            r_buf: Arena::new(cfg.r_buf_capacity()),
            s_buf: Arena::new(cfg.s_buf_capacity()),
            conn_queue: ReadyQueue::new(CONNECTIONS_LIMIT),
            client_contexts: HashMap::new(),
            inflight: HashMap::new(),
            total_pending: 0,
        }
    }
}

impl Drop for MainContext {
    fn drop(&mut self) {
        self.backend.exit();
    }
}
