//! A single accepted client socket and its bookkeeping.

use std::net::SocketAddr;

use dbr_timing::Instant;
use dbr_utils::ArrayStr;
use mio::net::TcpStream;

use dbr_proto::URL_MAX_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Disconnected,
    Connected,
    Authorized,
    Failed,
}

pub struct Connection {
    pub socket: TcpStream,
    pub status: ConnStatus,
    pub remote_address: SocketAddr,
    pub url_string: ArrayStr<URL_MAX_LENGTH>,
    pub last_alive: Instant,
}

impl Connection {
    /// New connections are marked `AUTHORIZED` immediately: this implementation carries no
    /// authentication protocol (§1 Non-goals).
    pub fn new(socket: TcpStream, remote_address: SocketAddr) -> Self {
        let url_string = ArrayStr::from_str_truncate(&remote_address.to_string());
        Self { socket, status: ConnStatus::Authorized, remote_address, url_string, last_alive: Instant::now() }
    }

    pub fn touch(&mut self) {
        self.last_alive = Instant::now();
    }
}
