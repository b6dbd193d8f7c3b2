//! The listener thread: blocking accept loop, handing each new connection off to the main thread
//! for event registration (§4.6, §5 "two OS threads").

use std::net::{TcpListener as StdTcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use mio::net::TcpStream;
use mio::Token;

use crate::config::{ConfigError, ServerConfig};
use crate::connection::Connection;

/// The first token value handed out to accepted connections; `Token(0)` is reserved for the
/// listener's own readiness registration on the main thread's `Poll`.
pub const FIRST_CLIENT_TOKEN: usize = 1;

pub struct NewConnection {
    pub token: Token,
    pub connection: Connection,
}

pub fn resolve_listen_addr(url: &str) -> Result<std::net::SocketAddr, ConfigError> {
    url.to_socket_addrs()
        .ok()
        .and_then(|mut it| it.next())
        .ok_or_else(|| ConfigError::InvalidUrl(url.to_owned()))
}

/// Binds and listens (backlog 128), then accepts connections until `keep_running` is cleared,
/// sending each one to `new_conn_tx` for the main thread to register with its `Poll`.
pub fn run(
    cfg: ServerConfig,
    new_conn_tx: Sender<NewConnection>,
    keep_running: Arc<std::sync::atomic::AtomicBool>,
) -> std::io::Result<()> {
    let addr = resolve_listen_addr(&cfg.listen_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let std_listener = StdTcpListener::bind(addr)?;
    // Deliberately blocking: the listener thread's own accept() is a plain syscall, matching
    // the original's separation between a blocking accept thread and an event-driven main loop.

    let next_token = AtomicUsize::new(FIRST_CLIENT_TOKEN);

    while keep_running.load(Ordering::Relaxed) {
        match std_listener.accept() {
            Ok((std_socket, remote_address)) => {
                std_socket.set_nonblocking(true)?;
                let socket = TcpStream::from_std(std_socket);
                let connection = Connection::new(socket, remote_address);
                let token = Token(next_token.fetch_add(1, Ordering::Relaxed));
                tracing::info!(?token, %remote_address, "accepted connection");
                if new_conn_tx.send(NewConnection { token, connection }).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                return Err(e);
            }
        }
    }
    Ok(())
}
