//! The forwarding server binary: terminates remote clients, forwards requests to a local
//! backend, and ships completions back (§4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::Parser;
use mio::{Events, Interest, Poll, Token};

use dbr_server::config::ServerConfig;
use dbr_server::context::MainContext;
use dbr_server::memory_backend::MemoryBackend;
use dbr_server::{inbound, listener, outbound};

const LISTENER_WAKE_TOKEN: Token = Token(usize::MAX);

fn main() -> std::io::Result<()> {
    let cfg = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if cfg.daemon {
        // SAFETY: called before any threads are spawned and before any other fork-unsafe state
        // (file descriptors, mutexes) has been created by this process.
        match unsafe { libc::fork() } {
            -1 => {
                tracing::error!("failed to fork fship_srv daemon");
                std::process::exit(1);
            }
            0 => {} // child continues as the daemon
            _ => std::process::exit(0), // parent exits immediately
        }
    }

    let backend = Arc::new(MemoryBackend::new());
    let mut ctx = MainContext::new(&cfg, backend);

    let mut poll = Poll::new()?;
    let (new_conn_tx, new_conn_rx) = mpsc::channel();
    let keep_running = Arc::new(AtomicBool::new(true));

    let listener_cfg = cfg.clone();
    let listener_keep_running = Arc::clone(&keep_running);
    let listener_handle = std::thread::spawn(move || {
        if let Err(e) = listener::run(listener_cfg, new_conn_tx, listener_keep_running) {
            tracing::error!(error = %e, "listener thread exited with an error");
        }
    });

    let mut events = Events::with_capacity(1024);
    let registry = poll.registry().try_clone()?;

    let rc = run_main_loop(&mut ctx, &mut poll, &mut events, &new_conn_rx, &registry);

    keep_running.store(false, Ordering::Relaxed);
    let _ = listener_handle.join();

    rc
}

fn run_main_loop(
    ctx: &mut MainContext,
    poll: &mut Poll,
    events: &mut Events,
    new_conn_rx: &mpsc::Receiver<listener::NewConnection>,
    registry: &mio::Registry,
) -> std::io::Result<()> {
    loop {
        while let Ok(mut new_conn) = new_conn_rx.try_recv() {
            registry.register(&mut new_conn.connection.socket, new_conn.token, Interest::READABLE)?;
            ctx.client_contexts.insert(new_conn.token, dbr_server::client_context::ClientContext::new(new_conn.connection));
        }

        // Adaptive polling (§9): spin non-blocking while backend work is outstanding, block
        // otherwise, mirroring the source's mixed blocking/non-blocking `event_base_loop` calls.
        let timeout = if ctx.total_pending > 0 { Some(StdDuration::ZERO) } else { Some(StdDuration::from_secs(1)) };
        match poll.poll(events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }

        for event in events.iter() {
            let token = event.token();
            if token == LISTENER_WAKE_TOKEN {
                continue;
            }
            ctx.conn_queue.push(token);
        }

        if let Some(token) = ctx.conn_queue.pop() {
            match inbound::inbound_step(ctx, token) {
                Ok(true) => {}
                Ok(false) => teardown_client(ctx, registry, token),
                Err(e) => {
                    tracing::error!(?token, error = %e, "inbound step failed, tearing down connection");
                    teardown_client(ctx, registry, token);
                }
            }
        }

        match outbound::outbound_step(ctx) {
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "outbound step failed");
                return Err(e);
            }
        }
    }
}

fn teardown_client(ctx: &mut MainContext, registry: &mio::Registry, token: Token) {
    if let Some(mut cctx) = ctx.client_contexts.remove(&token) {
        let _ = registry.deregister(&mut cctx.connection.socket);
        for user_ptr in cctx.pending.drain(..) {
            ctx.inflight.remove(&user_ptr);
            ctx.total_pending = ctx.total_pending.saturating_sub(1);
        }
    }
}
