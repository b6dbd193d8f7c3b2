//! Main-loop inbound step: recv bytes for one ready connection, deserialize as many complete
//! request frames as are buffered, and post each to the backend (§4.6).

use std::io::{self, ErrorKind, Read};

use dbr_core::RequestContext;
use mio::Token;

use crate::context::MainContext;
use crate::wire;

/// Processes exactly one ready connection. Returns `Ok(false)` if the connection was torn down
/// (peer EOF or a fatal I/O error), `Ok(true)` otherwise.
pub fn inbound_step(ctx: &mut MainContext, token: Token) -> io::Result<bool> {
    loop {
        let n = {
            let Some(cctx) = ctx.client_contexts.get_mut(&token) else {
                tracing::error!(?token, "inbound event for unknown client context");
                return Ok(false);
            };
            match cctx.connection.socket.read(ctx.r_buf.writable_tail_mut()) {
                Ok(0) => {
                    // Peer closed the connection: treated as end-of-stream, not as would-block
                    // (§9 fixes the source's conflation of these two cases).
                    tracing::info!(?token, "peer closed connection");
                    return Ok(false);
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        };
        ctx.r_buf.advance_append(n);
        cctx_touch(ctx, token);

        loop {
            let parsed = wire::deserialize_request(ctx.r_buf.unprocessed_mut());
            match parsed {
                Ok(Some((request, consumed))) => {
                    ctx.r_buf.advance_processed(consumed);
                    post_request(ctx, token, request);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(?token, error = %e, "malformed request frame, dropping connection");
                    return Ok(false);
                }
            }
        }
        ctx.r_buf.compact();
    }
    Ok(true)
}

fn cctx_touch(ctx: &mut MainContext, token: Token) {
    if let Some(cctx) = ctx.client_contexts.get_mut(&token) {
        cctx.connection.touch();
    }
}

fn post_request(ctx: &mut MainContext, token: Token, request: dbr_core::Request) {
    let request_ctx = Box::new(RequestContext::new(0, request));
    let user_ptr = request_ctx.into_raw();
    // Safety: user_ptr was just produced above and not yet reconstructed.
    let request_ctx = unsafe { RequestContext::from_raw(user_ptr) };
    match ctx.backend.post(request_ctx) {
        Ok(()) => {
            ctx.inflight.insert(user_ptr, token);
            if let Some(cctx) = ctx.client_contexts.get_mut(&token) {
                cctx.push_pending(user_ptr);
            }
            ctx.total_pending += 1;
        }
        Err(e) => {
            tracing::error!(?token, error = %e, "backend rejected post");
        }
    }
}
