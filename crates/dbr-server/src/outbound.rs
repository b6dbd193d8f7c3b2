//! Main-loop outbound step: drain at most one backend completion, serialize it, and send it back
//! to the owning client, unlinking its request context from that client's pending queue
//! regardless of its position (§4.6, §9 scenario 9).

use std::io::{self, ErrorKind, Write};

use dbr_core::RequestContext;

use crate::context::MainContext;
use crate::wire;

/// Returns `Ok(true)` if a completion was drained and dispatched this call, `Ok(false)` if the
/// backend had nothing ready.
pub fn outbound_step(ctx: &mut MainContext) -> io::Result<bool> {
    let Some(completion) = ctx.backend.test_any() else {
        return Ok(false);
    };

    if completion.user_ptr == 0 {
        tracing::error!("backend delivered a null user_ptr completion; protocol bug");
        return Ok(false);
    }

    let Some(token) = ctx.inflight.remove(&completion.user_ptr) else {
        tracing::error!(user_ptr = completion.user_ptr, "completion for unknown in-flight request");
        return Ok(false);
    };

    // Safety: user_ptr values handed to the backend only ever originate from inbound.rs's
    // post_request, which registers them in `inflight` exactly once before use.
    let request_ctx = unsafe { RequestContext::from_raw(completion.user_ptr) };
    let original_user_ptr = request_ctx.request.user_ptr;
    let opcode = request_ctx.opcode;
    let payload = request_ctx.request.sge;
    let outgoing = dbr_core::Completion { rc: completion.rc, status: completion.status, user_ptr: original_user_ptr };

    let written = match wire::serialize_completion(opcode, &outgoing, &payload, ctx.s_buf.writable_tail_mut()) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize completion");
            retire(ctx, token, completion.user_ptr);
            return Ok(true);
        }
    };
    ctx.s_buf.advance_append(written + 1);

    let Some(cctx) = ctx.client_contexts.get_mut(&token) else {
        tracing::error!(?token, "completion for a client context that no longer exists");
        ctx.s_buf.advance_processed(written + 1);
        ctx.s_buf.compact();
        retire_without_cctx(ctx, completion.user_ptr);
        return Ok(true);
    };

    let mut buf = ctx.s_buf.unprocessed().to_vec();
    let mut sent_total = 0usize;
    while sent_total < buf.len() {
        match cctx.connection.socket.write(&buf[sent_total..]) {
            Ok(0) => return Err(io::Error::from(ErrorKind::BrokenPipe)),
            Ok(n) => sent_total += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
    buf.clear();
    ctx.s_buf.advance_processed(sent_total);
    ctx.s_buf.compact();

    cctx.unlink_pending(completion.user_ptr);
    ctx.total_pending = ctx.total_pending.saturating_sub(1);
    Ok(true)
}

fn retire(ctx: &mut MainContext, token: mio::Token, user_ptr: u64) {
    if let Some(cctx) = ctx.client_contexts.get_mut(&token) {
        cctx.unlink_pending(user_ptr);
    }
    ctx.total_pending = ctx.total_pending.saturating_sub(1);
}

fn retire_without_cctx(ctx: &mut MainContext, _user_ptr: u64) {
    ctx.total_pending = ctx.total_pending.saturating_sub(1);
}
