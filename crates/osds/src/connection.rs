//! Per-connection glue: message allocation/dispatch/fault handling wired to
//! a live `msgr2::protocol::Connection`.
//!
//! The messenger itself (framing, banner/handshake, auth) is an external
//! collaborator (§1); this module only owns the part the core is
//! responsible for: deciding which inbound message types it will accept,
//! turning an `OSD_OP` message into a reply, and tearing the connection down
//! cleanly on fault. `msgr2::protocol::Connection::start()` (the embedded
//! message loop) is not implemented upstream, so, exactly like
//! `osdclient::session::OSDSession::io_task` does on the client side, a
//! spawned task owns the `Connection` and drives `recv_message`/
//! `send_message` directly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use msgr2::message::Message;
use msgr2::protocol::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ops::{self, ConnectionOptions};
use crate::store::Store;
use crate::wire::{OsdOpReply, OsdOpRequest, CEPH_MSG_OSD_OP, CEPH_MSG_OSD_OPREPLY};

/// Inbound message types the core allocates a buffer for and hands to
/// `dispatch` (§4.5). Everything else is left to the messenger or dropped.
const CEPH_MSG_OSD_MAP: u16 = msgr2::message::CEPH_MSG_OSD_MAP;
const CEPH_MSG_OSD_BACKOFF: u16 = 61;
const CEPH_MSG_WATCH_NOTIFY: u16 = 18;

fn is_allocatable(msg_type: u16) -> bool {
    matches!(
        msg_type,
        CEPH_MSG_OSD_MAP | CEPH_MSG_OSD_BACKOFF | CEPH_MSG_WATCH_NOTIFY | CEPH_MSG_OSD_OP
    )
}

/// Drives one accepted, session-established connection until it faults or
/// the server asks it to stop. Replies are sent in the order their requests
/// were dispatched, since this loop is the only writer to the connection
/// and never starts a new request before the previous one's reply is sent.
pub async fn serve(
    mut conn: Connection,
    store: Arc<Mutex<Store>>,
    opts: ConnectionOptions,
    epoch: Arc<AtomicU32>,
) {
    loop {
        let msg = match conn.recv_message().await {
            Ok(msg) => msg,
            Err(e) => {
                // Fault: the messenger would invoke our fault hook here;
                // since this task owns the connection outright, exiting the
                // loop closes it and drops our reference.
                debug!("connection fault, closing: {e}");
                break;
            }
        };

        let msg_type = msg.msg_type();
        if !is_allocatable(msg_type) {
            // The core refuses to allocate a buffer for types it should
            // never receive (e.g. OSD_OPREPLY bouncing back to us).
            warn!("dropping unexpected message type {msg_type:#06x}");
            continue;
        }

        if msg_type != CEPH_MSG_OSD_OP {
            // OSD_MAP / OSD_BACKOFF / WATCH_NOTIFY are accepted but out of
            // this core's scope (OSD map subscription, peering, watch
            // notifications) and simply dropped.
            continue;
        }

        let reply = match handle_osd_op(&store, &msg, opts, epoch.load(Ordering::Relaxed)).await {
            Ok(reply) => reply,
            Err(e) => {
                // Codec-level failure: log and drop the request silently,
                // the connection stays open (§7).
                warn!("dropping malformed OSD_OP tid={}: {e}", msg.tid());
                continue;
            }
        };

        let (front, data) = reply.encode();
        let mut out = Message::new(CEPH_MSG_OSD_OPREPLY, front).with_tid(msg.tid());
        out.data = data;

        if let Err(e) = conn.send_message(out).await {
            debug!("failed to send OSD_OPREPLY tid={}: {e}", msg.tid());
            break;
        }
    }

    conn.mark_down().await;
    info!("connection closed");
}

async fn handle_osd_op(
    store: &Arc<Mutex<Store>>,
    msg: &Message,
    opts: ConnectionOptions,
    epoch: u32,
) -> crate::Result<OsdOpReply> {
    let mut front: Bytes = msg.front.clone();
    let mut req = OsdOpRequest::decode(msg.tid(), &mut front)?;
    req.epoch = epoch;

    let data = msg.data.clone();

    // §5's single-threaded assumption is about the dispatch pipeline itself
    // (no suspension points once a request starts); the store is still
    // shared across connection tasks here, so a mutex guards it per the
    // design notes' multi-threaded-I/O fallback. The dispatcher never
    // yields while holding it.
    let mut store = store.lock().await;
    Ok(ops::dispatch(&mut store, req, data, opts))
}
