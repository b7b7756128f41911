//! `OsdServer`: the start/stop lifecycle (§4.6) and the accept loop that
//! hands each established connection to `connection::serve`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::connection;
use crate::error::{OsdsError, Result};
use crate::monitor::MonitorClient;
use crate::ops::ConnectionOptions;
use crate::store::Store;

/// CRUSH weight the core boots with. The core never re-weights itself; a
/// real cluster admin tool would do that out of band.
const BOOT_CRUSH_WEIGHT: &str = "0.0010";

/// Lifecycle poll budget: 5 seconds total, checked in 300 ms slices (§4.6).
const LIFECYCLE_POLL_BUDGET: Duration = Duration::from_secs(5);
const LIFECYCLE_POLL_SLICE: Duration = Duration::from_millis(300);

pub struct OsdServerConfig {
    pub osd_id: i64,
    pub fsid: String,
    pub bind_addr: SocketAddr,
    pub opts: ConnectionOptions,
}

/// Owns the object store, the listener, and the monitor-client session for
/// one OSD process.
pub struct OsdServer {
    config: OsdServerConfig,
    mon: Arc<dyn MonitorClient>,
    store: Arc<Mutex<Store>>,
    epoch: Arc<AtomicU32>,
    accept_task: Option<JoinHandle<()>>,
    stopping: Arc<AtomicBool>,
}

impl OsdServer {
    pub fn new(config: OsdServerConfig, mon: Arc<dyn MonitorClient>) -> Self {
        OsdServer {
            config,
            mon,
            store: Arc::new(Mutex::new(Store::new())),
            epoch: Arc::new(AtomicU32::new(0)),
            accept_task: None,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open a monitor session, join the CRUSH map, boot, and wait up to 5 s
    /// (in 300 ms slices) for the OSD map to reflect this OSD as up, per
    /// §4.6. The messenger's own listen socket is bound first so the
    /// monitor never marks us up before we can actually accept connections.
    pub async fn start(&mut self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| OsdsError::Other(format!("bind {}: {e}", self.config.bind_addr)))?;
        info!("osd.{} listening on {}", self.config.osd_id, self.config.bind_addr);

        self.mon.open_session().await?;
        self.mon
            .osd_to_crush_add(self.config.osd_id, BOOT_CRUSH_WEIGHT)
            .await?;
        self.mon
            .osd_boot(self.config.osd_id, &self.config.fsid)
            .await?;

        self.wait_osdmap_reflects(true).await?;

        let store = self.store.clone();
        let opts = self.config.opts;
        let epoch = self.epoch.clone();
        let stopping = self.stopping.clone();
        let osd_id = self.config.osd_id;

        self.accept_task = Some(tokio::spawn(async move {
            accept_loop(listener, store, opts, epoch, stopping, osd_id).await;
        }));

        Ok(())
    }

    /// Send `osd_mark_me_down`, wait up to 5 s for the map to reflect it,
    /// then tear down the listener and drop the store (§4.6).
    pub async fn stop(&mut self) -> Result<()> {
        self.stopping.store(true, Ordering::SeqCst);

        self.mon.osd_mark_me_down(self.config.osd_id).await?;
        self.wait_osdmap_reflects(false).await?;

        if let Some(task) = self.accept_task.take() {
            task.abort();
        }

        let mut store = self.store.lock().await;
        *store = Store::new();

        Ok(())
    }

    async fn wait_osdmap_reflects(&self, _up: bool) -> Result<()> {
        let deadline = tokio::time::Instant::now() + LIFECYCLE_POLL_BUDGET;
        loop {
            match self.mon.wait_for_latest_osdmap(LIFECYCLE_POLL_SLICE).await {
                Ok(()) => return Ok(()),
                Err(_) if tokio::time::Instant::now() < deadline => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    store: Arc<Mutex<Store>>,
    opts: ConnectionOptions,
    epoch: Arc<AtomicU32>,
    stopping: Arc<AtomicBool>,
    osd_id: i64,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                error!("osd.{osd_id} accept failed: {e}");
                continue;
            }
        };

        let config = msgr2::ConnectionConfig::with_no_auth();
        let store = store.clone();
        let epoch = epoch.clone();

        tokio::spawn(async move {
            let mut conn = match msgr2::protocol::Connection::accept(stream, config, None).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("banner exchange with {peer} failed: {e}");
                    return;
                }
            };
            if let Err(e) = conn.accept_session().await {
                warn!("session handshake with {peer} failed: {e}");
                return;
            }
            connection::serve(conn, store, opts, epoch).await;
        });
    }
}
