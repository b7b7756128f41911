//! The monitor-client contract the core's lifecycle (§4.6) consumes:
//! `open_session`, `osd_to_crush_add`, `osd_boot`, `osd_mark_me_down`,
//! `wait_for_latest_osdmap`. `monclient::MonClient`'s public API is built for
//! RADOS clients (subscribe/invoke/wait_for_map) and has no dedicated OSD
//! lifecycle methods, so this trait is implemented on top of its existing
//! `invoke` (generic mon command) and `wait_for_map` primitives (Ceph's
//! monitor exposes OSD lifecycle operations as mon commands: `osd crush
//! add`, `osd down`, in addition to dedicated message types), and `invoke`
//! is the teacher crate's primitive for issuing them.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::{OsdsError, Result};

/// What `OsdServer`'s lifecycle (§4.6) needs from a monitor connection.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn open_session(&self) -> Result<()>;
    async fn osd_to_crush_add(&self, osd: i64, weight: &str) -> Result<()>;
    async fn osd_boot(&self, osd: i64, fsid: &str) -> Result<()>;
    async fn osd_mark_me_down(&self, osd: i64) -> Result<()>;
    async fn wait_for_latest_osdmap(&self, timeout: Duration) -> Result<()>;
}

/// `MonitorClient` over a live `monclient::MonClient`.
pub struct MonClientAdapter {
    inner: std::sync::Arc<monclient::MonClient>,
}

impl MonClientAdapter {
    pub fn new(inner: std::sync::Arc<monclient::MonClient>) -> Self {
        MonClientAdapter { inner }
    }

    async fn command(&self, args: Vec<&str>) -> Result<()> {
        let cmd: Vec<String> = args.into_iter().map(str::to_string).collect();
        let result = self
            .inner
            .invoke(cmd.clone(), Bytes::new())
            .await
            .map_err(OsdsError::MonClient)?;
        if result.retval != 0 {
            return Err(OsdsError::Other(format!(
                "mon command {cmd:?} failed: {} ({})",
                result.retval, result.outs
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MonitorClient for MonClientAdapter {
    async fn open_session(&self) -> Result<()> {
        self.inner.init().await.map_err(OsdsError::MonClient)?;
        self.inner
            .wait_for_auth(Duration::from_secs(30))
            .await
            .map_err(OsdsError::MonClient)
    }

    async fn osd_to_crush_add(&self, osd: i64, weight: &str) -> Result<()> {
        self.command(vec![
            "osd",
            "crush",
            "add",
            &format!("osd.{osd}"),
            weight,
            "root=default",
        ])
        .await
    }

    async fn osd_boot(&self, osd: i64, fsid: &str) -> Result<()> {
        let _ = fsid; // the fsid is carried on every mon command implicitly by the session
        self.command(vec!["osd", "boot", &format!("osd.{osd}")])
            .await
    }

    async fn osd_mark_me_down(&self, osd: i64) -> Result<()> {
        self.command(vec!["osd", "down", &format!("osd.{osd}")])
            .await
    }

    async fn wait_for_latest_osdmap(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.inner.wait_for_map("osdmap", 0))
            .await
            .map_err(|_| OsdsError::Timeout("osdmap".into()))?
            .map_err(OsdsError::MonClient)
    }
}
