//! `osds` CLI entry point.
//!
//! The accepted surface (§6) is a flat list of `key=value` options: two keys
//! are special-cased (`mon_addrs=`, `log_level=`); everything else is passed
//! through opaquely to the connection options (notably `NOOP_WRITE`, the
//! WRITE handler's benchmarking shortcut).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "osds")]
#[command(about = "Minimal user-space Ceph OSD core", long_about = None)]
struct Cli {
    /// `key=value` options, e.g. `mon_addrs=v2:127.0.0.1:3300 name=0
    /// log_level=1 NOOP_WRITE`. `mon_addrs` and `name` are required.
    options: Vec<String>,

    /// Address this OSD's messenger listens on.
    #[arg(long, default_value = "0.0.0.0:6800")]
    bind_addr: SocketAddr,
}

struct ParsedOptions {
    mon_addrs: Vec<String>,
    osd_id: i64,
    log_level: tracing::Level,
    noop_write: bool,
}

fn parse_options(raw: &[String]) -> Result<ParsedOptions> {
    let mut kv: HashMap<String, String> = HashMap::new();
    let mut flags: Vec<String> = Vec::new();
    for tok in raw {
        match tok.split_once('=') {
            Some((k, v)) => {
                kv.insert(k.to_string(), v.to_string());
            }
            None => flags.push(tok.clone()),
        }
    }

    let mon_addrs = kv
        .get("mon_addrs")
        .ok_or_else(|| anyhow!("mon_addrs= is required"))?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    if mon_addrs.is_empty() {
        return Err(anyhow!("mon_addrs= must name at least one monitor"));
    }

    let name_raw = kv.get("name").ok_or_else(|| anyhow!("name= is required"))?;
    let osd_id: i64 = name_raw
        .parse()
        .map_err(|_| anyhow!("name= must be a non-negative integer osd id, got {name_raw:?}"))?;
    if osd_id < 0 {
        return Err(anyhow!("name= must be a non-negative integer osd id"));
    }

    let log_level = match kv.get("log_level").map(String::as_str) {
        None => tracing::Level::WARN,
        Some("0") => tracing::Level::ERROR,
        Some("1") => tracing::Level::WARN,
        Some("2") => tracing::Level::INFO,
        Some("3") => tracing::Level::DEBUG,
        Some(_) => tracing::Level::TRACE,
    };

    let noop_write = flags.iter().any(|f| f == "NOOP_WRITE");

    Ok(ParsedOptions {
        mon_addrs,
        osd_id,
        log_level,
        noop_write,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let parsed = match parse_options(&cli.options) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("osds: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(parsed.log_level)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "starting osd.{} against monitors {:?}",
        parsed.osd_id, parsed.mon_addrs
    );

    let mon_config = monclient::MonClientConfig {
        entity_name: format!("osd.{}", parsed.osd_id),
        mon_addrs: parsed.mon_addrs.clone(),
        ..Default::default()
    };
    let mon_client = Arc::new(
        monclient::MonClient::new(mon_config)
            .await
            .context("failed to create monitor client")?,
    );
    let fsid = mon_client.get_fsid().await.to_string();
    let mon = Arc::new(osds::monitor::MonClientAdapter::new(mon_client));

    let server_config = osds::server::OsdServerConfig {
        osd_id: parsed.osd_id,
        fsid,
        bind_addr: cli.bind_addr,
        opts: osds::ConnectionOptions {
            noop_write: parsed.noop_write,
        },
    };
    let mut server = osds::OsdServer::new(server_config, mon);

    server.start().await.context("failed to start osd server")?;
    info!("osd.{} is up", parsed.osd_id);

    wait_for_shutdown_signal().await;
    info!("osd.{} shutting down", parsed.osd_id);

    server.stop().await.context("failed to stop osd server")?;
    Ok(())
}

/// Races SIGINT against SIGTERM: whichever fires first triggers
/// `OsdServer::stop`. Any in-flight dispatch has already completed because
/// the accept loop's connections are not re-entered mid-request.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
