// Connection manager: swaps the servers attached to an outbound and makes
// sure the proxy engine is running. All calls are issued one at a time and
// in order; the daemon answers each with a fresh snapshot. A success without
// one is applied to the snapshot we already hold.

use crate::api::{ApiClient, Transport};
use crate::error::{Error, Result};
use crate::model::{ConnectedServer, Server, SubscriptionRef, TouchSnapshot};
use tracing::{debug, info};

/// How the snapshots returned by successive connect calls are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// Keep only the last response.
    #[default]
    LastResponse,
    /// Last response, with connections reported by earlier responses merged in.
    Cumulative,
}

/// Disconnect every connection on `outbound`. No matches means no calls.
pub fn clear_connection<T: Transport>(
    api: &ApiClient<T>,
    snapshot: TouchSnapshot,
    outbound: &str,
) -> Result<TouchSnapshot> {
    let targets: Vec<_> = snapshot.connections_on(outbound).cloned().collect();
    let mut snapshot = snapshot;
    for conn in targets {
        debug!(id = conn.id, sub = conn.sub, outbound, "disconnecting");
        snapshot = match api.disconnect_server(conn.id, &conn.kind, conn.sub, &conn.outbound)? {
            Some(fresh) => fresh,
            None => {
                snapshot.connected.retain(|c| c != &conn);
                snapshot
            }
        };
    }
    Ok(snapshot)
}

/// Connect `servers` to `outbound`, in order. Every server must belong to
/// `sub` in `snapshot`; this is checked before anything is sent.
pub fn connect<T: Transport>(
    api: &ApiClient<T>,
    snapshot: TouchSnapshot,
    servers: &[Server],
    outbound: &str,
    sub: SubscriptionRef,
    mode: ConnectMode,
) -> Result<TouchSnapshot> {
    let sub = snapshot.resolve(sub)?;
    let known = snapshot.subscription(sub.index)?;
    if let Some(missing) = servers.iter().find(|s| !known.servers.iter().any(|k| k.id == s.id)) {
        return Err(Error::UnknownServer {
            id: missing.id,
            sub: sub.index,
        });
    }

    let mut result = snapshot;
    let mut seen = Vec::new();
    for server in servers {
        info!(id = server.id, name = %server.name, latency = %server.ping_latency, outbound, "connecting");
        result = match api.connect_server(server.id, &server.kind, sub.index, outbound)? {
            Some(fresh) => fresh,
            None => {
                let conn = ConnectedServer {
                    id: server.id,
                    kind: server.kind.clone(),
                    sub: sub.index,
                    outbound: outbound.to_string(),
                };
                if !result.connected.contains(&conn) {
                    result.connected.push(conn);
                }
                result
            }
        };
        if mode == ConnectMode::Cumulative {
            seen.extend(result.connected.iter().cloned());
        }
    }

    if mode == ConnectMode::Cumulative {
        for conn in seen {
            if !result.connected.contains(&conn) {
                result.connected.push(conn);
            }
        }
    }
    Ok(result)
}

/// Start the engine unless the snapshot says it is already running.
pub fn ensure_started<T: Transport>(api: &ApiClient<T>, snapshot: TouchSnapshot) -> Result<TouchSnapshot> {
    if snapshot.running {
        debug!("engine already running");
        return Ok(snapshot);
    }
    info!("starting engine");
    Ok(api.start_engine()?.unwrap_or(TouchSnapshot {
        running: true,
        ..snapshot
    }))
}
