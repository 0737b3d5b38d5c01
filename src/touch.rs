// Touch/subscription view: fetching the daemon snapshot, refreshing a
// subscription and re-measuring its latencies.

use crate::api::{ApiClient, Transport, Which};
use crate::error::{Error, Result};
use crate::model::{Subscription, SubscriptionRef, TouchSnapshot};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

pub const STATUS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fetch the current daemon snapshot.
pub fn touch<T: Transport>(api: &ApiClient<T>) -> Result<TouchSnapshot> {
    let snapshot = api.touch()?;
    debug!(
        running = snapshot.running,
        subscriptions = snapshot.subscriptions.len(),
        connected = snapshot.connected.len(),
        "touch"
    );
    Ok(snapshot)
}

/// Ask the daemon to re-fetch a subscription's server list. If the daemon
/// does not send the new state back, it is fetched with a touch.
pub fn update_subscription<T: Transport>(api: &ApiClient<T>, subscription_id: u64) -> Result<TouchSnapshot> {
    info!(subscription = subscription_id, "refreshing subscription");
    match api.update_subscription(subscription_id)? {
        Some(snapshot) => Ok(snapshot),
        None => touch(api),
    }
}

/// Measure every server of `sub` in one batch and merge the results into
/// `snapshot`. Servers missing from the answer keep their old value.
pub fn update_latency<T: Transport>(
    api: &ApiClient<T>,
    mut snapshot: TouchSnapshot,
    sub: SubscriptionRef,
) -> Result<TouchSnapshot> {
    let sub = snapshot.resolve(sub)?;
    let subscription = snapshot.subscription_mut(sub.index)?;
    if subscription.servers.is_empty() {
        debug!(sub = sub.index, "no servers to measure");
        return Ok(snapshot);
    }

    let whiches: Vec<Which> = subscription
        .servers
        .iter()
        .map(|s| Which {
            id: s.id,
            kind: s.kind.clone(),
            sub: sub.index,
            ping_latency: None,
        })
        .collect();
    let reported = api.http_latency(&whiches)?;
    let updated = merge_latencies(subscription, &reported);
    let measured = subscription.servers.iter().filter(|s| s.latency().is_measured()).count();
    info!(sub = sub.index, updated, measured, total = whiches.len(), "latency updated");
    Ok(snapshot)
}

/// Apply reported latencies by server id; returns how many servers changed.
pub fn merge_latencies(subscription: &mut Subscription, reported: &[Which]) -> usize {
    let by_id: HashMap<u64, &str> = reported
        .iter()
        .filter_map(|w| w.ping_latency.as_deref().map(|l| (w.id, l)))
        .collect();
    let mut updated = 0;
    for server in &mut subscription.servers {
        if let Some(latency) = by_id.get(&server.id) {
            server.ping_latency = latency.to_string();
            updated += 1;
        }
    }
    updated
}

/// Parse a subscription `status` as wall-clock time in `tz`.
pub fn parse_status<Tz: TimeZone>(status: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(status, STATUS_FORMAT)
        .map_err(|_| Error::StatusTimestamp(status.to_string()))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| Error::StatusTimestamp(status.to_string()))
}

pub fn is_stale(elapsed: Duration, max_age_hours: u32) -> bool {
    elapsed > Duration::hours(i64::from(max_age_hours))
}

/// `HH:MM:SS`, hours unbounded. Negative spans (clock skew) render as zero.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}
