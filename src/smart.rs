// Smart select: refresh a stale subscription, re-measure its latencies,
// then swap the outbound over to the fastest servers.
//
//   touch -> freshness check -> [refresh] -> latency -> rank
//         -> teardown -> connect -> ensure running
//
// Any failing call aborts the run; nothing already sent is rolled back.

use crate::api::{ApiClient, Transport};
use crate::connection::{self, ConnectMode};
use crate::error::Result;
use crate::model::{Server, TouchSnapshot};
use crate::touch;
use chrono::{DateTime, Duration, Local, Utc};
use tracing::info;

/// Source of "now" and of the zone subscription timestamps are written in.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn parse_status(&self, status: &str) -> Result<DateTime<Utc>>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn parse_status(&self, status: &str) -> Result<DateTime<Utc>> {
        touch::parse_status(status, &Local)
    }
}

/// A frozen clock whose timestamps are UTC.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    fn parse_status(&self, status: &str) -> Result<DateTime<Utc>> {
        touch::parse_status(status, &Utc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartOptions {
    pub outbound: String,
    pub sub_index: usize,
    pub sub_update_hours: u32,
    pub fast_servers: usize,
    pub connect_mode: ConnectMode,
}

impl Default for SmartOptions {
    fn default() -> Self {
        SmartOptions {
            outbound: "proxy".into(),
            sub_index: 0,
            sub_update_hours: 1,
            fast_servers: 3,
            connect_mode: ConnectMode::LastResponse,
        }
    }
}

/// Progress notifications, emitted after each step completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Touched { at: DateTime<Utc> },
    SubscriptionRefreshed,
    SubscriptionCached { age: Duration },
    LatencyMeasured { count: usize },
    Disconnected { count: usize },
    Connected { servers: Vec<Server> },
    Running { started: bool, at: DateTime<Utc> },
}

/// Run the whole smart-select flow for one subscription.
///
/// Receives the API client, a clock for the freshness check and the options
/// parsed from the command line. `on_step` is called once each step is done,
/// which is how the CLI prints its progress lines. Returns the snapshot from
/// the last call that produced one.
///
/// The first failing request aborts the run. Connections already torn down
/// or created stay that way.
pub fn run<T, C, F>(api: &ApiClient<T>, clock: &C, opts: &SmartOptions, mut on_step: F) -> Result<TouchSnapshot>
where
    T: Transport,
    C: Clock,
    F: FnMut(Step),
{
    let mut snapshot = touch::touch(api)?;
    on_step(Step::Touched { at: clock.now() });

    let mut sub = snapshot.subscription_ref(opts.sub_index)?;
    let status = &snapshot.subscription(sub.index)?.status;
    let age = clock.now() - clock.parse_status(status)?;
    if touch::is_stale(age, opts.sub_update_hours) {
        snapshot = touch::update_subscription(api, sub.id)?;
        sub = snapshot.resolve(sub)?;
        on_step(Step::SubscriptionRefreshed);
    } else {
        info!(age = %touch::format_elapsed(age), "subscription cached");
        on_step(Step::SubscriptionCached { age });
    }

    snapshot = touch::update_latency(api, snapshot, sub)?;
    let subscription = snapshot.subscription_mut(sub.index)?;
    on_step(Step::LatencyMeasured {
        count: subscription.servers.len(),
    });

    subscription.rank_servers();
    let fastest: Vec<Server> = subscription
        .servers
        .iter()
        .take(opts.fast_servers)
        .cloned()
        .collect();

    let stale = snapshot.connections_on(&opts.outbound).count();
    snapshot = connection::clear_connection(api, snapshot, &opts.outbound)?;
    on_step(Step::Disconnected { count: stale });

    snapshot = connection::connect(api, snapshot, &fastest, &opts.outbound, sub, opts.connect_mode)?;
    on_step(Step::Connected { servers: fastest });

    let started = !snapshot.running;
    snapshot = connection::ensure_started(api, snapshot)?;
    on_step(Step::Running {
        started,
        at: clock.now(),
    });
    Ok(snapshot)
}
