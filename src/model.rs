// Typed view of the daemon state. Responses are decoded into these types at
// the API boundary so nothing downstream touches raw JSON.

use crate::error::{Error, Result};
use crate::latency::{self, Latency};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// A candidate proxy server inside a subscription.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: u64,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub net: String,
    #[serde(default)]
    pub ping_latency: String,
}

impl Server {
    pub fn latency(&self) -> Latency {
        Latency::parse(&self.ping_latency)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: u64,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Last refresh time, `%Y-%m-%d %H:%M:%S` in daemon-local time.
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: Vec<Server>,
}

impl Subscription {
    /// Stable sort by latency, fastest first.
    pub fn rank_servers(&mut self) {
        self.servers
            .sort_by(|a, b| latency::compare(&a.ping_latency, &b.ping_latency));
    }

    /// Ranked copy, leaving `servers` in daemon order.
    pub fn ranked_servers(&self) -> Vec<Server> {
        let mut servers = self.servers.clone();
        servers.sort_by(|a, b| latency::compare(&a.ping_latency, &b.ping_latency));
        servers
    }
}

/// One active connection. Serialized as-is for disconnect requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectedServer {
    pub id: u64,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub sub: usize,
    #[serde(default)]
    pub outbound: String,
}

/// Positional index of a subscription paired with its id, so a reordering
/// between calls is detected instead of silently hitting the wrong entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionRef {
    pub index: usize,
    pub id: u64,
}

/// Full daemon state as returned by touch and by every mutating call.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "TouchWire")]
pub struct TouchSnapshot {
    pub running: bool,
    pub connected: Vec<ConnectedServer>,
    pub subscriptions: Vec<Subscription>,
}

impl TouchSnapshot {
    pub fn subscription(&self, index: usize) -> Result<&Subscription> {
        let count = self.subscriptions.len();
        self.subscriptions
            .get(index)
            .ok_or(Error::SubscriptionIndex { index, count })
    }

    pub fn subscription_mut(&mut self, index: usize) -> Result<&mut Subscription> {
        let count = self.subscriptions.len();
        self.subscriptions
            .get_mut(index)
            .ok_or(Error::SubscriptionIndex { index, count })
    }

    pub fn subscription_ref(&self, index: usize) -> Result<SubscriptionRef> {
        let sub = self.subscription(index)?;
        Ok(SubscriptionRef { index, id: sub.id })
    }

    /// Find `sub` again in this snapshot, by id if its position changed.
    pub fn resolve(&self, sub: SubscriptionRef) -> Result<SubscriptionRef> {
        if self.subscriptions.get(sub.index).map(|s| s.id) == Some(sub.id) {
            return Ok(sub);
        }
        let index = self
            .subscriptions
            .iter()
            .position(|s| s.id == sub.id)
            .ok_or(Error::SubscriptionGone { id: sub.id })?;
        warn!(id = sub.id, from = sub.index, to = index, "subscription moved");
        Ok(SubscriptionRef { index, id: sub.id })
    }

    /// Ids of servers from subscription `index` that are currently connected.
    pub fn linked_ids(&self, index: usize) -> HashSet<u64> {
        self.connected
            .iter()
            .filter(|c| c.sub == index)
            .map(|c| c.id)
            .collect()
    }

    pub fn connections_on<'a>(
        &'a self,
        outbound: &'a str,
    ) -> impl Iterator<Item = &'a ConnectedServer> + 'a {
        self.connected.iter().filter(move |c| c.outbound == outbound)
    }
}

#[derive(Deserialize)]
struct TouchWire {
    #[serde(default)]
    running: bool,
    #[serde(default)]
    touch: TouchBody,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TouchBody {
    #[serde(default, deserialize_with = "null_as_default")]
    connected_server: Vec<ConnectedServer>,
    #[serde(default, deserialize_with = "null_as_default")]
    subscriptions: Vec<Subscription>,
}

impl From<TouchWire> for TouchSnapshot {
    fn from(wire: TouchWire) -> Self {
        TouchSnapshot {
            running: wire.running,
            connected: wire.touch.connected_server,
            subscriptions: wire.touch.subscriptions,
        }
    }
}

/// The daemon sends `null` for empty lists.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TouchSnapshot {
        serde_json::from_value(json!({
            "running": true,
            "touch": {
                "connectedServer": [
                    {"id": 2, "_type": "subscriptionServer", "sub": 0, "outbound": "proxy"}
                ],
                "subscriptions": [
                    {"id": 7, "_type": "subscription", "host": "a.example", "status": "2024-01-01 00:00:00",
                     "servers": [
                        {"id": 1, "_type": "subscriptionServer", "name": "one", "address": "1.1.1.1:443", "net": "ws", "pingLatency": "120ms"},
                        {"id": 2, "_type": "subscriptionServer", "name": "two", "address": "2.2.2.2:443", "net": "tcp"}
                     ]},
                    {"id": 9, "_type": "subscription", "host": "b.example", "remarks": "backup", "status": "", "servers": null}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_touch_payload() {
        let snap = sample();
        assert!(snap.running);
        assert_eq!(snap.connected.len(), 1);
        assert_eq!(snap.subscriptions[0].servers[1].ping_latency, "");
        assert_eq!(snap.subscriptions[1].remarks.as_deref(), Some("backup"));
        assert!(snap.subscriptions[1].servers.is_empty());
    }

    #[test]
    fn null_connections_decode_as_empty() {
        let snap: TouchSnapshot =
            serde_json::from_value(json!({"running": false, "touch": {"connectedServer": null, "subscriptions": []}}))
                .unwrap();
        assert!(snap.connected.is_empty());
        assert!(!snap.running);
    }

    #[test]
    fn resolve_follows_moved_subscription() {
        let mut snap = sample();
        let sub = snap.subscription_ref(1).unwrap();
        snap.subscriptions.swap(0, 1);
        assert_eq!(snap.resolve(sub).unwrap(), SubscriptionRef { index: 0, id: 9 });

        snap.subscriptions.remove(0);
        assert!(matches!(snap.resolve(sub), Err(Error::SubscriptionGone { id: 9 })));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let snap = sample();
        assert!(matches!(
            snap.subscription(5),
            Err(Error::SubscriptionIndex { index: 5, count: 2 })
        ));
    }

    #[test]
    fn linked_ids_are_scoped_to_the_subscription() {
        let snap = sample();
        assert!(snap.linked_ids(0).contains(&2));
        assert!(snap.linked_ids(1).is_empty());
    }
}
