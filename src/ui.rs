// UI layer: terminal output for the commands. Tables for subscriptions,
// coloured status lines, the masked password prompt and a spinner for the
// long-running smart flow.

use crate::model::{Subscription, TouchSnapshot};
use crate::smart::{Clock, Step};
use crate::touch::{format_elapsed, STATUS_FORMAT};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "")]
    linked: &'static str,
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    net: String,
    #[tabled(rename = "pingLatency")]
    ping_latency: String,
}

/// One subscription as a titled table of its `limit` fastest servers.
/// Servers in `linked` are marked with a dot.
pub fn render_subscription<C: Clock>(
    index: usize,
    sub: &Subscription,
    linked: &HashSet<u64>,
    clock: &C,
    limit: usize,
) -> String {
    let remarks = sub
        .remarks
        .as_deref()
        .map(|r| format!("({r}) "))
        .unwrap_or_default();
    let age = clock
        .parse_status(&sub.status)
        .map(|t| format_elapsed(clock.now() - t))
        .unwrap_or_else(|_| "unknown".into());

    let rows: Vec<ServerRow> = sub
        .ranked_servers()
        .into_iter()
        .take(limit)
        .map(|s| ServerRow {
            ping_latency: s.latency().to_string(),
            linked: if linked.contains(&s.id) { "●" } else { "" },
            id: s.id,
            name: s.name,
            address: s.address,
            net: s.net,
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();

    format!(
        "sub_idx:{index}\n{} {remarks}\n{}({age} ago)\ntotal:{}\n{table}",
        sub.host,
        sub.status,
        sub.servers.len()
    )
}

/// Print every subscription of `snapshot`, `limit` servers each.
pub fn print_touch<C: Clock>(snapshot: &TouchSnapshot, clock: &C, limit: usize) {
    for (index, sub) in snapshot.subscriptions.iter().enumerate() {
        println!("{}", render_subscription(index, sub, &snapshot.linked_ids(index), clock, limit));
        println!();
    }
}

/// One status line per smart-select step.
pub fn describe_step(step: &Step) -> String {
    match step {
        Step::Touched { at } => format!("Touch success ({})", at.format(STATUS_FORMAT)),
        Step::SubscriptionRefreshed => "Subscription updated".into(),
        Step::SubscriptionCached { age } => format!("Subscription cached {}", format_elapsed(*age)),
        Step::LatencyMeasured { count } => format!("Latency update success (count: {count})"),
        Step::Disconnected { count } => format!("Disconnected {count} old server(s)"),
        Step::Connected { servers } => {
            let names: Vec<String> = servers
                .iter()
                .map(|s| format!("{} [{}]", s.name, s.ping_latency))
                .collect();
            format!("Connected fast {} server(s): {}", servers.len(), names.join(", "))
        }
        Step::Running { started: true, at } => format!("Server started ({})", at.format(STATUS_FORMAT)),
        Step::Running { started: false, at } => format!("Server already running ({})", at.format(STATUS_FORMAT)),
    }
}

/// Print a successful status line in green.
pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

/// Pretty-print a raw payload (`version`, `outbounds`, `import`).
pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Masked prompt; the password never appears on the command line.
pub fn prompt_password() -> Result<String> {
    Ok(Password::new().with_prompt("Enter your password").interact()?)
}

/// A ticking spinner on stderr. Print through `ProgressBar::suspend` while
/// it is active.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
