// Library root
// -----------
// This crate exposes the library surface behind the `v2ctl` binary, a
// command-line client for the local v2rayA daemon.
//
// Module responsibilities:
// - `api`: HTTP interactions with the daemon and response envelope decoding.
// - `config`: the persisted token file.
// - `model` / `latency`: typed daemon state and the latency ordering.
// - `touch`, `connection`, `smart`: the workflows built on top of `api`.
// - `cli` / `ui`: argument parsing, dispatch and terminal output.
//
// Workflows take an `ApiClient` and a `ConfigStore` as arguments, so they
// can be driven by a scripted transport in tests.
pub mod api;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod latency;
pub mod model;
pub mod smart;
pub mod touch;
pub mod ui;

pub use error::{Error, Result};
