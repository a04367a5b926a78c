// Library target for integration tests and criterion benchmarks.
// The binary entry point is main.rs; this file re-declares the module tree so
// that tests can drive `certdeck::session::*` against `certdeck::store::*`.
// Some code is only exercised through the binary, so suppress dead_code warnings.
#![allow(dead_code)]

// Public: used directly by tests and benchmarks
pub mod auth;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod session;
pub mod store;

// Private: the terminal front end
mod app;
mod event;
mod logging;
mod ui;
