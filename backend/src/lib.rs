// Project-management assistant backend: task store, project log, planning,
// risk check-ins, alerts, digests and triage scheduling behind an HTTP API

pub mod api;
pub mod client;
pub mod clock;
pub mod config;
pub mod digest;
pub mod notify;
pub mod persistence;
pub mod planner;
pub mod project_log;
pub mod schedule;
pub mod store;
pub mod views;

// Test doubles shared by unit and integration tests
pub mod test_utils;
