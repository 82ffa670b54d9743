//! Periodic, jittered health checks for long-running services.
//!
//! Register [`Checker`]s with a [`Monitor`], then start it. Every checker
//! runs on its own [`Worker`] and records its latest outcome in a shared
//! [`CheckState`], which [`Monitor::checks`] collects for reporting.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro, clippy::use_debug)]
#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,
    clippy::unreachable
)]
#![warn(
    clippy::shadow_unrelated,
    clippy::str_to_string,
    clippy::wildcard_enum_match_arm
)]
#![allow(clippy::module_name_repetitions)]

pub use self::{
    check::{Check, CheckState, Status},
    checker::{Binding, Checker},
    http::HttpChecker,
    monitor::{Error, Monitor},
    worker::{Worker, NO_CHECK_NAME},
};

pub mod check;
pub mod checker;
pub mod http;
pub mod monitor;
pub mod worker;
