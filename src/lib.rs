#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! A shared alarm clock: every alarm belongs to two friends and is only over
//! once both of them acknowledged it, or one of them cancelled it.

pub mod agent;
pub mod alarm;
pub mod app;
pub mod audio;
pub mod communication;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod presentation;
pub mod scheduler;
pub mod session;
pub mod store;
/// what a participant sees while an alarm is up
pub mod view;

pub use error::{Error, Result};
