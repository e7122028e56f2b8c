#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for hubtrack
//!
//! This library holds all functionality of the hubtrack tool, which crawls
//! independently-hosted package repositories, registers their packages into a
//! catalog, and keeps each repository's verified-publisher flag up to date.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and wiring of concrete collaborators
//! - [`config`]: Run configuration loaded from TOML
//! - [`hub`]: Domain model and the collaborator traits trackers depend on
//! - [`tracker`]: Tracking orchestration (services, trackers, countdown, errors)
//! - [`sources`]: Kind-specific package discovery used by trackers
//! - [`infra`]: Concrete HTTP, git, index, image, and catalog collaborators

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

mod commands;
pub mod config;
pub mod hub;
pub mod infra;
pub mod sources;
pub mod tracker;

pub use crate::commands::{Host, run};
