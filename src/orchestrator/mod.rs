//! Application-level orchestration.
//!
//! This module owns the pipeline state machine at runtime: it applies UI
//! commands, steps stage transitions on their dwell deadlines, drives the
//! resource monitor, and streams `DashboardEvent`s to presentation layers.
//! UI/CLI layers call into this module to keep responsibilities separated.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
