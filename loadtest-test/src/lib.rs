//! Test utilities for the load tester.
//!
//! This crate provides an in-process messages service and logging setup for integration tests.
//! See the modules for all available utilities.

pub mod server;
pub mod tracing;
