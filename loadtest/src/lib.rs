//! This is a load testing library which runs simulated users against a
//! "messages" service keyed by actor id.
//!
//! A [`Workload`] describes the behaviour of one simulated user: on every
//! iteration it picks either an *add message* action, which `POST`s a random
//! text to `/messages/{actor_id}`, or a *get messages* action, which `GET`s the
//! same path. Writes are twice as likely as reads by default, so the generated
//! traffic is *write-heavy*. Between two actions, a user pauses for a random
//! think-time.
//!
//! The workload itself is stateless. All randomness is drawn from an injected
//! [`RandomSource`], which makes every action sequence reproducible for a given
//! seed. The [`run`] function spawns the users, drives their loops against an
//! [`HttpRemote`](http::HttpRemote) and collects a [`Report`].
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod http;
pub mod loadtest;
pub mod metrics;
pub mod observability;
pub mod random;
pub mod request;
pub mod workload;

pub use crate::error::{Error, Result};
pub use crate::loadtest::run;
pub use crate::metrics::Report;
pub use crate::random::{RandomSource, SeededRandom};
pub use crate::workload::Workload;
