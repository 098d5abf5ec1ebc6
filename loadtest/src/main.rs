//! This is a load testing binary which runs simulated users against a
//! "messages" service keyed by actor id.
//!
//! Each user repeatedly either posts a random text to `/messages/{actor_id}`
//! or fetches the messages of a random actor, pausing for a random think-time
//! in between. After the configured duration, latency percentiles, throughput
//! and failures are printed per workload.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use argh::FromArgs;

use loadtest::config::Config;
use loadtest::http::HttpRemote;
use loadtest::observability;

/// Load tester for the messages service
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// base URL of the messages service, overriding the configuration
    #[argh(option)]
    pub remote: Option<String>,

    /// how long to run, e.g. `30s` or `5m`, overriding the configuration
    #[argh(option, from_str_fn(parse_duration))]
    pub duration: Option<Duration>,

    /// number of simulated users of every workload, overriding the configuration
    #[argh(option)]
    pub users: Option<usize>,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(remote) = args.remote {
        config.remote = remote;
    }
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    if let Some(users) = args.users {
        for workload in &mut config.workloads {
            workload.users = users;
        }
    }

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    let remote = HttpRemote::new(&config.remote, config.request_timeout)
        .context("failed to create HTTP client")?;
    let workloads = config
        .workloads
        .iter()
        .map(|w| w.build())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid workload configuration")?;

    tracing::info!(remote = %config.remote, duration = ?config.duration, "starting load test");
    let report = loadtest::run(remote, workloads, config.duration).await?;
    report.print();

    Ok(())
}
