//! Run workloads concurrently against the messages service and collect metrics.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant as Deadline;

use crate::http::HttpRemote;
use crate::metrics::{Report, WorkloadMetrics, WorkloadReport};
use crate::request::Action;
use crate::workload::Workload;

/// Runs the given workloads concurrently against the remote.
///
/// Every workload spawns its simulated users at its spawn rate. Each user performs actions until
/// `duration` has elapsed since the start of the run. Failed requests are recorded in the report
/// and never abort the run.
pub async fn run(
    remote: HttpRemote,
    workloads: Vec<Workload>,
    duration: Duration,
) -> Result<Report> {
    let remote = Arc::new(remote);
    let deadline = Deadline::now() + duration;

    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message("Running load test:");
    bar.enable_steady_tick(Duration::from_millis(100));

    // run the workloads concurrently
    let tasks: Vec<_> = workloads
        .into_iter()
        .map(|workload| {
            let remote = Arc::clone(&remote);
            tokio::spawn(run_workload(remote, workload, deadline))
        })
        .collect();

    let finished_tasks = futures::future::join_all(tasks).await;
    bar.finish_and_clear();

    let mut total = WorkloadMetrics::default();
    let mut reports = Vec::with_capacity(finished_tasks.len());
    for task in finished_tasks {
        let report = task??;
        total.merge(&report.metrics)?;
        reports.push(report);
    }

    Ok(Report {
        duration,
        workloads: reports,
        total,
    })
}

async fn run_workload(
    remote: Arc<HttpRemote>,
    workload: Workload,
    deadline: Deadline,
) -> Result<WorkloadReport> {
    tracing::info!(
        workload = workload.name(),
        users = workload.users,
        spawn_rate = workload.spawn_rate,
        "starting workload"
    );

    let workload = Arc::new(workload);
    let metrics = Arc::new(Mutex::new(WorkloadMetrics::default()));
    let spawn_interval = workload.spawn_interval();

    let mut users = Vec::with_capacity(workload.users);
    for user in 0..workload.users {
        if user > 0 {
            // See <https://docs.rs/tokio/latest/tokio/time/struct.Sleep.html#examples>
            let pause = tokio::time::sleep(spawn_interval);
            tokio::pin!(pause);
            tokio::select! {
                _ = &mut pause => {}
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }

        let workload = Arc::clone(&workload);
        let remote = Arc::clone(&remote);
        let metrics = Arc::clone(&metrics);
        users.push(tokio::spawn(run_user(remote, workload, user, metrics, deadline)));
    }

    let spawned_users = users.len();
    tracing::debug!(
        workload = workload.name(),
        users = spawned_users,
        "spawning finished"
    );
    for user in futures::future::join_all(users).await {
        user?;
    }

    let metrics = {
        let mut metrics = metrics.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *metrics)
    };

    Ok(WorkloadReport {
        name: workload.name.clone(),
        users: workload.users,
        spawned_users,
        metrics,
    })
}

/// The action loop of a single simulated user.
async fn run_user(
    remote: Arc<HttpRemote>,
    workload: Arc<Workload>,
    user: usize,
    metrics: Arc<Mutex<WorkloadMetrics>>,
    deadline: Deadline,
) {
    let mut rng = workload.user_random(user);

    while Deadline::now() < deadline {
        let action = workload.next_action(&mut rng);
        let kind = action.kind();
        let text_len = match &action {
            Action::AddMessage { text, .. } => text.len() as u64,
            Action::GetMessages { .. } => 0,
        };
        let request = action.request(&workload.body);

        let start = Instant::now();
        let result = remote.send(&request).await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                metrics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_success(kind, elapsed, text_len, response.bytes_read);
            }
            Err(err) => {
                tracing::debug!(
                    user,
                    method = %request.method,
                    path = %request.path,
                    error = &err as &dyn std::error::Error,
                    "request failed"
                );
                metrics
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_failure(kind, err.reason());
            }
        }

        let think_time = workload.think_time(&mut rng);
        tokio::select! {
            _ = tokio::time::sleep(think_time) => {}
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }
}
