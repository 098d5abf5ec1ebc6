//! Collects per-action latencies and failures, and prints them as a report.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytesize::ByteSize;
use sketches_ddsketch::{DDSketch, DDSketchError};
use yansi::Paint;

use crate::request::ActionKind;

/// Latency and failure statistics of a single action kind.
#[derive(Default)]
pub struct ActionMetrics {
    timing: DDSketch,
    failures: u64,
}

impl ActionMetrics {
    /// The number of successful requests.
    pub fn successes(&self) -> usize {
        self.timing.count()
    }

    /// The number of failed requests.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// The latency sketch of successful requests, in seconds.
    pub fn timing(&self) -> &DDSketch {
        &self.timing
    }

    fn merge(&mut self, other: &Self) -> Result<(), DDSketchError> {
        self.timing.merge(&other.timing)?;
        self.failures += other.failures;
        Ok(())
    }
}

impl fmt::Debug for ActionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMetrics")
            .field("successes", &self.successes())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Statistics collected while running a workload.
#[derive(Default)]
pub struct WorkloadMetrics {
    add_message: ActionMetrics,
    get_messages: ActionMetrics,

    text_lengths: DDSketch,
    bytes_written: u64,
    bytes_read: u64,

    failure_reasons: BTreeMap<(ActionKind, String), u64>,
}

impl fmt::Debug for WorkloadMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadMetrics")
            .field("add_message", &self.add_message)
            .field("get_messages", &self.get_messages)
            .field("texts", &self.text_lengths.count())
            .field("bytes_written", &self.bytes_written)
            .field("bytes_read", &self.bytes_read)
            .field("failure_reasons", &self.failure_reasons)
            .finish()
    }
}

impl WorkloadMetrics {
    /// Statistics of the given action kind.
    pub fn action(&self, kind: ActionKind) -> &ActionMetrics {
        match kind {
            ActionKind::AddMessage => &self.add_message,
            ActionKind::GetMessages => &self.get_messages,
        }
    }

    fn action_mut(&mut self, kind: ActionKind) -> &mut ActionMetrics {
        match kind {
            ActionKind::AddMessage => &mut self.add_message,
            ActionKind::GetMessages => &mut self.get_messages,
        }
    }

    /// Total bytes of message text sent to the service.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Total bytes of response bodies read from the service.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// The total number of requests, successful or not.
    pub fn requests(&self) -> u64 {
        [&self.add_message, &self.get_messages]
            .into_iter()
            .map(|a| a.successes() as u64 + a.failures())
            .sum()
    }

    /// Failure counts grouped by action kind and reason.
    pub fn failure_reasons(&self) -> impl Iterator<Item = (ActionKind, &str, u64)> {
        self.failure_reasons
            .iter()
            .map(|((kind, reason), count)| (*kind, reason.as_str(), *count))
    }

    /// Records a successful request.
    ///
    /// `text_len` is the length of the message text for writes, and zero for reads.
    pub fn record_success(
        &mut self,
        kind: ActionKind,
        elapsed: Duration,
        text_len: u64,
        bytes_read: u64,
    ) {
        self.action_mut(kind).timing.add(elapsed.as_secs_f64());
        if kind == ActionKind::AddMessage {
            self.text_lengths.add(text_len as f64);
            self.bytes_written += text_len;
        }
        self.bytes_read += bytes_read;
    }

    /// Records a failed request.
    pub fn record_failure(&mut self, kind: ActionKind, reason: String) {
        self.action_mut(kind).failures += 1;
        *self.failure_reasons.entry((kind, reason)).or_default() += 1;
    }

    /// Adds all statistics of `other` to this instance.
    pub fn merge(&mut self, other: &Self) -> Result<(), DDSketchError> {
        self.add_message.merge(&other.add_message)?;
        self.get_messages.merge(&other.get_messages)?;
        self.text_lengths.merge(&other.text_lengths)?;
        self.bytes_written += other.bytes_written;
        self.bytes_read += other.bytes_read;
        for (key, count) in &other.failure_reasons {
            *self.failure_reasons.entry(key.clone()).or_default() += count;
        }
        Ok(())
    }
}

/// Metrics of a single workload within a [`Report`].
#[derive(Debug)]
pub struct WorkloadReport {
    /// The name of the workload.
    pub name: String,
    /// The number of users the workload was configured with.
    pub users: usize,
    /// The number of users started before the deadline.
    ///
    /// Lower than `users` when the run ends before all users were spawned.
    pub spawned_users: usize,
    /// The collected statistics.
    pub metrics: WorkloadMetrics,
}

/// The result of a load test run.
#[derive(Debug)]
pub struct Report {
    /// How long the users were running.
    pub duration: Duration,
    /// Metrics of each workload, in the order they were passed in.
    pub workloads: Vec<WorkloadReport>,
    /// All workload metrics merged together.
    pub total: WorkloadMetrics,
}

impl Report {
    /// Prints the report to stdout.
    pub fn print(&self) {
        for workload in &self.workloads {
            println!();
            println!(
                "{} {} (users: {} of {})",
                "## Workload".bold(),
                workload.name.bold().blue(),
                workload.spawned_users.bold(),
                workload.users
            );
            print_metrics(&workload.metrics, self.duration);
        }

        println!();
        println!("{}", "## TOTALS".bold());
        print_metrics(&self.total, self.duration);
        print_failures(&self.total);
        println!();
    }
}

fn print_metrics(metrics: &WorkloadMetrics, duration: Duration) {
    let add = &metrics.add_message;
    if add.successes() > 0 {
        print_header("ADD MESSAGE:", add);
        let sketch = &metrics.text_lengths;
        println!(
            "  text length avg: {:.1}; p50: {:.0}; p99: {:.0}",
            average(sketch).bold(),
            quantile(sketch, 0.5),
            quantile(sketch, 0.99),
        );
        print_ops(&add.timing, duration);
        print_throughput(metrics.bytes_written, duration);
        print_percentiles(&add.timing, Duration::from_secs_f64);
    } else if add.failures > 0 {
        print_only_failures("ADD MESSAGE", add.failures);
    }

    let get = &metrics.get_messages;
    if get.successes() > 0 {
        print_header("GET MESSAGES:", get);
        print_ops(&get.timing, duration);
        print_throughput(metrics.bytes_read, duration);
        print_percentiles(&get.timing, Duration::from_secs_f64);
    } else if get.failures > 0 {
        print_only_failures("GET MESSAGES", get.failures);
    }
}

fn print_header(label: &str, action: &ActionMetrics) {
    print!("{} ({} ops", label.bold().green(), action.successes().bold());
    if action.failures > 0 {
        print!(
            ", {}",
            format!("{} FAILURES", action.failures).bold().red()
        )
    }
    println!(")");
}

fn print_only_failures(label: &str, failures: u64) {
    println!("{}", format!("{failures} {label} FAILURES").bold().red());
}

fn print_failures(metrics: &WorkloadMetrics) {
    if metrics.failure_reasons.is_empty() {
        return;
    }

    println!("{}", "FAILURES:".bold().red());
    for (kind, reason, count) in metrics.failure_reasons() {
        println!("  {kind}: {reason} ({})", count.bold());
    }
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let avg = map(average(sketch));
    let p50 = map(quantile(sketch, 0.5));
    let p90 = map(quantile(sketch, 0.9));
    let p99 = map(quantile(sketch, 0.99));
    println!(
        "  avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        avg.bold()
    );
}

fn print_ops(sketch: &DDSketch, duration: Duration) {
    let ops = sketch.count();
    let ops_ps = ops as f64 / duration.as_secs_f64();
    print!("  {:.2} operations/s", ops_ps.bold());
}

fn print_throughput(total: u64, duration: Duration) {
    let throughput = (total as f64 / duration.as_secs_f64()) as u64;
    println!(", {:.2}/s", ByteSize::b(throughput).bold());
}

fn average(sketch: &DDSketch) -> f64 {
    match sketch.count() {
        0 => 0.0,
        count => sketch.sum().unwrap_or_default() / count as f64,
    }
}

fn quantile(sketch: &DDSketch, q: f64) -> f64 {
    sketch.quantile(q).ok().flatten().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_successes_and_failures() {
        let mut metrics = WorkloadMetrics::default();
        metrics.record_success(ActionKind::AddMessage, Duration::from_millis(5), 12, 0);
        metrics.record_success(ActionKind::AddMessage, Duration::from_millis(7), 30, 0);
        metrics.record_success(ActionKind::GetMessages, Duration::from_millis(3), 0, 100);
        metrics.record_failure(ActionKind::GetMessages, "HTTP 500 Internal Server Error".into());
        metrics.record_failure(ActionKind::GetMessages, "HTTP 500 Internal Server Error".into());

        assert_eq!(metrics.action(ActionKind::AddMessage).successes(), 2);
        assert_eq!(metrics.action(ActionKind::AddMessage).failures(), 0);
        assert_eq!(metrics.action(ActionKind::GetMessages).successes(), 1);
        assert_eq!(metrics.action(ActionKind::GetMessages).failures(), 2);
        assert_eq!(metrics.bytes_written(), 42);
        assert_eq!(metrics.bytes_read(), 100);
        assert_eq!(metrics.requests(), 5);

        let reasons: Vec<_> = metrics.failure_reasons().collect();
        assert_eq!(
            reasons,
            [(
                ActionKind::GetMessages,
                "HTTP 500 Internal Server Error",
                2
            )]
        );
    }

    #[test]
    fn merges_metrics() {
        let mut a = WorkloadMetrics::default();
        a.record_success(ActionKind::AddMessage, Duration::from_millis(5), 10, 0);
        a.record_failure(ActionKind::AddMessage, "timeout".into());

        let mut b = WorkloadMetrics::default();
        b.record_success(ActionKind::AddMessage, Duration::from_millis(9), 20, 0);
        b.record_failure(ActionKind::AddMessage, "timeout".into());
        b.record_failure(ActionKind::GetMessages, "connection error".into());

        let mut total = WorkloadMetrics::default();
        total.merge(&a).unwrap();
        total.merge(&b).unwrap();

        assert_eq!(total.action(ActionKind::AddMessage).successes(), 2);
        assert_eq!(total.action(ActionKind::AddMessage).failures(), 2);
        assert_eq!(total.action(ActionKind::GetMessages).failures(), 1);
        assert_eq!(total.bytes_written(), 30);
        assert_eq!(total.failure_reasons().count(), 2);
    }

    #[test]
    fn debug_summarizes_sketches() {
        let mut metrics = WorkloadMetrics::default();
        metrics.record_success(ActionKind::AddMessage, Duration::from_millis(5), 12, 0);
        metrics.record_failure(ActionKind::GetMessages, "timeout".into());

        let debug = format!("{metrics:?}");
        assert!(debug.contains("add_message: ActionMetrics { successes: 1, failures: 0 }"));
        assert!(debug.contains("get_messages: ActionMetrics { successes: 0, failures: 1 }"));
        assert!(debug.contains("texts: 1"));
        assert!(debug.contains("bytes_written: 12"));

        let report = Report {
            duration: Duration::from_secs(1),
            workloads: vec![],
            total: metrics,
        };
        assert!(format!("{report:?}").contains("WorkloadMetrics"));
    }

    #[test]
    fn empty_sketch_statistics() {
        let sketch = DDSketch::default();
        assert_eq!(average(&sketch), 0.0);
        assert_eq!(quantile(&sketch, 0.5), 0.0);
    }
}
