//! A module for defining a [`Workload`] that simulates users of the messages service.

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::random::{RandomSource, SeededRandom};
use crate::request::{Action, BodyFormat};

/// The characters a random message text is made of.
pub const TEXT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Errors returned when building an invalid [`Workload`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum WorkloadError {
    /// The workload must simulate at least one user.
    #[error("workload `{0}` needs at least one user")]
    NoUsers(String),
    /// Users must be spawned at a positive, finite rate.
    #[error("workload `{0}` needs a positive, finite spawn rate")]
    InvalidSpawnRate(String),
    /// Actor ids start at 1 and the range must not be empty.
    #[error("workload `{0}` has an invalid actor id range {1:?}")]
    InvalidActorIds(String, RangeInclusive<u32>),
    /// The text length range must not be empty.
    #[error("workload `{0}` has an invalid text length range {1:?}")]
    InvalidTextLength(String, RangeInclusive<u32>),
    /// At least one action needs a non-zero weight.
    #[error("workload `{0}` has no action with a non-zero weight")]
    NoActions(String),
    /// The think-time range must not be empty.
    #[error("workload `{0}` has an invalid think-time range {1:?}..={2:?}")]
    InvalidThinkTime(String, Duration, Duration),
}

/// A builder for creating a [`Workload`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    name: String,
    users: usize,
    spawn_rate: f64,
    seed: u64,

    actor_ids: RangeInclusive<u32>,
    text_length: RangeInclusive<u32>,

    add_message_weight: u32,
    get_messages_weight: u32,

    think_time: (Duration, Duration),
    body: BodyFormat,
}

impl WorkloadBuilder {
    /// The number of simulated users running this workload concurrently.
    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// How many users are started per second until all of them run.
    pub fn spawn_rate(mut self, users_per_second: f64) -> Self {
        self.spawn_rate = users_per_second;
        self
    }

    /// Seeds the random sources of all users, making the run reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The range from which actor ids are drawn.
    pub fn actor_ids(mut self, min: u32, max: u32) -> Self {
        self.actor_ids = min..=max;
        self
    }

    /// The range from which the length of a message text is drawn.
    pub fn text_length(mut self, min: u32, max: u32) -> Self {
        self.text_length = min..=max;
        self
    }

    /// The ratio between `AddMessage` and `GetMessages` actions.
    pub fn action_weights(mut self, add_message: u32, get_messages: u32) -> Self {
        self.add_message_weight = add_message;
        self.get_messages_weight = get_messages;
        self
    }

    /// The interval from which the pause between two actions is drawn.
    pub fn think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_time = (min, max);
        self
    }

    /// The encoding of the `AddMessage` request body.
    pub fn body(mut self, body: BodyFormat) -> Self {
        self.body = body;
        self
    }

    /// Validates the settings and creates the workload instance.
    pub fn build(self) -> Result<Workload, WorkloadError> {
        let name = self.name;

        if self.users == 0 {
            return Err(WorkloadError::NoUsers(name));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(WorkloadError::InvalidSpawnRate(name));
        }
        if self.actor_ids.is_empty() || *self.actor_ids.start() == 0 {
            return Err(WorkloadError::InvalidActorIds(name, self.actor_ids));
        }
        if self.text_length.is_empty() {
            return Err(WorkloadError::InvalidTextLength(name, self.text_length));
        }
        if self.add_message_weight == 0 && self.get_messages_weight == 0 {
            return Err(WorkloadError::NoActions(name));
        }
        let (min_think, max_think) = self.think_time;
        if min_think > max_think {
            return Err(WorkloadError::InvalidThinkTime(name, min_think, max_think));
        }

        Ok(Workload {
            name,
            users: self.users,
            spawn_rate: self.spawn_rate,
            seed: self.seed,
            actor_ids: self.actor_ids,
            text_length: self.text_length,
            action_weights: [self.add_message_weight, self.get_messages_weight],
            think_time: self.think_time,
            body: self.body,
        })
    }
}

/// Behaviour of a simulated user of the messages service.
///
/// A workload is immutable once built. All users of a workload share it and
/// only differ in the [`RandomSource`] they pass in.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Name of the workload for identification in logs and reports.
    pub(crate) name: String,
    /// The number of concurrently running users.
    pub(crate) users: usize,
    /// Users started per second.
    pub(crate) spawn_rate: f64,
    /// Base seed from which every user's seed is derived.
    seed: u64,

    actor_ids: RangeInclusive<u32>,
    text_length: RangeInclusive<u32>,
    /// Weights of `AddMessage` and `GetMessages`, in this order.
    action_weights: [u32; 2],
    think_time: (Duration, Duration),
    pub(crate) body: BodyFormat,
}

impl Workload {
    /// Constructs a new workload builder with the given name.
    ///
    /// The defaults model a write-heavy user: actor ids `1..=100`, texts of
    /// `10..=50` characters, twice as many writes as reads and a think-time
    /// between 0.5s and 2s.
    pub fn builder(name: impl Into<String>) -> WorkloadBuilder {
        WorkloadBuilder {
            name: name.into(),
            users: 1,
            spawn_rate: 1.0,
            seed: rand::random(),

            actor_ids: 1..=100,
            text_length: 10..=50,

            add_message_weight: 2,
            get_messages_weight: 1,

            think_time: (Duration::from_millis(500), Duration::from_secs(2)),
            body: BodyFormat::default(),
        }
    }

    /// The name of this workload.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of simulated users.
    pub fn users(&self) -> usize {
        self.users
    }

    /// The pause between starting two consecutive users.
    ///
    /// Saturates at [`Duration::MAX`] for rates too small to represent.
    pub fn spawn_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).unwrap_or(Duration::MAX)
    }

    /// Creates the random source for the user with the given index.
    pub fn user_random(&self, user: usize) -> SeededRandom {
        SeededRandom::from_seed(self.seed.wrapping_add(user as u64))
    }

    /// Picks the next action of a user.
    pub fn next_action(&self, rng: &mut impl RandomSource) -> Action {
        match rng.weighted_index(&self.action_weights) {
            0 => {
                let actor_id = self.actor_id(rng);
                let text = self.random_text(rng);
                Action::AddMessage { actor_id, text }
            }
            _ => Action::GetMessages {
                actor_id: self.actor_id(rng),
            },
        }
    }

    /// Draws an actor id.
    pub fn actor_id(&self, rng: &mut impl RandomSource) -> u32 {
        rng.int_inclusive(*self.actor_ids.start(), *self.actor_ids.end())
    }

    /// Generates a fresh message text of random length.
    pub fn random_text(&self, rng: &mut impl RandomSource) -> String {
        let len = rng.int_inclusive(*self.text_length.start(), *self.text_length.end());
        let last = TEXT_ALPHABET.len() as u32 - 1;

        (0..len)
            .map(|_| TEXT_ALPHABET[rng.int_inclusive(0, last) as usize] as char)
            .collect()
    }

    /// Draws the pause before the next action.
    pub fn think_time(&self, rng: &mut impl RandomSource) -> Duration {
        let (min, max) = self.think_time;
        if min == max {
            return min;
        }

        Duration::from_secs_f64(rng.float_inclusive(min.as_secs_f64(), max.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use crate::random::ScriptedRandom;

    use super::*;

    fn default_workload() -> Workload {
        Workload::builder("test").seed(1234).build().unwrap()
    }

    fn alphabet_index(c: char) -> u32 {
        TEXT_ALPHABET.iter().position(|&b| b as char == c).unwrap() as u32
    }

    #[test]
    fn scripted_add_message() {
        let workload = default_workload();
        let text = "AB12CD34EF";

        let mut rng = ScriptedRandom::default()
            .indices([0])
            .ints([42, text.len() as u32])
            .ints(text.chars().map(alphabet_index));

        let action = workload.next_action(&mut rng);
        assert_eq!(
            action,
            Action::AddMessage {
                actor_id: 42,
                text: text.into()
            }
        );
    }

    #[test]
    fn scripted_get_messages() {
        let workload = default_workload();
        let mut rng = ScriptedRandom::default().indices([1]).ints([7]);

        let action = workload.next_action(&mut rng);
        assert_eq!(action, Action::GetMessages { actor_id: 7 });
    }

    #[test]
    fn text_length_bounds_are_reachable() {
        let workload = default_workload();

        let mut rng = ScriptedRandom::default().ints([10]).ints([0; 10]);
        assert_eq!(workload.random_text(&mut rng), "A".repeat(10));

        let mut rng = ScriptedRandom::default().ints([50]).ints([35; 50]);
        assert_eq!(workload.random_text(&mut rng), "9".repeat(50));
    }

    #[test]
    fn generated_values_stay_in_range() {
        let workload = default_workload();
        let mut rng = workload.user_random(0);

        for _ in 0..5_000 {
            let actor_id = workload.actor_id(&mut rng);
            assert!((1..=100).contains(&actor_id));

            let text = workload.random_text(&mut rng);
            assert!((10..=50).contains(&text.len()));
            assert!(
                text.bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }

    #[test]
    fn actions_are_write_heavy() {
        let workload = default_workload();
        let mut rng = workload.user_random(0);

        let iterations = 30_000;
        let adds = (0..iterations)
            .filter(|_| matches!(workload.next_action(&mut rng), Action::AddMessage { .. }))
            .count();
        let gets = iterations - adds;

        let ratio = adds as f64 / gets as f64;
        assert!((1.85..2.15).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn think_time_is_uniform() {
        let workload = default_workload();
        let mut rng = workload.user_random(3);

        let samples: Vec<_> = (0..10_000)
            .map(|_| workload.think_time(&mut rng).as_secs_f64())
            .collect();
        assert!(samples.iter().all(|s| (0.5..=2.0).contains(s)));

        // a uniform distribution over [0.5, 2.0] has its mean at 1.25
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((1.2..1.3).contains(&mean), "mean was {mean}");

        let lower_half = samples.iter().filter(|&&s| s < 1.25).count();
        assert!((4_700..5_300).contains(&lower_half));
    }

    #[test]
    fn scripted_think_time() {
        let workload = default_workload();
        let mut rng = ScriptedRandom::default().floats([0.5, 2.0]);

        assert_eq!(workload.think_time(&mut rng), Duration::from_millis(500));
        assert_eq!(workload.think_time(&mut rng), Duration::from_secs(2));
    }

    #[test]
    fn fixed_think_time() {
        let workload = Workload::builder("fixed")
            .think_time(Duration::from_millis(10), Duration::from_millis(10))
            .build()
            .unwrap();

        let mut rng = ScriptedRandom::default();
        assert_eq!(workload.think_time(&mut rng), Duration::from_millis(10));
    }

    #[test]
    fn users_are_reproducible() {
        let workload = default_workload();

        let run = |user| {
            let mut rng = workload.user_random(user);
            (0..20)
                .map(|_| workload.next_action(&mut rng))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(0), run(0));
        assert_ne!(run(0), run(1));
    }

    #[test]
    fn only_reads() {
        let workload = Workload::builder("reads")
            .action_weights(0, 1)
            .build()
            .unwrap();
        let mut rng = workload.user_random(0);

        for _ in 0..100 {
            assert!(matches!(
                workload.next_action(&mut rng),
                Action::GetMessages { .. }
            ));
        }
    }

    #[test]
    fn spawn_intervals() {
        let workload = Workload::builder("w").spawn_rate(4.0).build().unwrap();
        assert_eq!(workload.spawn_interval(), Duration::from_millis(250));

        let workload = Workload::builder("w").spawn_rate(1e-30).build().unwrap();
        assert_eq!(workload.spawn_interval(), Duration::MAX);
    }

    #[test]
    fn invalid_workloads() {
        let err = Workload::builder("w").users(0).build().unwrap_err();
        assert_eq!(err, WorkloadError::NoUsers("w".into()));

        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = Workload::builder("w").spawn_rate(rate).build().unwrap_err();
            assert_eq!(err, WorkloadError::InvalidSpawnRate("w".into()));
        }

        // tiny rates are valid, the spawn interval saturates instead
        assert!(Workload::builder("w").spawn_rate(1e-30).build().is_ok());

        let err = Workload::builder("w").actor_ids(0, 10).build().unwrap_err();
        assert_eq!(err, WorkloadError::InvalidActorIds("w".into(), 0..=10));

        let err = Workload::builder("w").text_length(5, 4).build().unwrap_err();
        assert_eq!(err, WorkloadError::InvalidTextLength("w".into(), 5..=4));

        let err = Workload::builder("w")
            .action_weights(0, 0)
            .build()
            .unwrap_err();
        assert_eq!(err, WorkloadError::NoActions("w".into()));

        let err = Workload::builder("w")
            .think_time(Duration::from_secs(2), Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkloadError::InvalidThinkTime(..)));
    }
}
