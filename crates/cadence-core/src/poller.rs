//! Convergence poller.
//!
//! Reconciles a fire-and-forget UI action against a store that reflects the
//! resulting write on its own schedule. A poll is a fixed sequence of
//! stages: each stage issues exactly one query, and only the gap before the
//! next stage is slept. The sequence ends at the first satisfied query or
//! after the last stage, so a poll never waits longer than the sum of its
//! stage timeouts.

use crate::clock::{Clock, WaitTier, WaitTiers};
use crate::error::{Error, Result};
use crate::predicate::{Field, Predicate};
use crate::record::ObservationResult;
use crate::store::StoreQueryAdapter;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::iter::once;
use std::result::Result as StdResult;
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::Instrument as _;

/// State a poll waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// At least one record matches
    Present,
    /// No record matches
    Absent,
}

impl Expectation {
    /// Whether `matched_count` satisfies this expectation.
    pub const fn is_satisfied(self, matched_count: usize) -> bool {
        match self {
            Self::Present => matched_count > 0,
            Self::Absent => matched_count == 0,
        }
    }
}

impl Display for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// Escalating wait stages for one poll.
///
/// `stage_timeouts[0]` belongs to the immediate first query; the wait before
/// stage `i` is `stage_timeouts[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollBudget {
    poll_interval: Duration,
    stage_timeouts: Vec<Duration>,
}

impl PollBudget {
    /// Create a budget. Stages are applied smallest-first regardless of the
    /// order given.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if there are no stages, or if a retry stage
    /// is shorter than `poll_interval`
    pub fn new(poll_interval: Duration, mut stage_timeouts: Vec<Duration>) -> Result<Self> {
        if stage_timeouts.is_empty() {
            return Err(Error::Config(
                "poll budget needs at least one stage".to_owned(),
            ));
        }
        stage_timeouts.sort_unstable();

        if let Some(too_short) = stage_timeouts
            .iter()
            .skip(1)
            .find(|timeout| **timeout < poll_interval)
        {
            return Err(Error::Config(format!(
                "retry stage of {too_short:?} is shorter than the poll interval {poll_interval:?}"
            )));
        }

        Ok(Self {
            poll_interval,
            stage_timeouts,
        })
    }

    /// Immediate query followed by one retry per tier in `retry_tiers`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `retry_tiers` is empty or a tier is
    /// shorter than `poll_interval`
    pub fn staged(
        poll_interval: Duration,
        tiers: &WaitTiers,
        retry_tiers: &[WaitTier],
    ) -> Result<Self> {
        if retry_tiers.is_empty() {
            return Err(Error::Config(
                "poll budget needs at least one retry stage".to_owned(),
            ));
        }
        let stage_timeouts = once(Duration::ZERO)
            .chain(retry_tiers.iter().map(|tier| tiers.duration(*tier)))
            .collect();
        Self::new(poll_interval, stage_timeouts)
    }

    /// Minimum gap between two queries of the same poll.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Stage timeouts, ascending.
    pub fn stage_timeouts(&self) -> &[Duration] {
        &self.stage_timeouts
    }

    /// Number of queries a non-converging poll issues.
    pub fn stage_count(&self) -> usize {
        self.stage_timeouts.len()
    }

    /// Upper bound on the time a poll sleeps.
    pub fn total(&self) -> Duration {
        self.stage_timeouts.iter().sum()
    }
}

/// Per-expectation budgets.
///
/// Deletions have been observed to converge more slowly than insertions, so
/// absence gets one more stage than presence by default. Both lists are
/// tunable through configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergencePolicy {
    /// Budget for [`Expectation::Present`]
    pub presence: PollBudget,
    /// Budget for [`Expectation::Absent`]
    pub absence: PollBudget,
}

impl ConvergencePolicy {
    /// Immediate + long for presence; immediate + long + very-long for absence.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a tier is shorter than `poll_interval`
    pub fn from_tiers(tiers: &WaitTiers, poll_interval: Duration) -> Result<Self> {
        Ok(Self {
            presence: PollBudget::staged(poll_interval, tiers, &[WaitTier::Long])?,
            absence: PollBudget::staged(
                poll_interval,
                tiers,
                &[WaitTier::Long, WaitTier::VeryLong],
            )?,
        })
    }

    /// Budget used when waiting for `expect`.
    pub fn budget_for(&self, expect: Expectation) -> &PollBudget {
        match expect {
            Expectation::Present => &self.presence,
            Expectation::Absent => &self.absence,
        }
    }
}

/// Outcome of a poll.
#[must_use = "a timed-out poll is only a failure if the caller checks it"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// The expected state was observed.
    Converged {
        /// 1-based stage that observed it
        stage: usize,
        /// The satisfying observation
        observation: ObservationResult,
    },
    /// Every stage ran without observing the expected state.
    TimedOut {
        /// Stages executed
        stages: usize,
        /// Observation from the last stage
        last: ObservationResult,
    },
}

impl Convergence {
    /// Whether the expected state was observed.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Number of queries the poll issued.
    pub fn stages(&self) -> usize {
        match self {
            Self::Converged { stage, .. } => *stage,
            Self::TimedOut { stages, .. } => *stages,
        }
    }

    /// The final observation, whether or not it satisfied the poll.
    pub fn observation(&self) -> &ObservationResult {
        match self {
            Self::Converged { observation, .. } => observation,
            Self::TimedOut { last, .. } => last,
        }
    }

    /// Turn a timeout into an assertion failure describing `what`.
    ///
    /// # Errors
    /// Returns [`ConvergenceTimeout`] if the poll timed out
    pub fn ensure(
        self,
        what: impl Into<String>,
    ) -> StdResult<ObservationResult, ConvergenceTimeout> {
        match self {
            Self::Converged { observation, .. } => Ok(observation),
            Self::TimedOut { stages, last } => Err(ConvergenceTimeout {
                what: what.into(),
                stages,
                last_count: last.matched_count(),
            }),
        }
    }
}

/// Assertion failure produced by [`Convergence::ensure`].
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error(
    "'{what}' did not converge after {stages} stage(s); last query matched {last_count} record(s)"
)]
pub struct ConvergenceTimeout {
    /// Description of the awaited state
    pub what: String,
    /// Stages executed
    pub stages: usize,
    /// Matches seen by the final query
    pub last_count: usize,
}

/// Waits, with bounded patience, for a store collection to reach a state.
#[derive(Debug, Clone)]
pub struct ConvergencePoller {
    adapter: StoreQueryAdapter,
    clock: Clock,
    policy: ConvergencePolicy,
}

impl ConvergencePoller {
    /// Create a poller over one collection.
    #[must_use]
    pub fn new(adapter: StoreQueryAdapter, clock: Clock, policy: ConvergencePolicy) -> Self {
        Self {
            adapter,
            clock,
            policy,
        }
    }

    /// The adapter queries go through.
    pub fn adapter(&self) -> &StoreQueryAdapter {
        &self.adapter
    }

    /// The per-expectation budgets.
    pub fn policy(&self) -> &ConvergencePolicy {
        &self.policy
    }

    /// Wait for `predicate` to be `expect`ed using the policy's budget.
    ///
    /// # Errors
    /// Store failures abort the poll immediately; they are never treated as
    /// "not converged yet"
    pub async fn await_state(
        &self,
        predicate: &Predicate,
        expect: Expectation,
    ) -> Result<Convergence> {
        self.await_state_with(predicate, expect, self.policy.budget_for(expect))
            .await
    }

    /// Wait for `predicate` to be `expect`ed using an explicit budget.
    ///
    /// # Errors
    /// Returns the adapter's error as soon as a query fails
    pub async fn await_state_with(
        &self,
        predicate: &Predicate,
        expect: Expectation,
        budget: &PollBudget,
    ) -> Result<Convergence> {
        let span = tracing::info_span!(
            "await_state",
            collection = %self.adapter.collection(),
            predicate = %predicate,
            expect = %expect,
        );
        self.poll(predicate, budget, |observation| {
            expect.is_satisfied(observation.matched_count())
        })
        .instrument(span)
        .await
    }

    /// Wait until at least one record matches.
    ///
    /// # Errors
    /// See [`Self::await_state`]
    pub async fn await_present(&self, predicate: &Predicate) -> Result<Convergence> {
        self.await_state(predicate, Expectation::Present).await
    }

    /// Wait until no record matches.
    ///
    /// # Errors
    /// See [`Self::await_state`]
    pub async fn await_absent(&self, predicate: &Predicate) -> Result<Convergence> {
        self.await_state(predicate, Expectation::Absent).await
    }

    /// Wait until exactly `expected` records match, using the absence budget
    /// since it has the most patience.
    ///
    /// # Errors
    /// See [`Self::await_state`]
    pub async fn await_count(
        &self,
        predicate: &Predicate,
        expected: usize,
    ) -> Result<Convergence> {
        let span = tracing::info_span!(
            "await_count",
            collection = %self.adapter.collection(),
            predicate = %predicate,
            expected,
        );
        self.poll(predicate, &self.policy.absence, |observation| {
            observation.matched_count() == expected
        })
        .instrument(span)
        .await
    }

    /// Single query with no waiting.
    ///
    /// # Errors
    /// Returns the adapter's error
    pub fn observe(
        &self,
        predicate: &Predicate,
        order_by: Option<Field>,
    ) -> Result<ObservationResult> {
        self.adapter.query(predicate, order_by)
    }

    async fn poll<F>(
        &self,
        predicate: &Predicate,
        budget: &PollBudget,
        satisfied: F,
    ) -> Result<Convergence>
    where
        F: Fn(&ObservationResult) -> bool,
    {
        let stage_timeouts = budget.stage_timeouts();
        let mut stage = 0;

        loop {
            let observation = self.adapter.query(predicate, None)?;
            stage += 1;

            if satisfied(&observation) {
                tracing::debug!("converged at stage {stage}/{}", stage_timeouts.len());
                return Ok(Convergence::Converged { stage, observation });
            }

            let Some(next_wait) = stage_timeouts.get(stage) else {
                tracing::warn!(
                    "not converged after {stage} stage(s) ({:?}); {} record(s) matched",
                    budget.total(),
                    observation.matched_count()
                );
                return Ok(Convergence::TimedOut {
                    stages: stage,
                    last: observation,
                });
            };

            tracing::debug!(
                "stage {stage} unsatisfied ({} match(es)); waiting {next_wait:?}",
                observation.matched_count()
            );
            self.clock.sleep_for(*next_wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|value| Duration::from_secs(*value)).collect()
    }

    #[test]
    fn test_budget_sorts_stages_smallest_first() {
        let budget = PollBudget::new(Duration::from_secs(1), secs(&[6, 0, 2])).unwrap();
        assert_eq!(budget.stage_timeouts(), secs(&[0, 2, 6]).as_slice());
        assert_eq!(budget.total(), Duration::from_secs(8));
        assert_eq!(budget.stage_count(), 3);
    }

    #[test]
    fn test_budget_rejects_empty_and_spinning_stages() {
        assert!(matches!(
            PollBudget::new(Duration::from_secs(1), Vec::new()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            PollBudget::new(Duration::from_secs(1), secs(&[0, 0])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_default_policy_is_asymmetric() {
        let policy =
            ConvergencePolicy::from_tiers(&WaitTiers::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(policy.presence.stage_timeouts(), secs(&[0, 2]).as_slice());
        assert_eq!(policy.absence.stage_timeouts(), secs(&[0, 2, 6]).as_slice());
        assert_eq!(policy.budget_for(Expectation::Absent).stage_count(), 3);
    }

    #[test]
    fn test_expectation_satisfaction() {
        assert!(Expectation::Present.is_satisfied(1));
        assert!(!Expectation::Present.is_satisfied(0));
        assert!(Expectation::Absent.is_satisfied(0));
        assert!(!Expectation::Absent.is_satisfied(2));
    }

    #[test]
    fn test_ensure_reports_timeout() {
        let timed_out = Convergence::TimedOut {
            stages: 3,
            last: ObservationResult::new(vec!["TestDeletPlaylist".to_owned()]),
        };
        let error = timed_out.ensure("TestDeletPlaylist absent").unwrap_err();
        assert_eq!(error.stages, 3);
        assert_eq!(error.last_count, 1);
        assert_eq!(
            error.to_string(),
            "'TestDeletPlaylist absent' did not converge after 3 stage(s); last query matched 1 record(s)"
        );

        let converged = Convergence::Converged {
            stage: 1,
            observation: ObservationResult::default(),
        };
        converged.ensure("anything").unwrap();
    }
}
