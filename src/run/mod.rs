//! Single-run orchestration
//!
//! One invocation moves through `Start → Loaded → Selected → Delivering` and ends
//! in `Committed` or `Failed`. The checkpoint advances only after a delivery
//! attempt reports success. Delivery is an explicit two-phase step: [`Orchestrator::attempt`]
//! produces a final outcome, and [`Orchestrator::commit`] is only called for a
//! successful one.

mod retry;
mod state;

pub use retry::RetryPolicy;
pub use state::RunState;

use chrono::Utc;
use std::path::PathBuf;
use std::thread;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::dataset::{Dataset, VerseRecord};
use crate::delivery::{Delivery, DeliveryOutcome};
use crate::error::BotError;
use crate::format::{render_verse, Markup};
use crate::progression::{select_next, Selection};

/// Final outcome of the send phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub outcome: DeliveryOutcome,
    /// Number of sends performed
    pub attempts: u32,
}

/// Summary of one run, for logging and the exit code. Not persisted.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Terminal state
    pub state: RunState,
    /// Every state the run entered, in order
    pub trace: Vec<RunState>,
    pub record_index: Option<usize>,
    pub reference: Option<String>,
    pub attempts: u32,
    /// Checkpoint as left after the run (`None` if it was never read)
    pub checkpoint: Option<Checkpoint>,
    pub error: Option<BotError>,
}

impl RunResult {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Start,
            trace: vec![RunState::Start],
            record_index: None,
            reference: None,
            attempts: 0,
            checkpoint: None,
            error: None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == RunState::Committed
    }

    /// Move to `next`. An illegal move leaves the state untouched and is
    /// returned so the caller can fail the run with it.
    fn advance(&mut self, next: RunState) -> Result<(), BotError> {
        self.state = self.state.try_transition(next)?;
        self.trace.push(next);
        Ok(())
    }

    fn fail(mut self, error: BotError) -> Self {
        error!(
            state = %self.state,
            record_index = ?self.record_index,
            kind = error.kind(),
            error = %error,
            "run failed"
        );
        // A run that already ended keeps its terminal state and first error
        if self.state.is_terminal() {
            return self;
        }
        self.state = RunState::Failed;
        self.trace.push(RunState::Failed);
        self.error = Some(error);
        self
    }
}

/// Sequences load → select → format → deliver → commit for one invocation
pub struct Orchestrator<S, D> {
    store: S,
    delivery: D,
    dataset_path: PathBuf,
    destination: String,
    retry: RetryPolicy,
    markup: Markup,
}

impl<S: CheckpointStore, D: Delivery> Orchestrator<S, D> {
    pub fn new(
        store: S,
        delivery: D,
        dataset_path: impl Into<PathBuf>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            store,
            delivery,
            dataset_path: dataset_path.into(),
            destination: destination.into(),
            retry: RetryPolicy::default(),
            markup: Markup::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Markup the message is rendered in; must match the delivery's parse mode
    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Run once, loading the dataset from the configured path
    pub fn run(&self) -> RunResult {
        let result = RunResult::new();
        let span = tracing::info_span!("run", run_id = %result.run_id);
        let _guard = span.enter();

        info!(dataset = %self.dataset_path.display(), "starting run");
        match Dataset::load(&self.dataset_path) {
            Ok(dataset) => self.execute(result, &dataset),
            Err(e) => result.fail(e.into()),
        }
    }

    /// Run once against an already-loaded dataset
    pub fn run_with(&self, dataset: &Dataset) -> RunResult {
        let result = RunResult::new();
        let span = tracing::info_span!("run", run_id = %result.run_id);
        let _guard = span.enter();

        self.execute(result, dataset)
    }

    fn execute(&self, mut result: RunResult, dataset: &Dataset) -> RunResult {
        let checkpoint = match self.store.read() {
            Ok(checkpoint) => checkpoint,
            Err(e) => return result.fail(e.into()),
        };
        result.checkpoint = Some(checkpoint.clone());
        if let Err(e) = result.advance(RunState::Loaded) {
            return result.fail(e);
        }

        let selection = match select_next(&checkpoint, dataset.len()) {
            Ok(selection) => selection,
            Err(e) => return result.fail(e),
        };
        if selection.wrapped {
            info!(
                stored_index = checkpoint.next_index,
                verses = dataset.len(),
                "reached end of dataset, restarting from the beginning"
            );
        }

        let record = match dataset.get(selection.record_index) {
            Some(record) => record,
            None => {
                return result.fail(BotError::InvalidState(format!(
                    "selected index {} outside dataset of {}",
                    selection.record_index,
                    dataset.len()
                )))
            }
        };
        result.record_index = Some(selection.record_index);
        result.reference = Some(record.reference.clone());
        if let Err(e) = result.advance(RunState::Selected) {
            return result.fail(e);
        }
        info!(
            record_index = selection.record_index,
            reference = %record.reference,
            "selected verse"
        );

        let message = render_verse(record, dataset.len(), self.markup);
        if let Err(e) = result.advance(RunState::Delivering) {
            return result.fail(e);
        }
        let attempt = self.attempt(&message);
        result.attempts = attempt.attempts;

        if attempt.outcome.is_success() {
            match self.commit(&checkpoint, &selection, dataset.len()) {
                Ok(committed) => {
                    info!(
                        record_index = selection.record_index,
                        reference = %record.reference,
                        next_index = committed.next_index,
                        total_posted = committed.total_posted,
                        "posted verse {}/{}",
                        selection.record_index + 1,
                        dataset.len()
                    );
                    result.checkpoint = Some(committed);
                    match result.advance(RunState::Committed) {
                        Ok(()) => result,
                        Err(e) => result.fail(e),
                    }
                }
                Err(e) => {
                    // Delivered but not recorded: the next run will post this verse again
                    error!(
                        record_index = selection.record_index,
                        reference = %record.reference,
                        "delivery confirmed but checkpoint was not saved; next run will repost this verse"
                    );
                    result.fail(e)
                }
            }
        } else {
            let error = delivery_error(&attempt);
            result.checkpoint = Some(self.record_failure(&checkpoint, record, &error));
            result.fail(error)
        }
    }

    /// Send `message`, retrying retryable failures within the policy's budget.
    ///
    /// Returns the last outcome; never touches the checkpoint.
    pub fn attempt(&self, message: &str) -> Attempt {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = self.delivery.send(message, &self.destination);

            match &outcome {
                DeliveryOutcome::Success { message_id } => {
                    info!(attempt = attempts, message_id = ?message_id, "delivery confirmed");
                }
                DeliveryOutcome::Retryable {
                    reason,
                    retry_after,
                } if self.retry.should_retry(&outcome, attempts) => {
                    let delay = self.retry.delay_for(attempts, *retry_after);
                    warn!(
                        attempt = attempts,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "delivery failed, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    continue;
                }
                DeliveryOutcome::Retryable { reason, .. } => {
                    warn!(attempt = attempts, reason = %reason, "delivery failed, retry budget exhausted");
                }
                DeliveryOutcome::Fatal { reason } => {
                    warn!(attempt = attempts, reason = %reason, "delivery rejected");
                }
            }

            return Attempt { outcome, attempts };
        }
    }

    /// Persist progress after a confirmed delivery.
    ///
    /// Only call this for a successful [`Attempt`]; it is the single place the
    /// checkpoint advances.
    pub fn commit(
        &self,
        checkpoint: &Checkpoint,
        selection: &Selection,
        dataset_size: usize,
    ) -> Result<Checkpoint, BotError> {
        let next = checkpoint.advanced(selection.next_index, dataset_size, Utc::now());
        self.store.write(&next)?;
        Ok(next)
    }

    /// Annotate the checkpoint with a delivery failure without advancing it.
    ///
    /// Returns the checkpoint as stored afterwards.
    fn record_failure(
        &self,
        checkpoint: &Checkpoint,
        record: &VerseRecord,
        error: &BotError,
    ) -> Checkpoint {
        let annotated = checkpoint.with_error(format!(
            "{} (record {}, {}) at {}",
            error,
            record.index,
            record.reference,
            Utc::now().to_rfc3339()
        ));
        match self.store.write(&annotated) {
            Ok(()) => annotated,
            Err(e) => {
                warn!(error = %e, "could not record delivery failure in checkpoint");
                checkpoint.clone()
            }
        }
    }
}

fn delivery_error(attempt: &Attempt) -> BotError {
    BotError::Delivery {
        attempts: attempt.attempts,
        retryable: attempt.outcome.is_retryable(),
        reason: attempt
            .outcome
            .reason()
            .unwrap_or("unknown delivery failure")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Checkpoint store that keeps the last write in memory
    #[derive(Default)]
    struct MemoryCheckpointStore {
        stored: Mutex<Option<Checkpoint>>,
        writes: Mutex<usize>,
    }

    impl MemoryCheckpointStore {
        fn new() -> Self {
            Self::default()
        }

        fn with_checkpoint(checkpoint: Checkpoint) -> Self {
            let store = Self::default();
            *store.stored.lock().unwrap() = Some(checkpoint);
            store
        }

        fn stored(&self) -> Option<Checkpoint> {
            self.stored.lock().unwrap().clone()
        }

        fn write_count(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl CheckpointStore for MemoryCheckpointStore {
        fn read(&self) -> Result<Checkpoint, PersistenceError> {
            Ok(self.stored().unwrap_or_default())
        }

        fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
            *self.stored.lock().unwrap() = Some(checkpoint.clone());
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Delivery that replays a fixed script, then repeats the last outcome
    struct Scripted {
        script: Mutex<VecDeque<DeliveryOutcome>>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn new(script: Vec<DeliveryOutcome>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Delivery for Scripted {
        fn send(&self, message: &str, destination: &str) -> DeliveryOutcome {
            self.sent
                .lock()
                .unwrap()
                .push((message.to_string(), destination.to_string()));
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn dataset(n: usize) -> Dataset {
        Dataset::from_records(
            (0..n)
                .map(|i| VerseRecord::new(i, format!("1:{}", i + 1), format!("verse {i}")))
                .collect(),
        )
    }

    fn orchestrator(
        store: MemoryCheckpointStore,
        script: Vec<DeliveryOutcome>,
    ) -> Orchestrator<MemoryCheckpointStore, Scripted> {
        Orchestrator::new(store, Scripted::new(script), "unused.csv", "@verses")
            .with_retry(RetryPolicy::immediate(3))
    }

    #[test]
    fn test_success_trace_and_commit() {
        let orch = orchestrator(
            MemoryCheckpointStore::with_checkpoint(Checkpoint::at(1)),
            vec![DeliveryOutcome::success()],
        );
        let result = orch.run_with(&dataset(3));

        assert!(result.is_committed());
        assert_eq!(
            result.trace,
            vec![
                RunState::Start,
                RunState::Loaded,
                RunState::Selected,
                RunState::Delivering,
                RunState::Committed
            ]
        );
        assert_eq!(result.reference.as_deref(), Some("1:2"));
        let stored = orch.store().stored().unwrap();
        assert_eq!(stored.next_index, 2);
        assert_eq!(stored.total_posted, 1);
        assert!(stored.last_posted_at.is_some());

        let sent = orch.delivery().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "@verses");
        assert!(sent[0].0.contains("verse 1"));
    }

    #[test]
    fn test_attempt_stops_on_fatal() {
        let orch = orchestrator(
            MemoryCheckpointStore::new(),
            vec![DeliveryOutcome::fatal("401")],
        );
        let attempt = orch.attempt("hi");
        assert_eq!(attempt.attempts, 1);
        assert!(!attempt.outcome.is_success());
    }

    #[test]
    fn test_attempt_exhausts_budget() {
        let orch = orchestrator(
            MemoryCheckpointStore::new(),
            vec![DeliveryOutcome::retryable("502")],
        );
        let attempt = orch.attempt("hi");
        assert_eq!(attempt.attempts, 3);
        assert!(attempt.outcome.is_retryable());
        assert_eq!(orch.delivery().sent().len(), 3);
    }

    #[test]
    fn test_failure_records_error_without_advancing() {
        let orch = orchestrator(
            MemoryCheckpointStore::with_checkpoint(Checkpoint::at(2)),
            vec![DeliveryOutcome::retryable("HTTP 503")],
        );
        let result = orch.run_with(&dataset(5));

        assert_eq!(result.state, RunState::Failed);
        assert_eq!(result.trace.last(), Some(&RunState::Failed));
        match result.error {
            Some(BotError::Delivery {
                attempts,
                retryable,
                ..
            }) => {
                assert_eq!(attempts, 3);
                assert!(retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = orch.store().stored().unwrap();
        assert_eq!(stored.next_index, 2);
        assert_eq!(stored.total_posted, 0);
        let last_error = stored.last_error.unwrap();
        assert!(last_error.contains("HTTP 503"));
        assert!(last_error.contains("record 2, 1:3"));
    }

    #[test]
    fn test_empty_dataset_fails_before_delivery() {
        let orch = orchestrator(MemoryCheckpointStore::new(), vec![DeliveryOutcome::success()]);
        let result = orch.run_with(&Dataset::default());

        assert!(matches!(result.error, Some(BotError::InvalidState(_))));
        assert_eq!(
            result.trace,
            vec![RunState::Start, RunState::Loaded, RunState::Failed]
        );
        assert!(orch.delivery().sent().is_empty());
        assert_eq!(orch.store().write_count(), 0);
    }

    #[test]
    fn test_result_rejects_skipped_phase() {
        let mut result = RunResult::new();
        let err = result.advance(RunState::Delivering).unwrap_err();

        assert!(matches!(err, BotError::InvalidState(_)));
        assert_eq!(result.state, RunState::Start);
        assert_eq!(result.trace, vec![RunState::Start]);

        let result = result.fail(err);
        assert_eq!(result.trace, vec![RunState::Start, RunState::Failed]);
    }

    #[test]
    fn test_terminal_result_keeps_first_error() {
        let result = RunResult::new()
            .fail(BotError::InvalidState("first".to_string()))
            .fail(BotError::InvalidState("second".to_string()));

        assert_eq!(result.trace, vec![RunState::Start, RunState::Failed]);
        assert!(result.error.unwrap().to_string().contains("first"));
    }

    #[test]
    fn test_missing_dataset_fails_at_start() {
        let orch = orchestrator(MemoryCheckpointStore::new(), vec![DeliveryOutcome::success()]);
        let result = orch.run();

        assert!(matches!(result.error, Some(BotError::Dataset(_))));
        assert_eq!(result.trace, vec![RunState::Start, RunState::Failed]);
        assert!(result.checkpoint.is_none());
        assert!(orch.delivery().sent().is_empty());
    }
}
