//! Concurrent execution of a whole batch of testcases.
//!
//! A batch runs on a background task. Up to `concurrency` workers each claim the next
//! unclaimed testcase, run it in a task of its own and publish the result on the
//! [`StateBoard`] and as a [`BatchEvent`], in completion order.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};

use super::{result::*, runner::TestRunner, testcase::AsyncTestcase};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Batch-wide preconditions. Per-sample failures never show up here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Program not found: {0:?}")]
    ProgramNotFound(PathBuf),

    #[error("No testcases to run")]
    NoTestcases,

    #[error("State board has {board} slots but {testcases} testcases were given")]
    BoardSizeMismatch { board: usize, testcases: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Finished(ExecutionResult),
    /// Always the last event of a batch.
    Completed { all_passed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// In testcase order.
    pub results: Vec<ExecutionResult>,
    pub all_passed: bool,
}

/// Per-sample state shared with observers. Each slot has its own lock and is only
/// written by the worker that runs that sample.
#[derive(Debug, Default)]
pub struct StateBoard {
    slots: Vec<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    name: String,
    state: SampleState,
    result: Option<ExecutionResult>,
}

impl StateBoard {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::default()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<SampleState> {
        self.slots.get(index).map(|_| self.slot(index).state)
    }

    pub fn snapshot(&self) -> Vec<SampleState> {
        (0..self.len()).map(|i| self.slot(i).state).collect()
    }

    pub fn result(&self, index: usize) -> Option<ExecutionResult> {
        self.slots.get(index).and_then(|_| self.slot(index).result.clone())
    }

    fn slot(&self, index: usize) -> MutexGuard<'_, Slot> {
        // a poisoned slot still holds consistent plain data
        self.slots[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reset_running<T: AsyncTestcase>(&self, testcases: &[T]) {
        for (i, t) in testcases.iter().enumerate() {
            let mut slot = self.slot(i);
            slot.name = t.name().to_owned();
            slot.state = SampleState::Running;
            slot.result = None;
        }
    }

    /// A slot is finished once per run; a late result (e.g. after an abort) is dropped.
    fn finish(&self, res: ExecutionResult) {
        let mut slot = self.slot(res.sample_index);
        if slot.state.is_terminal() {
            log::debug!("Dropping late result for {}", slot.name);
            return;
        }
        slot.state = SampleState::Done(res.verdict);
        slot.result = Some(res);
    }

    /// Turns every non-terminal slot into an `ExecutionError` and returns those results.
    fn fail_unfinished(&self, message: &str) -> Vec<ExecutionResult> {
        let mut failed = Vec::new();
        for i in 0..self.len() {
            let mut slot = self.slot(i);
            if slot.state.is_terminal() {
                continue;
            }
            let res = ExecutionResult::execution_error(i, slot.name.clone(), message);
            slot.state = SampleState::Done(res.verdict);
            slot.result = Some(res.clone());
            failed.push(res);
        }
        failed
    }

    fn summary(&self) -> BatchSummary {
        let results: Vec<_> = (0..self.len())
            .filter_map(|i| self.slot(i).result.clone())
            .collect();
        let all_passed = results.len() == self.len() && results.iter().all(ExecutionResult::passed);
        BatchSummary {
            results,
            all_passed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    runner: Arc<TestRunner>,
    concurrency: usize,
}

impl Engine {
    pub fn new(runner: TestRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn runner(&self) -> &TestRunner {
        &self.runner
    }

    /// Starts a batch on a fresh [`StateBoard`]. Must be called inside a tokio runtime.
    pub fn run_all<T>(&self, testcases: Vec<T>) -> Result<BatchHandle, EngineError>
    where
        T: AsyncTestcase + 'static,
    {
        let board = Arc::new(StateBoard::new(testcases.len()));
        self.run_all_on(testcases, board)
    }

    /// Starts a batch reusing `board`, whose slots are all reset to `Running` before
    /// this returns.
    pub fn run_all_on<T>(
        &self,
        testcases: Vec<T>,
        board: Arc<StateBoard>,
    ) -> Result<BatchHandle, EngineError>
    where
        T: AsyncTestcase + 'static,
    {
        if testcases.is_empty() {
            return Err(EngineError::NoTestcases);
        }
        if board.len() != testcases.len() {
            return Err(EngineError::BoardSizeMismatch {
                board: board.len(),
                testcases: testcases.len(),
            });
        }
        self.runner.ensure_program_exists()?;

        board.reset_running(&testcases);

        let num_workers = self.concurrency.min(testcases.len());
        log::info!(
            "Running {} testcases on {} workers: {}",
            testcases.len(),
            num_workers,
            self.runner.describe()
        );

        let (tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_batch(
            self.runner.clone(),
            Arc::new(testcases),
            board.clone(),
            num_workers,
            tx,
        ));

        Ok(BatchHandle {
            board,
            events,
            task,
        })
    }
}

pub struct BatchHandle {
    board: Arc<StateBoard>,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    task: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub fn board(&self) -> &Arc<StateBoard> {
        &self.board
    }

    /// `None` once the batch has completed and every event was received.
    pub async fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    pub async fn wait(self) -> BatchSummary {
        match self.task.await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Batch task failed: {}", e);
                self.board.fail_unfinished("Batch task failed");
                self.board.summary()
            }
        }
    }

    /// Cancels the batch; running programs are killed and unfinished samples become errors.
    pub fn abort(self) -> BatchSummary {
        self.task.abort();
        self.board.fail_unfinished("Aborted");
        self.board.summary()
    }
}

async fn run_batch<T>(
    runner: Arc<TestRunner>,
    testcases: Arc<Vec<T>>,
    board: Arc<StateBoard>,
    num_workers: usize,
    tx: mpsc::UnboundedSender<BatchEvent>,
) -> BatchSummary
where
    T: AsyncTestcase + 'static,
{
    let next = Arc::new(AtomicUsize::new(0));
    let mut workers = JoinSet::new();

    for _ in 0..num_workers {
        let runner = runner.clone();
        let testcases = testcases.clone();
        let board = board.clone();
        let next = next.clone();
        let tx = tx.clone();
        workers.spawn(async move {
            loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                if index >= testcases.len() {
                    break;
                }
                let res = run_isolated(runner.clone(), testcases.clone(), index).await;
                board.finish(res.clone());
                // the receiver may have been dropped; the board still has the result
                let _ = tx.send(BatchEvent::Finished(res));
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            log::error!("Worker stopped unexpectedly: {}", e);
        }
    }

    for res in board.fail_unfinished("Not completed by the worker pool") {
        let _ = tx.send(BatchEvent::Finished(res));
    }

    let summary = board.summary();
    let _ = tx.send(BatchEvent::Completed {
        all_passed: summary.all_passed,
    });
    summary
}

/// Runs one testcase in its own task so that a panic only affects that testcase.
async fn run_isolated<T>(
    runner: Arc<TestRunner>,
    testcases: Arc<Vec<T>>,
    index: usize,
) -> ExecutionResult
where
    T: AsyncTestcase + 'static,
{
    let name = testcases[index].name().to_owned();
    let mut task = AbortOnDrop(tokio::spawn(async move {
        runner.run(index, &testcases[index]).await
    }));
    match (&mut task.0).await {
        Ok(res) => res,
        Err(e) => {
            log::error!("Testcase {} crashed: {}", name, e);
            ExecutionResult::execution_error(index, name, format!("Internal error: {}", e))
        }
    }
}

/// Cancels the inner task (and so kills its child process) when a batch is aborted.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
