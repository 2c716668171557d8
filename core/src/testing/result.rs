use std::time::Duration;

/// Terminal outcome of running one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Verdict {
    #[strum(serialize = "AC")]
    Passed,
    #[strum(serialize = "WA")]
    Failed,
    #[strum(serialize = "TLE")]
    TimedOut,
    #[strum(serialize = "ERR")]
    ExecutionError,
}

/// Per-sample state as seen by an observer of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleState {
    #[default]
    NotRun,
    Running,
    Done(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub sample_index: usize,
    pub name: String,
    /// Captured stdout with trailing whitespace trimmed.
    pub actual_output: String,
    pub error_output: String,
    /// The expected text as read when the sample was run.
    pub expected_output: String,
    pub verdict: Verdict,
    /// `None` if the process was killed or never started.
    pub exit_status: Option<i32>,
    pub execution_time: Duration,
}

impl ExecutionResult {
    pub fn execution_error(
        sample_index: usize,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            sample_index,
            name: name.into(),
            actual_output: String::new(),
            error_output: message.into(),
            expected_output: String::new(),
            verdict: Verdict::ExecutionError,
            exit_status: None,
            execution_time: Duration::ZERO,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

impl SampleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SampleState::Done(_))
    }
}

/// Case-insensitive equality after trimming surrounding whitespace on both sides.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim().to_lowercase() == expected.trim().to_lowercase()
}
