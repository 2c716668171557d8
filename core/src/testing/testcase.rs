use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use async_trait::async_trait;
use kyotest_extractor::Sample;
use tokio::sync::RwLock;

/// A sample whose texts are read at execution time, never cached at construction.
#[async_trait]
pub trait AsyncTestcase: Send + Sync {
    fn name(&self) -> &str;
    async fn current_input(&self) -> anyhow::Result<String>;
    async fn current_expected_output(&self) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMemoryTestcase {
    pub name: String,
    pub input: String,
    pub expected_output: String,
}

/// A sample that may be edited (e.g. by a UI) between runs.
#[derive(Debug, Clone)]
pub struct LiveTestcase {
    name: String,
    sample: Arc<RwLock<Sample>>,
}

/// A sample stored as a pair of files, re-read at every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    name: String,
    input_path: PathBuf,
    expected_output_path: PathBuf,
}

impl OnMemoryTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    pub fn from_samples(samples: &[Sample]) -> Vec<Self> {
        samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Self::new(
                    display_name(i, s),
                    s.input_text.clone(),
                    s.expected_output_text.clone(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl AsyncTestcase for OnMemoryTestcase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_input(&self) -> anyhow::Result<String> {
        Ok(self.input.clone())
    }

    async fn current_expected_output(&self) -> anyhow::Result<String> {
        Ok(self.expected_output.clone())
    }
}

impl LiveTestcase {
    pub fn new(name: impl Into<String>, sample: Sample) -> Self {
        Self {
            name: name.into(),
            sample: Arc::new(RwLock::new(sample)),
        }
    }

    pub fn from_samples(samples: &[Sample]) -> Vec<Self> {
        samples
            .iter()
            .enumerate()
            .map(|(i, s)| Self::new(display_name(i, s), s.clone()))
            .collect()
    }

    /// Handle for editing the sample while the testcase is owned by a batch.
    pub fn shared(&self) -> Arc<RwLock<Sample>> {
        self.sample.clone()
    }
}

#[async_trait]
impl AsyncTestcase for LiveTestcase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_input(&self) -> anyhow::Result<String> {
        Ok(self.sample.read().await.input_text.clone())
    }

    async fn current_expected_output(&self) -> anyhow::Result<String> {
        Ok(self.sample.read().await.expected_output_text.clone())
    }
}

impl FsTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        expected_output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input.into(),
            expected_output_path: expected_output.into(),
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn expected_output_path(&self) -> &Path {
        &self.expected_output_path
    }
}

#[async_trait]
impl AsyncTestcase for FsTestcase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_input(&self) -> anyhow::Result<String> {
        tokio::fs::read_to_string(&self.input_path)
            .await
            .with_context(|| format!("Failed to read testcase {:?}", self.input_path))
    }

    async fn current_expected_output(&self) -> anyhow::Result<String> {
        tokio::fs::read_to_string(&self.expected_output_path)
            .await
            .with_context(|| format!("Failed to read testcase {:?}", self.expected_output_path))
    }
}

/// "入力例 1" if the sample has a label, otherwise "sample 1".
fn display_name(index: usize, sample: &Sample) -> String {
    if sample.input_label.is_empty() {
        format!("sample {}", index + 1)
    } else {
        sample.input_label.clone()
    }
}
