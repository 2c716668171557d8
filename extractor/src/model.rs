use serde::{Deserialize, Serialize};

/// Structured summary of one problem page.
///
/// Fields that could not be found in the markup are left empty.
/// A descriptor where everything is empty means "nothing found yet", not an error.
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ProblemDescriptor {
    /// e.g. "C"
    pub problem_id: String,
    /// e.g. "Sum of Two"
    pub title: String,
    /// e.g. "123" (from the contest slug "abc123")
    pub contest_number: String,
    /// e.g. "abc123", "arc150"
    pub contest_slug: String,
    pub samples: Vec<Sample>,
    /// Number of input/output blocks dropped because they had no counterpart.
    #[serde(default)]
    pub unpaired_blocks: usize,
}

/// One input / expected-output pair of a problem statement.
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// e.g. "入力例 1"
    pub input_label: String,
    /// e.g. "出力例 1"
    pub output_label: String,
    pub input_text: String,
    pub expected_output_text: String,
}

impl ProblemDescriptor {
    pub fn is_empty(&self) -> bool {
        self.problem_id.is_empty()
            && self.title.is_empty()
            && self.contest_number.is_empty()
            && self.contest_slug.is_empty()
            && self.samples.is_empty()
    }

    /// `"ABC 123 - C: Sum of Two"`, or `None` unless all three parts are known.
    pub fn headline(&self) -> Option<String> {
        if self.contest_number.is_empty() || self.problem_id.is_empty() || self.title.is_empty()
        {
            return None;
        }
        Some(format!(
            "ABC {} - {}: {}",
            self.contest_number, self.problem_id, self.title
        ))
    }
}

impl Sample {
    pub fn new(
        input_label: impl Into<String>,
        input_text: impl Into<String>,
        output_label: impl Into<String>,
        expected_output_text: impl Into<String>,
    ) -> Self {
        Self {
            input_label: input_label.into(),
            output_label: output_label.into(),
            input_text: input_text.into(),
            expected_output_text: expected_output_text.into(),
        }
    }
}
