use std::{collections::HashMap, path::PathBuf};

use anyhow::{ensure, Context as _};
use kyotest_extractor::ProblemDescriptor;

use crate::str_interp::interp;

/// Resolves the program under test for a problem, e.g. `#{contestNumber}#{problemId}.py`
/// becomes `123C.py` for ABC 123 C.
///
/// Variables: `contestNumber`, `problemId`, `problemIdLower`, `contestSlug`.
pub fn program_path_for(template: &str, descriptor: &ProblemDescriptor) -> anyhow::Result<PathBuf> {
    ensure!(
        !descriptor.contest_number.is_empty() && !descriptor.problem_id.is_empty(),
        "Cannot derive the program path: contest number or problem id is unknown"
    );

    let problem_id_lower = descriptor.problem_id.to_lowercase();
    let vars = HashMap::from([
        ("contestNumber", descriptor.contest_number.as_str()),
        ("problemId", descriptor.problem_id.as_str()),
        ("problemIdLower", problem_id_lower.as_str()),
        ("contestSlug", descriptor.contest_slug.as_str()),
    ]);

    let path = interp(template, &vars)
        .with_context(|| format!("Invalid program path template '{}'", template))?;
    Ok(PathBuf::from(path))
}
