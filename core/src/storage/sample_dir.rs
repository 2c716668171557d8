use std::path::{Path, PathBuf};

use kyotest_extractor::ProblemDescriptor;
use lazy_regex::{lazy_regex, Lazy, Regex};

use super::{error::Result, util};
use crate::testing::FsTestcase;

static RE_SAMPLE_INPUT_FILENAME: Lazy<Regex> = lazy_regex!(r"^sample-([0-9]+)\.in$");

/// A directory holding one problem: `problem.json` plus `sample-N.in` / `sample-N.out`
/// pairs, N starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDir {
    dir: PathBuf,
}

impl SampleDir {
    const PROBLEM_FILENAME: &str = "problem.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn problem_file(&self) -> PathBuf {
        self.dir.join(Self::PROBLEM_FILENAME)
    }

    /// Returns tuple (input_filename, output_filename).
    ///
    /// ```
    /// use kyotest_core::storage::SampleDir;
    ///
    /// let (infile, outfile) = SampleDir::testcase_filename(1);
    /// assert_eq!(infile, "sample-1.in");
    /// assert_eq!(outfile, "sample-1.out");
    /// ```
    pub fn testcase_filename(n: usize) -> (String, String) {
        (format!("sample-{}.in", n), format!("sample-{}.out", n))
    }

    /// Writes the descriptor and one file pair per sample, creating the directory.
    pub fn save(&self, descriptor: &ProblemDescriptor) -> Result<()> {
        util::write_json_with_mkdir(self.problem_file(), descriptor)?;

        for (i, sample) in descriptor.samples.iter().enumerate() {
            let (infile, outfile) = Self::testcase_filename(i + 1);
            util::write_with_mkdir(self.dir.join(infile), &sample.input_text)?;
            util::write_with_mkdir(self.dir.join(outfile), &sample.expected_output_text)?;
        }
        log::debug!(
            "Saved {} samples to {:?}",
            descriptor.samples.len(),
            self.dir
        );
        Ok(())
    }

    pub fn load_descriptor(&self) -> Result<ProblemDescriptor> {
        util::read_json(self.problem_file())
    }

    /// Every `sample-N.in` that has a matching `sample-N.out`, sorted by N.
    ///
    /// The files are only enumerated here; their contents are read at each run.
    pub fn load_testcases(&self) -> Result<Vec<FsTestcase>> {
        let mut numbered: Vec<(usize, FsTestcase)> = Vec::new();

        for filename in util::list_filenames(&self.dir)? {
            let Some(n) = RE_SAMPLE_INPUT_FILENAME
                .captures(&filename)
                .and_then(|caps| caps[1].parse::<usize>().ok())
            else {
                continue;
            };
            let (infile, outfile) = Self::testcase_filename(n);
            let output_path = self.dir.join(&outfile);
            if !output_path.is_file() {
                log::warn!("Skipping {:?}: {} is missing", filename, outfile);
                continue;
            }
            let t = FsTestcase::new(format!("sample {}", n), self.dir.join(infile), output_path);
            numbered.push((n, t));
        }

        numbered.sort_by_key(|(n, _)| *n);
        Ok(numbered.into_iter().map(|(_, t)| t).collect())
    }
}
