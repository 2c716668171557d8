pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize as _;
use error::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use kyotest_extractor::{looks_like_problem_markup, ProblemDescriptor};

use crate::config::{Config, TestConfig};
use crate::storage::SampleDir;
use crate::style;
use crate::testing::{AsyncTestcase, BatchEvent, BatchSummary, Engine, TestRunner};
use crate::{print_success, print_warning};

/// Reads markup from `path`, or from stdin when `path` is `None` or `-`.
pub fn read_markup(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read markup from {:?}", p)),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read markup from stdin")?;
            Ok(buf)
        }
    }
}

/// Extracts the problem and warns about anything that looks off.
pub fn load_problem(markup: &str) -> ProblemDescriptor {
    if !looks_like_problem_markup(markup) {
        print_warning!("{}", "The input does not look like a problem page");
    }
    let descriptor = kyotest_extractor::extract(markup);
    if descriptor.unpaired_blocks > 0 {
        print_warning!(
            "{} sample block(s) had no counterpart and were dropped",
            descriptor.unpaired_blocks
        );
    }
    if descriptor.samples.is_empty() {
        print_warning!("{}", "No samples found");
    }
    descriptor
}

pub fn save_problem(descriptor: &ProblemDescriptor, dir: impl Into<PathBuf>) -> Result<SampleDir> {
    let sample_dir = SampleDir::new(dir);
    sample_dir
        .save(descriptor)
        .context("Failed to save samples")?;
    Ok(sample_dir)
}

/// Writes the example config into `dir`. Never overwrites an existing one.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let filepath = dir.as_ref().join(Config::FILENAME);
    ensure!(!filepath.exists(), "Already exists: {:?}", filepath);

    std::fs::create_dir_all(dir.as_ref())
        .with_context(|| format!("Failed to create {:?}", dir.as_ref()))?;
    std::fs::write(&filepath, Config::example_toml())
        .with_context(|| format!("Failed to write {:?}", filepath))?;
    Ok(filepath)
}

/// Runner for `program_file`, using the first `test.command[]` entry whose pattern
/// matches its file name.
pub fn build_runner(program_file: impl AsRef<Path>, cfg: &TestConfig) -> Result<TestRunner> {
    let program_file = program_file.as_ref();
    let runner = TestRunner::new(program_file)
        .shell(&cfg.shell)
        .time_limit(cfg.timeout());

    let filename = program_file
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    match cfg.find_run_cmd_for_filename(&filename) {
        Some(cmd) => runner
            .run_command(cmd)
            .with_context(|| format!("Invalid run command for '{}': {}", filename, cmd)),
        None => {
            log::debug!("No run command matches '{}'; executing it directly", filename);
            Ok(runner)
        }
    }
}

/// Runs every testcase, showing a spinner per sample that is finished as results arrive.
pub async fn do_test<T>(engine: &Engine, testcases: Vec<T>) -> Result<BatchSummary>
where
    T: AsyncTestcase + 'static,
{
    let names: Vec<String> = testcases.iter().map(|t| t.name().to_owned()).collect();
    let mut handle = engine.run_all(testcases).context("Cannot start testing")?;

    let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let progress = MultiProgress::new();
    let bars: Vec<ProgressBar> = names
        .iter()
        .map(|name| {
            let bar = progress
                .add(ProgressBar::new_spinner())
                .with_style(spinner_style.clone())
                .with_message(format!("{} ...", name));
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        })
        .collect();

    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Finished(res) => {
                if let Some(bar) = bars.get(res.sample_index) {
                    bar.finish_with_message(style::result_line(&res));
                }
            }
            BatchEvent::Completed { .. } => break,
        }
    }
    let summary = handle.wait().await;
    println!();

    summary
        .results
        .iter()
        .filter(|res| !res.passed())
        .for_each(style::print_result_detail);
    style::print_batch_summary(&summary);

    Ok(summary)
}

pub fn print_problem(descriptor: &ProblemDescriptor) {
    match descriptor.headline() {
        Some(headline) => print_success!("{}", headline),
        None => println!("{}", "(unknown problem)".dimmed()),
    }
    for sample in &descriptor.samples {
        println!("{}", sample.input_label.cyan().bold());
        print!("{}", with_final_newline(&sample.input_text));
        println!("{}", sample.output_label.cyan().bold());
        print!("{}", with_final_newline(&sample.expected_output_text));
    }
}

fn with_final_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_owned()
    } else {
        format!("{}\n", text)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::OnMemoryTestcase;

    #[test]
    fn build_runner_picks_matching_command() {
        let cfg = Config::from_toml(&Config::example_toml()).unwrap().test;

        let runner = build_runner("abc/123C.py", &cfg).unwrap();
        assert_eq!(runner.get_run_command(), Some("python3 abc/123C.py"));
        assert_eq!(runner.get_time_limit(), Duration::from_millis(5000));

        let runner = build_runner("a.out", &cfg).unwrap();
        assert_eq!(runner.get_run_command(), None);
    }

    #[test]
    fn build_runner_without_config_file_uses_interpreter() {
        let runner = build_runner("123C.py", &TestConfig::default()).unwrap();
        assert_eq!(runner.get_run_command(), Some("python3 123C.py"));
    }

    #[test]
    fn build_runner_rejects_bad_template() {
        let toml = "[[test.command]]\npattern = \"*.py\"\nrun = \"python3 #{path}\"\n";
        let cfg = Config::from_toml(toml).unwrap().test;
        assert!(build_runner("a.py", &cfg).is_err());
    }

    #[test]
    fn init_config_does_not_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = init_config(tmp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), Config::example_toml());
        assert!(init_config(tmp.path()).is_err());
    }

    #[test]
    fn read_markup_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, "<html></html>").unwrap();
        assert_eq!(read_markup(Some(path.as_path())).unwrap(), "<html></html>");
        assert!(read_markup(Some(tmp.path().join("missing.html").as_path())).is_err());
    }

    #[test]
    fn read_markup_rejects_invalid_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, b"\xff\xfe\x00").unwrap();
        assert!(read_markup(Some(path.as_path())).is_err());
    }

    #[test]
    fn final_newline() {
        assert_eq!(with_final_newline("3"), "3\n");
        assert_eq!(with_final_newline("3\n"), "3\n");
        assert_eq!(with_final_newline(""), "");
    }

    #[tokio::test]
    async fn do_test_reports_summary() {
        let engine = Engine::new(TestRunner::new("/bin/cat"));
        let summary = do_test(
            &engine,
            vec![
                OnMemoryTestcase::new("a", "1\n", "1\n"),
                OnMemoryTestcase::new("b", "2\n", "3\n"),
            ],
        )
        .await
        .unwrap();
        assert!(!summary.all_passed);
        assert_eq!(summary.results.len(), 2);
    }

    #[tokio::test]
    async fn do_test_fails_without_program() {
        let engine = Engine::new(TestRunner::new("/nonexistent/123C.py"));
        let err = do_test(&engine, vec![OnMemoryTestcase::new("a", "", "")])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Program not found"));
    }
}
