use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::testing::DEFAULT_CONCURRENCY;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    #[serde(default)]
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub shell: PathBuf,
    pub timeout_ms: u64,
    pub concurrency: usize,
    /// Template for the program under test, see [`crate::workspace::program_path_for`].
    pub program_path: String,
    pub command: Vec<TestCommandConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCommandConfig {
    pub pattern: FilePattern,
    pub run: String,
}

/// Glob matched against the program's file name (e.g. `*.py`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FilePattern(glob::Pattern);

impl TryFrom<String> for FilePattern {
    type Error = glob::PatternError;

    fn try_from(s: String) -> StdResult<Self, Self::Error> {
        glob::Pattern::new(&s).map(Self)
    }
}

impl FilePattern {
    pub fn parse(pattern: &str) -> StdResult<Self, glob::PatternError> {
        glob::Pattern::new(pattern).map(Self)
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.0.matches(filename)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            timeout_ms: 5000,
            concurrency: DEFAULT_CONCURRENCY,
            program_path: "#{contestNumber}#{problemId}.py".to_owned(),
            command: Self::default_commands(),
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "kyotest.toml";

    pub fn example_toml() -> String {
        Asset::get(Self::FILENAME)
            .map(|file| String::from_utf8_lossy(file.data.as_ref()).into_owned())
            .unwrap_or_default()
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = std::fs::read_to_string(&filepath)
            .with_context(|| format!("Cannot read config file {:?}", filepath))?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Loads the nearest config file, then `fallback` if it exists, else the built-in defaults.
    pub fn load(cur_dir: impl AsRef<Path>, fallback: Option<PathBuf>) -> anyhow::Result<Self> {
        let found = Self::find_file_in_ancestors(cur_dir)
            .or_else(|| fallback.filter(|path| path.is_file()));
        match found {
            Some(path) => {
                log::debug!("Using config {:?}", path);
                Self::from_toml_file(path)
            }
            None => {
                log::debug!("No {} found; using defaults", Self::FILENAME);
                Ok(Self::default())
            }
        }
    }
}

impl TestConfig {
    /// Matches the default `program_path`, which is a Python script.
    const DEFAULT_COMMANDS: &[(&'static str, &'static str)] = &[("*.py", "python3 #{filePath}")];

    fn default_commands() -> Vec<TestCommandConfig> {
        Self::DEFAULT_COMMANDS
            .iter()
            .filter_map(|&(pattern, run)| {
                Some(TestCommandConfig {
                    pattern: FilePattern::parse(pattern).ok()?,
                    run: run.to_owned(),
                })
            })
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn find_run_cmd_for_filename(&self, filename: impl AsRef<str>) -> Option<&str> {
        self.command
            .iter()
            .find(|entry| entry.pattern.matches(filename.as_ref()))
            .map(|entry| entry.run.as_str())
    }
}
