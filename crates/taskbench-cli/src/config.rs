//! Configuration file support for the `taskbench` CLI.
//!
//! A `taskbench.toml` file persists run settings so they do not have to be
//! passed as flags every time.
//!
//! ## Configuration File Location
//!
//! The file is searched for in the following order:
//! 1. The path given with `--config`
//! 2. The current working directory (`./taskbench.toml`)
//! 3. Parent directories, up to the repository root (a directory holding
//!    `.git`) or the filesystem root
//!
//! ## Example Configuration
//!
//! ```toml
//! [bench]
//! time_ms = 500.0
//! iterations = 10
//! warmup = true
//! warmup_time_ms = 100.0
//! warmup_iterations = 5
//!
//! [output]
//! format = "table"
//! path = "target/taskbench/report.json"
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taskbench::BenchBuilder;
use taskbench::options::{
    DEFAULT_ITERATIONS, DEFAULT_TIME_MS, DEFAULT_WARMUP_ITERATIONS, DEFAULT_WARMUP_TIME_MS,
};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "taskbench.toml";

/// Root structure of `taskbench.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskbenchConfig {
    /// Measurement settings shared by every task.
    pub bench: BenchConfig,

    /// Where and how results are written.
    pub output: OutputConfig,
}

/// Measurement settings, mirroring the library's `Options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Minimum measurement time per task, in milliseconds.
    pub time_ms: f64,

    /// Minimum number of measured invocations per task.
    pub iterations: u64,

    /// Whether each task warms up before measurement.
    pub warmup: bool,

    /// Minimum warmup time per task, in milliseconds.
    pub warmup_time_ms: f64,

    /// Minimum number of warmup invocations per task.
    pub warmup_iterations: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            time_ms: DEFAULT_TIME_MS,
            iterations: DEFAULT_ITERATIONS,
            warmup: true,
            warmup_time_ms: DEFAULT_WARMUP_TIME_MS,
            warmup_iterations: DEFAULT_WARMUP_ITERATIONS,
        }
    }
}

impl BenchConfig {
    /// A bench builder carrying these settings.
    pub fn builder(&self) -> BenchBuilder {
        BenchBuilder::new()
            .time(self.time_ms)
            .iterations(self.iterations)
            .warmup(self.warmup)
            .warmup_time(self.warmup_time_ms)
            .warmup_iterations(self.warmup_iterations)
    }
}

/// Console output format.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned, human-readable table.
    #[default]
    Table,
    /// Pretty-printed JSON report.
    Json,
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Console output format.
    pub format: OutputFormat,

    /// File that receives the JSON report after every run.
    pub path: Option<PathBuf>,
}

impl TaskbenchConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: TaskbenchConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Searches the current directory and its parents for `taskbench.toml`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Searches `start_dir` and its parents for `taskbench.toml`.
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// A commented starter `taskbench.toml` holding the default settings.
    pub fn generate_starter_toml() -> String {
        format!(
            r#"# taskbench configuration file
# CLI flags override these settings when provided.

[bench]
# Minimum measurement time per task, in milliseconds
time_ms = {time:?}

# Minimum number of measured invocations per task
iterations = {iterations}

# Warm each task up before measuring it
warmup = true

# Minimum warmup time per task, in milliseconds
warmup_time_ms = {warmup_time:?}

# Minimum number of warmup invocations per task
warmup_iterations = {warmup_iterations}

[output]
# Console output: "table" or "json"
format = "table"

# Also write the JSON report to this file (optional)
# path = "target/taskbench/report.json"
"#,
            time = DEFAULT_TIME_MS,
            iterations = DEFAULT_ITERATIONS,
            warmup_time = DEFAULT_WARMUP_TIME_MS,
            warmup_iterations = DEFAULT_WARMUP_ITERATIONS,
        )
    }
}

/// Merges a loaded config file with command-line flags.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<TaskbenchConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads `explicit` when given, otherwise discovers a config file.
    ///
    /// An explicit path that cannot be read is an error; a missing
    /// discovered file is not.
    pub fn new(explicit: Option<&Path>) -> Result<Self> {
        let found = match explicit {
            Some(path) => Some((TaskbenchConfig::load_from_file(path)?, path.to_path_buf())),
            None => TaskbenchConfig::discover()?,
        };
        Ok(match found {
            Some((config, path)) => Self {
                config: Some(config),
                config_path: Some(path),
            },
            None => Self::default(),
        })
    }

    /// Measurement settings from the config file, or the defaults.
    pub fn bench(&self) -> BenchConfig {
        self.config
            .as_ref()
            .map(|c| c.bench.clone())
            .unwrap_or_default()
    }

    /// Output settings from the config file, or the defaults.
    pub fn output(&self) -> OutputConfig {
        self.config
            .as_ref()
            .map(|c| c.output.clone())
            .unwrap_or_default()
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// The resolved value prefers CLI over config over `default`.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&TaskbenchConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TaskbenchConfig::default();
        assert_eq!(config.bench.time_ms, 500.0);
        assert_eq!(config.bench.iterations, 10);
        assert!(config.bench.warmup);
        assert_eq!(config.bench.warmup_time_ms, 100.0);
        assert_eq!(config.bench.warmup_iterations, 5);
        assert_eq!(config.output.format, OutputFormat::Table);
        assert!(config.output.path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        let toml_content = r#"
[bench]
time_ms = 250.0
iterations = 40
warmup = false

[output]
format = "json"
path = "out/report.json"
"#;
        std::fs::write(&config_path, toml_content).unwrap();

        let config = TaskbenchConfig::load_from_file(&config_path).unwrap();

        assert_eq!(config.bench.time_ms, 250.0);
        assert_eq!(config.bench.iterations, 40);
        assert!(!config.bench.warmup);
        // Unset keys keep their defaults.
        assert_eq!(config.bench.warmup_time_ms, 100.0);
        assert_eq!(config.bench.warmup_iterations, 5);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.path, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn test_integer_times_are_accepted() {
        let config: TaskbenchConfig = toml::from_str("[bench]\ntime_ms = 20\n").unwrap();
        assert_eq!(config.bench.time_ms, 20.0);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[bench]\niterations = \"many\"\n").unwrap();

        assert!(TaskbenchConfig::load_from_file(&config_path).is_err());
    }

    #[test]
    fn test_discover_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[bench]\niterations = 3\n").unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = TaskbenchConfig::discover_from(&nested).unwrap().unwrap();
        assert_eq!(config.bench.iterations, 3);
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_stops_at_repository_root() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[bench]\niterations = 3\n",
        )
        .unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let result = TaskbenchConfig::discover_from(&repo).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_starter_toml_matches_defaults() {
        let toml = TaskbenchConfig::generate_starter_toml();
        assert!(toml.contains("time_ms = 500.0"));
        assert!(toml.contains("iterations = 10"));
        assert!(toml.contains("warmup_time_ms = 100.0"));

        let parsed: TaskbenchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, TaskbenchConfig::default());
    }

    #[test]
    fn test_config_resolver() {
        let mut config = TaskbenchConfig::default();
        config.bench.iterations = 42;
        let resolver = ConfigResolver {
            config: Some(config),
            config_path: None,
        };

        // CLI value takes precedence
        let result = resolver.resolve(Some(7), |c| Some(c.bench.iterations), 1);
        assert_eq!(result, 7);

        // Config value used when CLI is None
        let result = resolver.resolve(None, |c| Some(c.bench.iterations), 1);
        assert_eq!(result, 42);

        // Default used without a config file
        let empty = ConfigResolver::default();
        let result = empty.resolve(None, |c| Some(c.bench.iterations), 1);
        assert_eq!(result, 1);
        assert_eq!(empty.bench(), BenchConfig::default());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(ConfigResolver::new(Some(&missing)).is_err());
    }

    #[test]
    fn test_builder_carries_settings() {
        let config = BenchConfig {
            time_ms: 1.0,
            iterations: 2,
            warmup: false,
            warmup_time_ms: 3.0,
            warmup_iterations: 4,
        };
        let bench = config.builder().build().unwrap();
        let options = bench.options();
        assert_eq!(options.time, 1.0);
        assert_eq!(options.iterations, 2);
        assert!(!options.warmup);
        assert_eq!(options.warmup_time, 3.0);
        assert_eq!(options.warmup_iterations, 4);
    }
}
