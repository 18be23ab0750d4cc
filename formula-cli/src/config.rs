//! Runtime configuration: defaults, then environment, then command-line flags.
use std::{env, path::PathBuf};

use formula_core::{DEFAULT_BATCH_OZ, PercentCheck};

use crate::cli::Args;

#[derive(Clone, Debug, PartialEq)]
pub struct CliConfig {
    /// Where saved formulas live.
    pub store_dir: PathBuf,
    /// Batch size used when a command gives none.
    pub batch_oz: f64,
    /// How close to 100 the percent total must be; 0 means exact.
    pub percent_tolerance: f64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            batch_oz: DEFAULT_BATCH_OZ,
            percent_tolerance: 0.0,
        }
    }
}

impl CliConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `FORMULA_STORE_DIR` - saved formula directory (default: platform data dir)
    /// - `FORMULA_BATCH_OZ` - default batch size in oz (default: 100)
    /// - `FORMULA_PERCENT_TOLERANCE` - percent total tolerance (default: 0)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = read_env::<PathBuf>("FORMULA_STORE_DIR") {
            config.store_dir = dir;
        }
        if let Some(batch) = read_env::<f64>("FORMULA_BATCH_OZ").filter(|b| b.is_finite()) {
            config.batch_oz = batch;
        }
        if let Some(tol) = read_env::<f64>("FORMULA_PERCENT_TOLERANCE") {
            config.percent_tolerance = tol.max(0.0);
        }

        config
    }

    /// Command-line flags win over the environment.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(dir) = &args.store_dir {
            self.store_dir = dir.clone();
        }
        if let Some(tol) = args.percent_tolerance {
            self.percent_tolerance = tol.max(0.0);
        }
    }

    pub fn percent_check(&self) -> PercentCheck {
        PercentCheck::with_tolerance(self.percent_tolerance)
    }
}

/// Platform data dir, e.g. `~/.local/share/formula-calc` on Linux.
fn default_store_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "formula-calc")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./formula_data"))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_override() {
        let mut config = CliConfig {
            store_dir: PathBuf::from("/env/dir"),
            batch_oz: 32.0,
            percent_tolerance: 0.5,
        };
        let args = Args::parse_from([
            "formula-cli",
            "--store-dir",
            "/flag/dir",
            "--percent-tolerance",
            "0.01",
            "list",
        ]);
        config.apply_args(&args);

        assert_eq!(config.store_dir, PathBuf::from("/flag/dir"));
        assert_eq!(config.batch_oz, 32.0);
        assert_eq!(config.percent_check(), PercentCheck::Tolerance(0.01));
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.batch_oz, DEFAULT_BATCH_OZ);
        assert_eq!(config.percent_check(), PercentCheck::Strict);
    }
}
