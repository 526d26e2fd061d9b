//! Collector configuration.

use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;

use crate::error::{ErrorCode, GcError, GcResult};

/// Default number of workers for each parallel phase.
pub const DEFAULT_WORKERS: usize = 10;

/// Default directory the garbage report is written to.
pub const DEFAULT_REPORT_DIR: &str = ".";

/// Command-line arguments for the collector.
#[derive(Parser, Debug, Clone)]
#[command(name = "chunk-gc")]
#[command(about = "Garbage collector for a sharded content-addressed chunk store")]
#[command(version)]
pub struct Args {
    /// Datastore root containing `vm`, `ct`, `ns` and `.chunks`.
    #[arg(long, short = 'b')]
    pub base_dir: Option<PathBuf>,

    /// Number of workers used to parse index files.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub metadata_workers: usize,

    /// Number of workers used to list chunk shards.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub blobs_workers: usize,

    /// Number of workers used to remove garbage chunks.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub delete_workers: usize,

    /// Actually remove the garbage chunks (otherwise only the report is written).
    #[arg(long)]
    pub delete: bool,

    /// Directory the garbage report is written to.
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    pub report_dir: PathBuf,

    /// Also write a JSON summary next to the report.
    #[arg(long)]
    pub summary_json: bool,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (errors only).
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            base_dir: None,
            metadata_workers: DEFAULT_WORKERS,
            blobs_workers: DEFAULT_WORKERS,
            delete_workers: DEFAULT_WORKERS,
            delete: false,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            summary_json: false,
            debug: false,
            silent: false,
        }
    }
}

/// Run configuration derived from command-line arguments.
///
/// Built once at startup and handed to every component; nothing reads
/// process-wide settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Datastore root.
    pub base_dir: PathBuf,
    /// Workers for the index scan.
    pub metadata_workers: usize,
    /// Workers for the shard enumeration.
    pub blobs_workers: usize,
    /// Workers for the sweep.
    pub delete_workers: usize,
    /// Remove garbage instead of only reporting it.
    pub delete: bool,
    /// Where the report lands.
    pub report_dir: PathBuf,
    /// Write `<report>.json` with the run summary.
    pub summary_json: bool,
}

impl Config {
    /// Creates a dry-run configuration with default worker counts.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            metadata_workers: DEFAULT_WORKERS,
            blobs_workers: DEFAULT_WORKERS,
            delete_workers: DEFAULT_WORKERS,
            delete: false,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            summary_json: false,
        }
    }

    /// Sets all three worker counts.
    pub fn with_workers(mut self, metadata: usize, blobs: usize, delete: usize) -> Self {
        self.metadata_workers = metadata;
        self.blobs_workers = blobs;
        self.delete_workers = delete;
        self
    }

    /// Enables or disables the sweep.
    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    /// Sets the report directory.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Checks worker counts and the base directory.
    pub fn validate(&self) -> GcResult<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(GcError::with_message(
                ErrorCode::InvalidConfig,
                "base directory is required",
            ));
        }
        for (name, count) in [
            ("metadata", self.metadata_workers),
            ("blobs", self.blobs_workers),
            ("delete", self.delete_workers),
        ] {
            if count == 0 {
                return Err(GcError::with_message(
                    ErrorCode::InvalidConfig,
                    format!("{} worker count must be at least 1", name),
                ));
            }
        }
        Ok(())
    }
}

impl TryFrom<Args> for Config {
    type Error = GcError;

    fn try_from(args: Args) -> GcResult<Self> {
        let base_dir = args.base_dir.ok_or_else(|| {
            GcError::with_message(ErrorCode::InvalidConfig, "base directory is required")
        })?;
        // report lines must name chunks independent of the working directory
        let base_dir = std::path::absolute(&base_dir).map_err(|e| {
            GcError::with_message(
                ErrorCode::InvalidConfig,
                format!("cannot resolve base directory {}: {}", base_dir.display(), e),
            )
        })?;
        let config = Self {
            base_dir,
            metadata_workers: args.metadata_workers,
            blobs_workers: args.blobs_workers,
            delete_workers: args.delete_workers,
            delete: args.delete,
            report_dir: args.report_dir,
            summary_json: args.summary_json,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_base_dir_is_config_error() {
        let err = Config::try_from(Args::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_args_parse_defaults() {
        let args = Args::try_parse_from(["chunk-gc", "--base-dir", "/srv/store"]).unwrap();
        let config = Config::try_from(args).unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/srv/store"));
        assert_eq!(config.metadata_workers, DEFAULT_WORKERS);
        assert_eq!(config.blobs_workers, DEFAULT_WORKERS);
        assert_eq!(config.delete_workers, DEFAULT_WORKERS);
        assert!(!config.delete);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(Args::try_parse_from(["chunk-gc", "-b", "/x", "--blobs-workers", "0"]).is_err());

        let config = Config::new("/x").with_workers(1, 0, 1);
        assert_eq!(config.validate().unwrap_err().code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_delete_flag() {
        let args =
            Args::try_parse_from(["chunk-gc", "-b", "/x", "--delete", "--delete-workers", "3"])
                .unwrap();
        let config = Config::try_from(args).unwrap();
        assert!(config.delete);
        assert_eq!(config.delete_workers, 3);
    }

    #[test]
    fn test_relative_base_dir_made_absolute() {
        let args = Args::try_parse_from(["chunk-gc", "-b", "store"]).unwrap();
        let config = Config::try_from(args).unwrap();
        assert!(config.base_dir.is_absolute());
        assert!(config.base_dir.ends_with("store"));
    }

    #[test]
    fn test_empty_base_dir_rejected() {
        let args = Args::try_parse_from(["chunk-gc", "-b", ""]).unwrap();
        let err = Config::try_from(args).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }
}
