// Folkalign - pairwise alignment of folk-song feature sequences
// Main library entry point

pub mod alignment;
pub mod config;
pub mod features;
pub mod orchestrator;
pub mod store;

use crate::config::Config;
use crate::orchestrator::BatchOptions;
use crate::store::{AlignmentDatabase, Granularity, Level};
use std::path::PathBuf;

/// A parsed, validated invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub granularity: Granularity,
    pub level: Option<Level>,
    pub db_path: Option<PathBuf>,
    pub config_path: PathBuf,
}

/// What went wrong with the command line.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("--type=[segment|score] is required")]
    MissingType,

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("--level parameter is required for score alignment")]
    MissingLevel,

    #[error("level must be 'note', 'structure', or 'shared_segments' (got '{0}')")]
    InvalidLevel(String),

    #[error("'{0}' expects a value")]
    MissingValue(String),
}

/// Parse command-line arguments (without the program name).
///
/// Grammar: `--type=segment` or `--type=score --level <level>`, with
/// optional `--db <path>` and `--config <path>` overrides.
pub fn parse_args(args: &[String]) -> Result<Invocation, UsageError> {
    let mut granularity = None;
    let mut level = None;
    let mut db_path = None;
    let mut config_path = PathBuf::from("folkalign.toml");

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--type=segment" => granularity = Some(Granularity::Segment),
            "--type=score" => granularity = Some(Granularity::Score),
            "--level" => {
                let value = iter
                    .next()
                    .ok_or_else(|| UsageError::MissingValue("--level".into()))?;
                level = Some(
                    Level::parse(value).ok_or_else(|| UsageError::InvalidLevel(value.clone()))?,
                );
            }
            "--db" => {
                let value = iter
                    .next()
                    .ok_or_else(|| UsageError::MissingValue("--db".into()))?;
                db_path = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| UsageError::MissingValue("--config".into()))?;
                config_path = PathBuf::from(value);
            }
            other => return Err(UsageError::UnknownArgument(other.to_string())),
        }
    }

    let granularity = granularity.ok_or(UsageError::MissingType)?;
    if granularity == Granularity::Score && level.is_none() {
        return Err(UsageError::MissingLevel);
    }

    Ok(Invocation {
        granularity,
        level,
        db_path,
        config_path,
    })
}

/// Execute one full batch run for a validated invocation.
pub fn run(invocation: &Invocation) -> anyhow::Result<()> {
    let config = Config::load_or_default(&invocation.config_path);
    let db_path = invocation.db_path.clone().unwrap_or(config.db_path.clone());

    let db = AlignmentDatabase::open(&db_path)?;

    let opts = BatchOptions {
        batch_size: config.batch_size,
        progress_interval: config.progress_interval,
        worker_threads: config.worker_threads,
    };

    orchestrator::run(
        &db,
        invocation.granularity,
        invocation.level,
        &config.scoring,
        &opts,
    );

    db.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn segment_invocation_needs_no_level() {
        let inv = parse_args(&args(&["--type=segment"])).unwrap();
        assert_eq!(inv.granularity, Granularity::Segment);
        assert_eq!(inv.level, None);
    }

    #[test]
    fn score_invocation_requires_level() {
        assert!(matches!(
            parse_args(&args(&["--type=score"])),
            Err(UsageError::MissingLevel)
        ));

        let inv = parse_args(&args(&["--type=score", "--level", "shared_segments"])).unwrap();
        assert_eq!(inv.granularity, Granularity::Score);
        assert_eq!(inv.level, Some(Level::SharedSegments));
    }

    #[test]
    fn invalid_level_is_rejected() {
        assert!(matches!(
            parse_args(&args(&["--type=score", "--level", "bars"])),
            Err(UsageError::InvalidLevel(_))
        ));
    }

    #[test]
    fn missing_type_is_rejected() {
        assert!(matches!(
            parse_args(&args(&["--level", "note"])),
            Err(UsageError::MissingType)
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let inv = parse_args(&args(&[
            "--type=score",
            "--level",
            "note",
            "--db",
            "other.db",
            "--config",
            "alt.toml",
        ]))
        .unwrap();
        assert_eq!(inv.db_path, Some(PathBuf::from("other.db")));
        assert_eq!(inv.config_path, PathBuf::from("alt.toml"));
    }
}
