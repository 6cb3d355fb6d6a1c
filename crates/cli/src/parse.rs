//! ArgMatches → CliAction conversion.
//!
//! Config resolution happens here: file (explicit `--config`, else
//! `./docmerge.toml` if it exists, else defaults), then environment, then
//! command-line flags.

use std::path::{Path, PathBuf};

use clap::ArgMatches;
use docmerge_core::Record;
use docmerge_engine::{DocmergeConfig, CONFIG_FILE_NAME};

/// The result of parsing the command line.
#[derive(Debug)]
pub enum CliAction {
    /// Drive the pipeline over stdin/stdout.
    Run {
        config: DocmergeConfig,
        init_schema: bool,
    },
    /// Write one encoded record to stdout.
    Emit {
        config: DocmergeConfig,
        record: Record,
    },
    /// Write the default config file.
    InitConfig { path: PathBuf },
}

/// Translate parsed arguments into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    match matches.subcommand() {
        Some(("run", sub)) => {
            let config = load_config(matches, |config| {
                if let Some(backend) = sub.get_one::<String>("backend") {
                    config.backend = backend.clone();
                }
                if let Some(codec) = sub.get_one::<String>("codec") {
                    config.codec = codec.clone();
                }
                if sub.get_flag("skip-errors") {
                    config.on_error = "skip".to_string();
                }
            })?;
            Ok(CliAction::Run {
                config,
                init_schema: sub.get_flag("init-schema"),
            })
        }
        Some(("emit", sub)) => {
            let config = load_config(matches, |config| {
                if let Some(codec) = sub.get_one::<String>("codec") {
                    config.codec = codec.clone();
                }
            })?;
            Ok(CliAction::Emit {
                config,
                record: record_from_args(sub)?,
            })
        }
        Some(("init-config", sub)) => {
            let path = sub
                .get_one::<String>("path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            Ok(CliAction::InitConfig { path })
        }
        Some((other, _)) => Err(format!("unknown command '{}'", other)),
        None => Err("no command given".to_string()),
    }
}

/// Resolve config with `flags` applied last; validation runs once at the end.
fn load_config<F>(matches: &ArgMatches, flags: F) -> Result<DocmergeConfig, String>
where
    F: FnOnce(&mut DocmergeConfig),
{
    let explicit = matches.get_one::<String>("config").map(PathBuf::from);
    let default_path = Path::new(CONFIG_FILE_NAME);
    let path = match &explicit {
        Some(path) => Some(path.as_path()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };
    DocmergeConfig::load_with(path, flags).map_err(|e| e.to_string())
}

fn record_from_args(sub: &ArgMatches) -> Result<Record, String> {
    let url = sub
        .get_one::<String>("url")
        .ok_or("--url is required")?
        .clone();
    if url.is_empty() {
        return Err("--url must not be empty".to_string());
    }
    let pub_date = *sub
        .get_one::<u64>("pub-date")
        .ok_or("--pub-date is required")?;
    let fetch_time = *sub
        .get_one::<u64>("fetch-time")
        .ok_or("--fetch-time is required")?;
    let first_fetch_time = sub.get_one::<u64>("first-fetch-time").copied().unwrap_or(0);
    let text = sub.get_one::<String>("text").cloned().unwrap_or_default();

    Ok(Record::new(url, pub_date, fetch_time, text).with_first_observed_at(first_fetch_time))
}
