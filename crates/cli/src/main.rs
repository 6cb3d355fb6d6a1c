//! docmerge CLI
//!
//! - `docmerge run`: stdin → reconcile → stdout, run stats on stderr
//! - `docmerge emit`: encode one document for `run` (test producer)
//! - `docmerge init-config`: write a commented `docmerge.toml`
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `info`).
//! The first Ctrl-C stops `run` after the message in flight; a second one
//! exits immediately.

mod commands;
mod parse;

use std::io::{self, BufReader};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use docmerge_core::{Encoder, Record};
use docmerge_engine::{
    DocmergeConfig, FramedSink, FramedSource, Framing, LineSink, LineSource, Pipeline, Sink,
    Source,
};

use commands::build_cli;
use parse::{matches_to_action, CliAction};

fn main() {
    init_tracing();

    let matches = build_cli().get_matches();
    let exit_code = match matches_to_action(&matches) {
        Ok(CliAction::Run {
            config,
            init_schema,
        }) => run(&config, init_schema),
        Ok(CliAction::Emit { config, record }) => emit(&config, &record),
        Ok(CliAction::InitConfig { path }) => {
            match DocmergeConfig::write_default_if_missing(&path) {
                Ok(true) => {
                    eprintln!("Wrote {}", path.display());
                    0
                }
                Ok(false) => {
                    eprintln!("{} already exists, left unchanged", path.display());
                    0
                }
                Err(e) => {
                    eprintln!("(error) {}", e);
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            2
        }
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn install_stop_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let installed = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
        eprintln!("stopping after the current message (Ctrl-C again to exit now)");
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
    stop
}

fn run(config: &DocmergeConfig, init_schema: bool) -> i32 {
    let framing = match config.codec_kind() {
        Ok(codec) => codec.framing(),
        Err(e) => {
            eprintln!("(error) {}", e);
            return 2;
        }
    };
    let pipeline = match Pipeline::from_config(config, init_schema) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "failed to start pipeline");
            return 1;
        }
    };
    info!(backend = %config.backend, codec = %config.codec, on_error = %config.on_error, "pipeline started");

    let stop = install_stop_handler();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let (mut source, mut sink): (Box<dyn Source>, Box<dyn Sink>) = match framing {
        Framing::Lines => (
            Box::new(LineSource::new(BufReader::new(stdin.lock()))),
            Box::new(LineSink::new(stdout.lock())),
        ),
        Framing::LengthPrefixed => (
            Box::new(FramedSource::new(BufReader::new(stdin.lock()))),
            Box::new(FramedSink::new(stdout.lock())),
        ),
    };

    let result = pipeline.run(source.as_mut(), sink.as_mut(), &stop);
    let reconcile = pipeline.stats();
    eprintln!(
        "processed={} first_sightings={} content_updates={} origin_updates={} unchanged={} failures={}",
        reconcile.processed,
        reconcile.first_sightings,
        reconcile.content_updates,
        reconcile.origin_updates,
        reconcile.unchanged,
        reconcile.failures,
    );

    match result {
        Ok(stats) => {
            eprintln!(
                "received={} forwarded={} skipped={}",
                stats.received, stats.forwarded, stats.skipped
            );
            0
        }
        Err(e) => {
            error!(error = %e, "pipeline stopped");
            1
        }
    }
}

fn emit(config: &DocmergeConfig, record: &Record) -> i32 {
    let codec = match config.codec_kind() {
        Ok(codec) => codec,
        Err(e) => {
            eprintln!("(error) {}", e);
            return 2;
        }
    };
    let bytes = match codec.encoder().encode(record) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("(error) {}", e);
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut sink: Box<dyn Sink> = match codec.framing() {
        Framing::Lines => Box::new(LineSink::new(stdout.lock())),
        Framing::LengthPrefixed => Box::new(FramedSink::new(stdout.lock())),
    };
    match sink.send(&bytes).and_then(|()| sink.flush()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}
