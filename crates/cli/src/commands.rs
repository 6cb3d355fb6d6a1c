//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("docmerge")
        .about("Merge-on-write reconciliation of URL-keyed document observations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Config file (default: ./docmerge.toml if present)")
                .global(true),
        )
        .subcommand(build_run())
        .subcommand(build_emit())
        .subcommand(build_init_config())
}

fn build_run() -> Command {
    Command::new("run")
        .about("Reconcile documents from stdin and write merged documents to stdout")
        .arg(
            Arg::new("backend")
                .long("backend")
                .help("Store backend: memory or postgres")
                .value_parser(["memory", "postgres"]),
        )
        .arg(
            Arg::new("codec")
                .long("codec")
                .help("Message codec: json (lines) or msgpack (length-prefixed)")
                .value_parser(["json", "msgpack"]),
        )
        .arg(
            Arg::new("skip-errors")
                .long("skip-errors")
                .help("Log and skip messages that fail instead of stopping")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("init-schema")
                .long("init-schema")
                .help("Create the documents table if it is missing (postgres only)")
                .action(ArgAction::SetTrue),
        )
}

fn build_emit() -> Command {
    Command::new("emit")
        .about("Encode one document to stdout, ready to pipe into `docmerge run`")
        .arg(
            Arg::new("url")
                .long("url")
                .help("Document URL")
                .required(true),
        )
        .arg(
            Arg::new("pub-date")
                .long("pub-date")
                .help("Publication time")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("fetch-time")
                .long("fetch-time")
                .help("Observation time")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("first-fetch-time")
                .long("first-fetch-time")
                .help("First observation time (default: 0)")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("text")
                .long("text")
                .help("Document text")
                .default_value(""),
        )
        .arg(
            Arg::new("codec")
                .long("codec")
                .help("Message codec: json or msgpack")
                .value_parser(["json", "msgpack"]),
        )
}

fn build_init_config() -> Command {
    Command::new("init-config")
        .about("Write a commented default config file")
        .arg(
            Arg::new("path")
                .help("Target path (default: ./docmerge.toml)")
                .index(1),
        )
}
