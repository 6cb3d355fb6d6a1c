//! Config-driven pipelines
//!
//! Loads `docmerge.toml` from a temp directory and runs the resulting
//! pipeline over in-memory streams.

use std::io::Cursor;
use std::sync::atomic::AtomicBool;

use crate::common::*;
use docmerge::{
    open_store, CodecKind, Decoder, DocmergeConfig, Encoder, Error, ErrorPolicy, Pipeline,
};
use docmerge_engine::{FramedSink, FramedSource, LineSink, LineSource, Sink, Source};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> DocmergeConfig {
    let path = dir.path().join("docmerge.toml");
    std::fs::write(&path, content).unwrap();
    DocmergeConfig::from_file(&path).unwrap()
}

#[test]
fn default_config_file_drives_json_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docmerge.toml");
    assert!(DocmergeConfig::write_default_if_missing(&path).unwrap());
    let config = DocmergeConfig::from_file(&path).unwrap();

    let pipeline = Pipeline::from_config(&config, false).unwrap();
    let input = concat!(
        r#"{"url":"http://a","pub_date":1,"fetch_time":20,"text":"new"}"#,
        "\n",
        r#"{"url":"http://a","pub_date":2,"fetch_time":10,"text":"old"}"#,
        "\n",
    );
    let mut source = LineSource::new(Cursor::new(input.as_bytes().to_vec()));
    let mut sink = LineSink::new(Vec::new());
    let stats = pipeline
        .run(&mut source, &mut sink, &AtomicBool::new(false))
        .unwrap();
    assert_eq!(stats.forwarded, 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let last: Record = serde_json::from_str(output.lines().last().unwrap()).unwrap();
    assert_eq!(last.payload, "new");
    assert_eq!(last.published_at, 2);
    assert_eq!(last.first_observed_at, 10);
}

#[test]
fn msgpack_config_uses_length_prefixed_frames() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "codec = \"msgpack\"\n");
    let codec = config.codec_kind().unwrap();
    assert_eq!(codec, CodecKind::Msgpack);

    let mut input = FramedSink::new(Vec::new());
    input
        .send(&codec.encoder().encode(&observation(100, "x")).unwrap())
        .unwrap();

    let pipeline = Pipeline::from_config(&config, false).unwrap();
    let mut source = FramedSource::new(Cursor::new(input.into_inner()));
    let mut sink = FramedSink::new(Vec::new());
    pipeline
        .run(&mut source, &mut sink, &AtomicBool::new(false))
        .unwrap();

    let mut replies = FramedSource::new(Cursor::new(sink.into_inner()));
    let reply = replies.next_message().unwrap().unwrap();
    let merged = codec.decoder().decode(&reply).unwrap();
    assert_eq!(merged.first_observed_at, 100);
    assert!(replies.next_message().unwrap().is_none());
}

#[test]
fn lenient_memory_section_reaches_the_store() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "[memory]\nrelease_policy = \"lenient\"\nevict_idle_locks = false\n",
    );
    let store = open_store(&config, false).unwrap();
    assert_eq!(store.release_policy(), ReleasePolicy::Lenient);
    store.release(URL).unwrap();
}

#[test]
fn skip_policy_counts_failures() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "on_error = \"skip\"\n");
    assert_eq!(config.error_policy().unwrap(), ErrorPolicy::Skip);

    let pipeline = Pipeline::from_config(&config, false).unwrap();
    let input = "{\"url\":\"\",\"pub_date\":1,\"fetch_time\":1}\n[]\n";
    let mut source = LineSource::new(Cursor::new(input.as_bytes().to_vec()));
    let mut sink = LineSink::new(Vec::new());
    let stats = pipeline
        .run(&mut source, &mut sink, &AtomicBool::new(false))
        .unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.skipped, 2);
    assert!(sink.into_inner().is_empty());
}

#[test]
fn unreachable_postgres_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "backend = \"postgres\"\n[postgres]\nurl = \"postgres://nobody@127.0.0.1:1/none?connect_timeout=1\"\n",
    );
    let err = Pipeline::from_config(&config, false).unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
}
