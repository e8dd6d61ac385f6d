//! End-to-end ingestion tests.
//!
//! Simulates the transport side: step the chain until the ingestion
//! stage publishes a reader, feed body chunks as they would arrive on
//! the event loop, publish the assembled body, and run the rest of the
//! pipeline. Verifies the spill file lifecycle on completion and on
//! abort.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use flowline_core::StageContract;
use flowline_exec::{Assembly, Chain, Processing, ProcessingBuilder, Stage};
use flowline_content::keys;
use flowline_content::{
    BodyHandle, ChunkStatus, ContentIngestStage, ParseDispatchStage, SpillDir,
};

const THRESHOLD: u64 = 1_048_576;

/// A parser that consumes anything declared as `text/json`.
struct JsonParser;

impl Stage for JsonParser {
    fn name(&self) -> &str {
        "json-parser"
    }

    fn contract(&self) -> StageContract {
        StageContract::new()
            .optional(&keys::CONTENT_TYPE)
            .optional(&keys::CONTENT_SOURCE)
    }

    fn process(&self, chain: &mut Chain) -> anyhow::Result<()> {
        if chain.get(&keys::CONTENT_TYPE)?.map(String::as_str) == Some("text/json") {
            chain.stop();
        }
        Ok(())
    }
}

async fn server_processing(spill_root: &Path) -> Arc<Processing> {
    let spill = Arc::new(SpillDir::open(spill_root).await.unwrap());

    let mut parsers = Assembly::new("parsers");
    parsers.add(JsonParser);

    let mut assembly = Assembly::new("server");
    assembly.add(ContentIngestStage::new(THRESHOLD, spill));
    assembly.add_branching(
        ParseDispatchStage::new("UTF-8"),
        vec![ParseDispatchStage::parser_branch(&parsers)],
    );

    ProcessingBuilder::new()
        .provided(&keys::CONTENT_LENGTH)
        .provided(&keys::CONTENT_TYPE)
        .provided(&keys::RESPONSE_CONTENT_TYPE)
        .build(&assembly)
        .unwrap()
}

fn seeded_chain(processing: &Arc<Processing>, declared: u64) -> Chain {
    let mut chain = processing.new_chain();
    chain.set(&keys::CONTENT_LENGTH, declared).unwrap();
    chain.set(&keys::CONTENT_TYPE, "text/json".to_string()).unwrap();
    chain
        .set(&keys::RESPONSE_CONTENT_TYPE, "text/json".to_string())
        .unwrap();
    chain
}

fn spill_files(root: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[tokio::test]
async fn memory_body_flows_through_ingest_and_parse() {
    let dir = tempfile::tempdir().unwrap();
    let processing = server_processing(dir.path()).await;
    let mut chain = seeded_chain(&processing, 10);

    // First step runs the ingestion stage.
    assert!(chain.step().unwrap());
    assert_eq!(chain.get(&keys::CONTENT_REQUIRED).unwrap(), Some(&true));
    let reader = chain.get(&keys::CONTENT_READER).unwrap().unwrap().clone();

    // Body chunks arrive across separate callbacks.
    assert!(matches!(
        reader.accept(Bytes::from_static(b"hello")).await.unwrap(),
        ChunkStatus::NeedMore
    ));
    assert!(matches!(
        reader.accept(Bytes::from_static(b"world")).await.unwrap(),
        ChunkStatus::Complete
    ));

    // Ingestion complete: publish the body, detach the reader.
    let body = reader.take_body().await.unwrap();
    assert_eq!(body.length(), 10);
    chain.clear(&keys::CONTENT_READER).unwrap();
    chain
        .set(&keys::CONTENT_SOURCE, BodyHandle::new(body))
        .unwrap();

    // The rest of the pipeline parses the content.
    while chain.step().unwrap() {}
    chain.finish();

    assert!(chain.get(&keys::CONTENT_SOURCE).unwrap().is_none());
    assert!(chain.get(&keys::RESPONSE_SUCCESS).unwrap().is_none());
}

#[tokio::test]
async fn spilled_body_is_removed_after_finalization() {
    let dir = tempfile::tempdir().unwrap();
    let processing = server_processing(dir.path()).await;

    let payload: Vec<u8> = (0..2_000_000u32).map(|i| (i % 251) as u8).collect();
    let mut chain = seeded_chain(&processing, payload.len() as u64);

    assert!(chain.step().unwrap());
    let reader = chain.get(&keys::CONTENT_READER).unwrap().unwrap().clone();

    for chunk in payload.chunks(500_000) {
        reader.accept(Bytes::copy_from_slice(chunk)).await.unwrap();
    }

    // The body spilled to exactly one uniquely named file.
    assert_eq!(spill_files(dir.path()).len(), 1);

    let body = reader.take_body().await.unwrap();
    chain.clear(&keys::CONTENT_READER).unwrap();

    // The reopened source yields the same bytes that were written.
    let handle = BodyHandle::new(body);
    assert_eq!(handle.read_all().unwrap(), Bytes::from(payload));
    chain.set(&keys::CONTENT_SOURCE, handle).unwrap();

    while chain.step().unwrap() {}
    assert_eq!(spill_files(dir.path()).len(), 1);
    chain.finish();

    // Finalization removed the spill file.
    assert!(spill_files(dir.path()).is_empty());
}

#[tokio::test]
async fn aborted_ingestion_still_cleans_up_the_spill_file() {
    let dir = tempfile::tempdir().unwrap();
    let processing = server_processing(dir.path()).await;
    let mut chain = seeded_chain(&processing, 5_000_000);

    assert!(chain.step().unwrap());
    let reader = chain.get(&keys::CONTENT_READER).unwrap().unwrap().clone();
    reader
        .accept(Bytes::from(vec![7u8; 100_000]))
        .await
        .unwrap();
    assert_eq!(spill_files(dir.path()).len(), 1);

    // Connection closed mid-ingestion: the chain is dropped without
    // ever finishing.
    drop(chain);
    assert!(spill_files(dir.path()).is_empty());
}

#[tokio::test]
async fn short_body_reaches_later_stages_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let processing = server_processing(dir.path()).await;
    let mut chain = seeded_chain(&processing, 10);

    assert!(chain.step().unwrap());
    let reader = chain.get(&keys::CONTENT_READER).unwrap().unwrap().clone();

    reader.accept(Bytes::from_static(b"abc")).await.unwrap();
    // Peer closed early: ingestion finalizes with what was received.
    assert!(matches!(
        reader.accept(Bytes::new()).await.unwrap(),
        ChunkStatus::Closed
    ));

    let body = reader.take_body().await.unwrap();
    assert!(body.is_short());
    assert_eq!(body.length(), 3);

    chain.clear(&keys::CONTENT_READER).unwrap();
    let handle = BodyHandle::new(body);
    chain.set(&keys::CONTENT_SOURCE, handle.clone()).unwrap();

    // The short flag is the later stages' policy input.
    assert!(handle.is_short().unwrap());

    while chain.step().unwrap() {}
    chain.finish();
}

#[tokio::test]
async fn overflow_tail_is_returned_to_the_transport() {
    let dir = tempfile::tempdir().unwrap();
    let processing = server_processing(dir.path()).await;
    let mut chain = seeded_chain(&processing, 4);

    assert!(chain.step().unwrap());
    let reader = chain.get(&keys::CONTENT_READER).unwrap().unwrap().clone();

    // The second message's bytes arrived glued to the first body.
    let status = reader
        .accept(Bytes::from_static(b"bodyNEXT"))
        .await
        .unwrap();
    match status {
        ChunkStatus::Overflow(tail) => assert_eq!(tail, Bytes::from_static(b"NEXT")),
        other => panic!("expected overflow, got {other:?}"),
    }

    let body = reader.take_body().await.unwrap();
    assert_eq!(body.into_bytes().unwrap(), Bytes::from_static(b"body"));
}
