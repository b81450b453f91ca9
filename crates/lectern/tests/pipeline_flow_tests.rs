//! End-to-end runs: gateway ingest, then the worker pool drives the record
//! through its status machine.

mod common;

use std::time::Duration;

use common::*;
use lectern::content::ContentStatus;
use lectern::worker::{JobKind, JobStatus};
use lectern::{BlobStore, IngestRequest};

const WAIT: Duration = Duration::from_secs(10);

const PAGE_ONE: &str = "Reprint 2024-25\nMATHEMATICS\nTextbook for Class VIII\n\
    1 A SQUARE AND A CUBE\nQueen Rukhsana had a pair of dice and a board of squares.\n\
    1.1 Introduction\nNumbers that are squares of other numbers.";
const PAGE_TWO: &str = "Perfect cubes appear when a number is multiplied by itself \
    three times. 1 8 27 64 are the first perfect cubes.";

fn request(content_type: &str) -> IngestRequest {
    IngestRequest {
        content_type: content_type.into(),
        workspace_id: "ws-1".into(),
        ..IngestRequest::default()
    }
}

#[tokio::test]
async fn test_pdf_upload_reaches_complete_with_refined_title() {
    let h = TestHarness::with_ai().await;
    mount_title_reply(&h.mock, "Squares and Cubes").await;
    mount_summary_reply(&h.mock, "Squares and cubes of whole numbers.").await;

    let receipt = h
        .gateway
        .ingest(IngestRequest {
            file: Some(build_pdf(&[PAGE_ONE, PAGE_TWO], None)),
            filename: Some("chapter_1.pdf".into()),
            ..request("pdf")
        })
        .await
        .unwrap();

    // The heuristic title is there before any background work runs.
    assert_eq!(receipt.status, ContentStatus::Ready);
    assert_eq!(receipt.title, "A SQUARE AND A CUBE");

    let pool = h.start_workers();
    let content = h
        .wait_for(&receipt.content_id, WAIT, |c| c.status == ContentStatus::Complete)
        .await;
    pool.shutdown().await;

    assert_eq!(content.title, "Squares and Cubes");
    assert_eq!(content.metadata["title_source"], "ai");
    assert_eq!(content.metadata["filename"], "chapter_1.pdf");

    let key = content.storage_path().unwrap().to_string();
    assert!(h.blobs.exists(&key).await.unwrap());

    let processed = h.store.processed(&content.id).await.unwrap().unwrap();
    assert_eq!(
        processed.summary.as_deref(),
        Some("Squares and cubes of whole numbers.")
    );
    assert!(processed.chunks.iter().any(|c| c.page == Some(1)));
    assert!(processed.chunks.iter().any(|c| c.page == Some(2)));

    let jobs = h.queue.jobs_for(&content.id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Done);
}

#[tokio::test]
async fn test_pdf_without_ai_stays_ready() {
    let h = TestHarness::new().await;
    let receipt = h
        .gateway
        .ingest(IngestRequest {
            file: Some(build_pdf(&[PAGE_ONE, PAGE_TWO], None)),
            ..request("pdf")
        })
        .await
        .unwrap();

    let pool = h.start_workers();
    let queue = h.queue.clone();
    let id = receipt.content_id.clone();
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let jobs = queue.jobs_for(&id).await.unwrap();
        if jobs.iter().all(|j| j.status == JobStatus::Done) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "job never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    pool.shutdown().await;

    let content = h.store.get(&id).await.unwrap();
    assert_eq!(content.status, ContentStatus::Ready);
    assert_eq!(content.title, "A SQUARE AND A CUBE");
    let processed = h.store.processed(&id).await.unwrap().unwrap();
    assert!(processed.summary.is_none());
    assert!(!processed.chunks.is_empty());
}

#[tokio::test]
async fn test_corrupted_pdf_degrades_to_partial() {
    let h = TestHarness::new().await;
    let receipt = h
        .gateway
        .ingest(IngestRequest {
            file: Some(b"%PDF-1.5 this is not really a pdf".to_vec()),
            filename: Some("Thermodynamics_Notes.pdf".into()),
            ..request("pdf")
        })
        .await
        .unwrap();

    // Filename-derived titles still count as real titles.
    assert_eq!(receipt.title, "Thermodynamics Notes");

    let pool = h.start_workers();
    let content = h
        .wait_for(&receipt.content_id, WAIT, |c| c.status == ContentStatus::Partial)
        .await;
    pool.shutdown().await;

    assert_eq!(content.title, "Thermodynamics Notes");
}

#[tokio::test]
async fn test_youtube_with_transcript_reaches_complete() {
    let h = TestHarness::with_ai().await;
    mount_oembed(&h.mock, "Newton's Laws of Motion", "Physics Channel").await;
    mount_transcript(
        &h.mock,
        "dQw4w9WgXcQ",
        &["An object at rest stays at rest.", "Force equals mass times acceleration."],
    )
    .await;
    mount_summary_reply(&h.mock, "The three laws of motion.").await;

    let receipt = h
        .gateway
        .ingest(IngestRequest {
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            ..request("youtube")
        })
        .await
        .unwrap();
    assert_eq!(receipt.title, "Newton's Laws of Motion");
    assert_eq!(receipt.status, ContentStatus::Ready);

    let pool = h.start_workers();
    let content = h
        .wait_for(&receipt.content_id, WAIT, |c| c.status == ContentStatus::Complete)
        .await;
    pool.shutdown().await;

    assert_eq!(content.metadata["channelTitle"], "Physics Channel");
    let processed = h.store.processed(&content.id).await.unwrap().unwrap();
    assert!(processed
        .transcript
        .unwrap()
        .contains("Force equals mass times acceleration."));
    assert_eq!(processed.summary.as_deref(), Some("The three laws of motion."));
}

#[tokio::test]
async fn test_youtube_without_transcript_is_partial() {
    let h = TestHarness::new().await;
    mount_oembed(&h.mock, "Cell Division", "Biology Channel").await;

    let receipt = h
        .gateway
        .ingest(IngestRequest {
            url: Some("https://www.youtube.com/watch?v=aaaaaaaaaaa".into()),
            ..request("youtube")
        })
        .await
        .unwrap();

    let pool = h.start_workers();
    let content = h
        .wait_for(&receipt.content_id, WAIT, |c| c.status == ContentStatus::Partial)
        .await;
    pool.shutdown().await;

    assert_eq!(content.title, "Cell Division");
}

#[tokio::test]
async fn test_summary_job_after_completion_changes_nothing() {
    let h = TestHarness::with_ai().await;
    mount_summary_reply(&h.mock, "Light becomes chemical energy.").await;

    let receipt = h
        .gateway
        .ingest(IngestRequest {
            text: Some("Photosynthesis\nPlants convert light into chemical energy.".into()),
            ..request("text")
        })
        .await
        .unwrap();

    let pool = h.start_workers();
    h.wait_for(&receipt.content_id, WAIT, |c| c.status == ContentStatus::Complete)
        .await;

    // A later summary request finds the summary and changes nothing.
    h.queue
        .submit(&receipt.content_id, JobKind::Summarize)
        .await
        .unwrap();
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let jobs = h.queue.jobs_for(&receipt.content_id).await.unwrap();
        if jobs.len() == 2 && jobs.iter().all(|j| j.status == JobStatus::Done) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "summary job never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    pool.shutdown().await;

    let content = h.store.get(&receipt.content_id).await.unwrap();
    assert_eq!(content.status, ContentStatus::Complete);
}
