//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use git2::{Repository, Signature, Time};

use context_scout_core::embedding::Embedder;
use context_scout_core::models::{Document, DocumentMetadata, SourceType};

/// Returns the same unit vector for every text and counts calls.
#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_name(&self) -> &str {
        "counting"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0, 0.0])
    }
}

/// Fails for any text containing `poison`.
pub struct SelectiveEmbedder {
    pub poison: String,
}

#[async_trait]
impl Embedder for SelectiveEmbedder {
    fn model_name(&self) -> &str {
        "selective"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(&self.poison) {
            bail!("embedding backend unavailable for {text}");
        }
        Ok(vec![1.0, 0.0])
    }
}

pub fn doc(id: &str, content: &str, source_type: SourceType) -> Document {
    let ts = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
    Document {
        id: id.to_string(),
        content: content.to_string(),
        embedding: vec![1.0, 0.0],
        metadata: DocumentMetadata {
            source_type,
            ..Default::default()
        },
        created_at: ts,
        updated_at: ts,
        story_ids: Vec::new(),
        pr_numbers: Vec::new(),
    }
}

pub fn code_chunk(id: &str, path: &str, start: u32, chunk_type: Option<&str>) -> Document {
    let mut d = doc(id, &format!("chunk of {path}"), SourceType::Code);
    d.metadata.file_path = Some(path.to_string());
    d.metadata.start_line = Some(start);
    d.metadata.end_line = Some(start + 9);
    d.metadata.chunk_type = chunk_type.map(str::to_string);
    d
}

/// Write `files`, stage them and commit on HEAD at `seconds`.
pub fn commit(repo: &Repository, files: &[(&str, &str)], message: &str, seconds: i64) {
    let root = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (path, body) in files {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, body).unwrap();
        index.add_path(Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Ana Lee", "ana@example.com", &Time::new(seconds, 0)).unwrap();
    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| repo.find_commit(oid).unwrap());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

pub fn branch(repo: &Repository, name: &str) {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(name, &head, false).unwrap();
}
