//! Persisted chunk corpus.
//!
//! Manages `chunks.jsonl`, one serialized [`Chunk`] per line. The lexical
//! index and the dense index loader both rebuild from this file.

use crate::config::get_corpus_path;
use crate::types::Chunk;
use legal_core::{AppError, AppResult};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Reads and writes the chunk corpus of one knowledge base.
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(workspace: &Path, base_name: &str) -> Self {
        Self {
            path: get_corpus_path(workspace, base_name),
        }
    }

    /// Store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the corpus with `chunks`.
    ///
    /// Writes to a sibling temp file and renames it into place, so readers
    /// never observe a half-written corpus.
    pub fn write_all(&self, chunks: &[Chunk]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp_path).map_err(|e| {
                AppError::Ingest(format!("Failed to create {:?}: {}", tmp_path, e))
            })?;
            let mut writer = BufWriter::new(file);

            for chunk in chunks {
                let line = serde_json::to_string(chunk)?;
                writeln!(writer, "{}", line)?;
            }

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!("Wrote {} chunks to {:?}", chunks.len(), self.path);
        Ok(())
    }

    /// Load every chunk in file order.
    pub fn read_all(&self) -> AppResult<Vec<Chunk>> {
        if !self.path.exists() {
            return Err(AppError::Index(format!(
                "Chunk corpus not found at {:?}. Run 'legal-rag ingest' first.",
                self.path
            )));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut chunks = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let chunk: Chunk = serde_json::from_str(&line).map_err(|e| {
                AppError::Index(format!(
                    "Corrupt corpus line {} in {:?}: {}",
                    line_no + 1,
                    self.path,
                    e
                ))
            })?;
            chunks.push(chunk);
        }

        tracing::debug!("Loaded {} chunks from {:?}", chunks.len(), self.path);
        Ok(chunks)
    }

    /// Number of non-empty lines, without deserializing.
    pub fn count(&self) -> AppResult<u32> {
        if !self.path.exists() {
            return Ok(0);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut count = 0u32;
        for line in reader.lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn remove(&self) -> AppResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
