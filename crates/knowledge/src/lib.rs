//! Statute knowledge base and grounded answering.
//!
//! Offline, [`ingest`] segments raw statute text into citable chunks and
//! persists the chunk corpus, the dense index and the article reference
//! graph. Online, [`rag::AnswerPipeline`] answers questions from those
//! read-only artifacts.

pub mod codes;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod eval;
pub mod index;
pub mod lexical;
pub mod rag;
pub mod references;
pub mod segmenter;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::CorpusStore;
pub use rag::{AnswerPipeline, AnswerResponse, ServiceResponse};
pub use references::ReferenceGraph;
pub use segmenter::Segmenter;
pub use types::{BaseStats, Chunk, IngestOptions, IngestStats, KnowledgeBaseConfig};

use chrono::Utc;
use embeddings::{create_provider, PrefixedEmbedder};
use legal_core::{AppError, AppResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Build a knowledge base from a directory of statute `.txt` files.
///
/// Unreadable files are skipped with a warning. Every artifact is staged
/// beside its final path and moved into place only after the whole build
/// succeeded, so a failed run leaves the previous build intact.
pub async fn ingest(workspace: &Path, options: IngestOptions) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!(
        "Starting ingest for base '{}' from {:?}",
        options.base_name,
        options.documents_dir
    );

    let mut config = config::load_config(workspace, &options.base_name)?;
    config.name = options.base_name.clone();

    if !options.documents_dir.is_dir() {
        return Err(AppError::Ingest(format!(
            "Documents directory {:?} does not exist",
            options.documents_dir
        )));
    }

    let segmenter = Segmenter::new(config.segmentation.clone());
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut skipped = Vec::new();
    let mut seen_sources = HashSet::new();
    let mut documents_count = 0u32;
    let mut bytes_processed = 0u64;

    for path in document_paths(&options.documents_dir) {
        let Some(source_id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };

        if !seen_sources.insert(source_id.clone()) {
            tracing::warn!("Skipping {:?}: source '{}' already ingested", path, source_id);
            skipped.push(path.display().to_string());
            continue;
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                skipped.push(path.display().to_string());
                continue;
            }
        };

        let segmented = segmenter.segment(&source_id, &text);
        if segmented.is_empty() {
            tracing::warn!("Skipping {:?}: no chunks above the minimum length", path);
            skipped.push(path.display().to_string());
            continue;
        }

        tracing::debug!("Segmented {:?}: {} chunks", path, segmented.len());
        documents_count += 1;
        bytes_processed += text.len() as u64;
        chunks.extend(segmented);
    }

    fs::create_dir_all(config::get_base_dir(workspace, &options.base_name))?;
    let mut build = StagedBuild::default();

    let corpus_path = build.stage(config::get_corpus_path(workspace, &options.base_name))?;
    CorpusStore::at(corpus_path).write_all(&chunks)?;

    let embedder = PrefixedEmbedder::new(
        create_provider(&config.embeddings)?,
        &config.embeddings,
        config.backend.retry_policy(),
    );
    let passages: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed_passages(&passages).await?;
    write_dense_index(
        &build.stage(config::get_index_path(workspace, &options.base_name))?,
        &config,
        chunks.iter().cloned().zip(vectors).collect(),
    )?;

    let graph = ReferenceGraph::build(&chunks);
    graph.save(&build.stage(config::get_references_path(workspace, &options.base_name))?)?;

    let config_path = build.stage(config::get_config_path(workspace, &options.base_name))?;
    config::save_config(&config_path, &config)?;

    let stats = IngestStats {
        documents_count,
        chunks_count: chunks.len() as u32,
        article_chunks_count: chunks.iter().filter(|c| c.article_number.is_some()).count() as u32,
        reference_edges: graph.edge_count() as u32,
        skipped,
        bytes_processed,
        duration_secs: start.elapsed().as_secs_f64(),
        ingested_at: Utc::now(),
    };

    let stats_path = build.stage(config::get_stats_path(workspace, &options.base_name))?;
    fs::write(&stats_path, serde_json::to_string_pretty(&stats)?)?;

    if options.reset {
        tracing::info!("Resetting knowledge base '{}'", options.base_name);
        remove_artifacts(workspace, &options.base_name)?;
    }
    build.commit()?;

    tracing::info!(
        "Ingest completed: {} documents, {} chunks ({} article chunks), {} skipped in {:.2}s",
        stats.documents_count,
        stats.chunks_count,
        stats.article_chunks_count,
        stats.skipped.len(),
        stats.duration_secs
    );

    Ok(stats)
}

/// `.txt` files under `dir`, in file-name order.
fn document_paths(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect()
}

fn write_dense_index(
    index_path: &Path,
    config: &KnowledgeBaseConfig,
    rows: Vec<(Chunk, Vec<f32>)>,
) -> AppResult<()> {
    let mut conn = index::init_index(index_path)?;
    index::write_meta(&conn, &config.embeddings)?;
    index::insert_chunks(&mut conn, &rows)?;
    tracing::debug!("Wrote {} dense vectors to {:?}", rows.len(), index_path);
    Ok(())
}

/// Build outputs written next to their final paths. `commit` moves them
/// into place; dropping an uncommitted build deletes them.
#[derive(Default)]
struct StagedBuild {
    pending: Vec<(PathBuf, PathBuf)>,
}

impl StagedBuild {
    /// Register `target` and return the path its new content goes to.
    fn stage(&mut self, target: PathBuf) -> AppResult<PathBuf> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AppError::Ingest(format!("Invalid artifact path {:?}", target)))?;
        let staged = target.with_file_name(format!("{}.staged", name));
        if staged.exists() {
            fs::remove_file(&staged)?;
        }
        self.pending.push((staged.clone(), target));
        Ok(staged)
    }

    fn commit(mut self) -> AppResult<()> {
        while !self.pending.is_empty() {
            let (staged, target) = self.pending.remove(0);
            fs::rename(&staged, &target)?;
        }
        Ok(())
    }
}

impl Drop for StagedBuild {
    fn drop(&mut self) {
        for (staged, _) in &self.pending {
            if staged.exists() {
                if let Err(e) = fs::remove_file(staged) {
                    tracing::warn!("Failed to remove staged file {:?}: {}", staged, e);
                }
            }
        }
    }
}

/// Remove every built artifact of a base; its config is kept.
fn remove_artifacts(workspace: &Path, base_name: &str) -> AppResult<()> {
    CorpusStore::new(workspace, base_name).remove()?;
    for path in [
        config::get_index_path(workspace, base_name),
        config::get_references_path(workspace, base_name),
        config::get_stats_path(workspace, base_name),
    ] {
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Clean (reset) a knowledge base.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    if !config::get_base_dir(workspace, base_name).exists() {
        return Err(AppError::Index(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    remove_artifacts(workspace, base_name)?;

    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}

/// Get statistics for a knowledge base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    tracing::info!("Getting stats for knowledge base '{}'", base_name);

    if !config::get_base_dir(workspace, base_name).exists() {
        return Err(AppError::Index(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let corpus_chunks = CorpusStore::new(workspace, base_name).count()?;

    let index_path = config::get_index_path(workspace, base_name);
    let (dense_rows, db_size_bytes) = if index_path.exists() {
        let conn = index::init_index(&index_path)?;
        let size = fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
        (index::count_rows(&conn)?, size)
    } else {
        (0, 0)
    };

    let refs_path = config::get_references_path(workspace, base_name);
    let reference_nodes = if refs_path.exists() {
        ReferenceGraph::load(&refs_path)?.node_count() as u32
    } else {
        0
    };

    let stats_path = config::get_stats_path(workspace, base_name);
    let last_ingest = if stats_path.exists() {
        let content = fs::read_to_string(&stats_path)?;
        Some(serde_json::from_str(&content)?)
    } else {
        None
    };

    Ok(BaseStats {
        base_name: base_name.to_string(),
        corpus_chunks,
        dense_rows,
        reference_nodes,
        db_size_bytes,
        last_ingest,
    })
}
