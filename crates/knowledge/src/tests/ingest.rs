//! Offline build followed by loading the built base.

use crate::config::{get_base_dir, get_config_path, load_config, save_config};
use crate::embeddings::EmbeddingConfig;
use crate::rag::pipeline::AnswerPipeline;
use crate::rag::types::FallbackReason;
use crate::types::IngestOptions;
use crate::{clean, ingest, stats};
use legal_core::AppConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CRIMINAL_CODE: &str = "Уголовный кодекс\n\
Статья 190. Мошенничество\n\
1. Мошенничество, то есть хищение чужого имущества путем обмана или злоупотребления доверием, наказывается штрафом.\n\
Статья 191. Присвоение или растрата\n\
1. Присвоение или растрата вверенного имущества, за исключением случаев, предусмотренных статьей 190 настоящего Кодекса, наказывается штрафом.\n";

const LABOR_CODE: &str = "Статья 88. Ежегодный оплачиваемый трудовой отпуск\n\
1. Работникам предоставляется ежегодный оплачиваемый трудовой отпуск продолжительностью двадцать четыре календарных дня.\n";

const TAX_CODE: &str = "Статья 5. Налоговое обязательство\n\
1. Налогоплательщик обязан исполнить налоговое обязательство в полном объеме в установленный срок.\n";

fn write_documents(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("criminal_code.txt"), CRIMINAL_CODE).unwrap();
    fs::write(dir.join("labor_code.txt"), LABOR_CODE).unwrap();
    fs::write(dir.join("broken.txt"), [0xff, 0xfe, 0xfd]).unwrap();
    fs::write(dir.join("notes.md"), "not a statute").unwrap();
}

fn options(dir: &Path, reset: bool) -> IngestOptions {
    IngestOptions {
        base_name: "statutes".to_string(),
        documents_dir: dir.to_path_buf(),
        reset,
    }
}

#[tokio::test]
async fn test_ingest_builds_every_artifact() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    write_documents(&docs);

    let built = ingest(temp.path(), options(&docs, false)).await.unwrap();

    assert_eq!(built.documents_count, 2);
    assert_eq!(built.chunks_count, 3);
    assert_eq!(built.article_chunks_count, 3);
    assert_eq!(built.skipped.len(), 1);
    assert!(built.skipped[0].ends_with("broken.txt"));
    assert!(built.reference_edges >= 1);

    let base = stats(temp.path(), "statutes").unwrap();
    assert_eq!(base.corpus_chunks, 3);
    assert_eq!(base.dense_rows, 3);
    assert!(base.reference_nodes >= 1);
    assert_eq!(
        base.last_ingest.map(|s| s.chunks_count),
        Some(built.chunks_count)
    );
}

#[tokio::test]
async fn test_built_base_serves_answers() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    write_documents(&docs);
    ingest(temp.path(), options(&docs, false)).await.unwrap();

    let app_config = AppConfig {
        provider: "mock".to_string(),
        ..Default::default()
    };
    let pipeline = AnswerPipeline::open(temp.path(), &app_config, "statutes").unwrap();

    // the mock generator always declines
    let response = pipeline.answer("Что такое мошенничество?").await.unwrap();
    assert!(response.is_fallback());
    assert_eq!(response.fallback_reason, Some(FallbackReason::Declined));
}

#[tokio::test]
async fn test_open_without_ingest_fails() {
    let temp = TempDir::new().unwrap();
    let app_config = AppConfig {
        provider: "mock".to_string(),
        ..Default::default()
    };

    let err = AnswerPipeline::open(temp.path(), &app_config, "statutes")
        .err()
        .unwrap();
    assert_eq!(err.kind(), "index_error");
}

#[tokio::test]
async fn test_clean_and_reset() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    write_documents(&docs);
    ingest(temp.path(), options(&docs, false)).await.unwrap();

    clean(temp.path(), "statutes").unwrap();
    let cleaned = stats(temp.path(), "statutes").unwrap();
    assert_eq!(cleaned.corpus_chunks, 0);
    assert_eq!(cleaned.dense_rows, 0);
    assert!(cleaned.last_ingest.is_none());

    let rebuilt = ingest(temp.path(), options(&docs, true)).await.unwrap();
    assert_eq!(rebuilt.chunks_count, 3);
}

#[tokio::test]
async fn test_missing_documents_dir() {
    let temp = TempDir::new().unwrap();
    let result = ingest(temp.path(), options(&temp.path().join("absent"), false)).await;
    assert!(result.is_err());
    assert!(stats(temp.path(), "unknown").is_err());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_build() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("docs");
    write_documents(&docs);
    let first = ingest(temp.path(), options(&docs, false)).await.unwrap();

    fs::write(docs.join("tax_code.txt"), TAX_CODE).unwrap();
    let mut config = load_config(temp.path(), "statutes").unwrap();
    config.embeddings = EmbeddingConfig {
        endpoint: Some("http://127.0.0.1:1".to_string()),
        ..EmbeddingConfig::ollama_e5()
    };
    save_config(&get_config_path(temp.path(), "statutes"), &config).unwrap();

    let result = ingest(temp.path(), options(&docs, true)).await;
    assert!(matches!(
        result.err().map(|e| e.kind()),
        Some("embedding_error" | "timeout")
    ));

    let base = stats(temp.path(), "statutes").unwrap();
    assert_eq!(base.corpus_chunks, first.chunks_count);
    assert_eq!(base.dense_rows, first.chunks_count);
    assert_eq!(
        base.last_ingest.map(|s| s.chunks_count),
        Some(first.chunks_count)
    );

    let staged = fs::read_dir(get_base_dir(temp.path(), "statutes"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".staged"))
        .count();
    assert_eq!(staged, 0);
}
