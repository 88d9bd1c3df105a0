//! Integration test: full ingestion of an in-memory archive, exercising
//! listing, filtering, normalization dispatch, and the security flag.

use std::io::{Cursor, Write};

use gradus_core::{GradusError, IngestConfig};
use gradus_ingest::{ingest, SourceStrategy};
use zip::write::SimpleFileOptions;

fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut buffer);
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn archive_ingestion_filters_normalizes_and_flags() {
    let notebook = br##"{"cells": [
        {"cell_type": "markdown", "source": ["# Analysis"]},
        {"cell_type": "code", "source": ["df.head()"]}
    ]}"##;

    let bytes = build_archive(&[
        ("README.md", b"# ML project".as_slice()),
        ("src/train.py", b"def train(): pass".as_slice()),
        ("notebooks/eda.ipynb", notebook.as_slice()),
        ("config/.env", b"SECRET=1".as_slice()),
        ("model/weights.bin", b"\x00\x01\x02".as_slice()),
        ("node_modules/lib/pkg.json", b"{}".as_slice()),
    ]);

    let project = ingest(
        SourceStrategy::Archive {
            name: "ml-project".into(),
            bytes,
        },
        &IngestConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(project.name, "ml-project");
    assert_eq!(project.resolved_ref, None);

    let paths: Vec<&str> = project.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["README.md", "src/train.py", "notebooks/eda.ipynb"],
        "listing order preserved; binaries, caches, and .env excluded"
    );

    let notebook_text = &project.files[2].text;
    assert!(notebook_text.contains("--- Markdown cell 1 ---"));
    assert!(notebook_text.contains("```python\ndf.head()"));

    let flag = project.security_flag.expect("flag must be raised");
    assert!(flag.contains("config/.env"));
}

#[tokio::test]
async fn archive_without_relevant_files_is_an_error() {
    let bytes = build_archive(&[("model.bin", b"\x00".as_slice())]);
    let err = ingest(
        SourceStrategy::Archive {
            name: "empty".into(),
            bytes,
        },
        &IngestConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GradusError::NoRelevantFiles(_)));
}

#[tokio::test]
async fn malformed_archive_fails_immediately() {
    let err = ingest(
        SourceStrategy::Archive {
            name: "broken".into(),
            bytes: b"definitely not a zip".to_vec(),
        },
        &IngestConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GradusError::InvalidArchive(_)));
}

#[tokio::test]
async fn configured_ignore_patterns_apply_to_archives() {
    let bytes = build_archive(&[
        ("src/app.py", b"x = 1".as_slice()),
        ("data/huge.json", b"{}".as_slice()),
    ]);

    let config = IngestConfig {
        ignore_patterns: vec!["data/**".into()],
        ..IngestConfig::default()
    };
    let project = ingest(
        SourceStrategy::Archive {
            name: "p".into(),
            bytes,
        },
        &config,
    )
    .await
    .unwrap();

    let paths: Vec<&str> = project.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.py"]);
}
