//! Seed texts for the knowledge base.

use std::path::Path;

use anyhow::{Context, bail};

/// Built-in knowledge used when no seed file is configured.
pub const DEFAULT_SEEDS: &[&str] = &[
    "Rust is a systems programming language focused on safety, speed and concurrency.",
    "Rust achieves memory safety without a garbage collector through ownership and borrowing.",
    "Cargo is Rust's build tool and package manager; crates are published to crates.io.",
    "Tokio is an asynchronous runtime for Rust that provides tasks, timers and async I/O.",
    "Retrieval-augmented generation retrieves relevant documents and adds them to the model prompt.",
    "Cosine similarity compares the direction of two embedding vectors regardless of their length.",
];

/// Load seed texts from a JSON file containing an array of strings.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, or if any entry is blank.
pub fn load_seed_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read knowledge file {}", path.display()))?;
    let texts: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("knowledge file {} must be a JSON array of strings", path.display()))?;

    if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
        bail!("knowledge file {} has a blank entry at index {index}", path.display());
    }
    Ok(texts)
}

/// The seed texts for this run.
pub fn seed_texts(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    match path {
        Some(path) => load_seed_file(path),
        None => Ok(DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ragchat-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_are_used_without_a_file() {
        let texts = seed_texts(None).unwrap();
        assert_eq!(texts.len(), DEFAULT_SEEDS.len());
    }

    #[test]
    fn loads_json_array() {
        let path = temp_file("ok.json", r#"["cats are mammals", "Paris is in France"]"#);
        assert_eq!(seed_texts(Some(&path)).unwrap(), ["cats are mammals", "Paris is in France"]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_blank_entries_and_bad_json() {
        let blank = temp_file("blank.json", r#"["ok", "  "]"#);
        assert!(load_seed_file(&blank).is_err());
        std::fs::remove_file(blank).ok();

        let bad = temp_file("bad.json", r#"{"not": "an array"}"#);
        assert!(load_seed_file(&bad).is_err());
        std::fs::remove_file(bad).ok();
    }
}
