//! The `mockview validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mockview_core::corpus::{parse_corpus, validate_corpus};
use mockview_providers::config::load_config_from;

pub fn execute(corpus_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let mut total_warnings = 0;

    let config = load_config_from(config_path.as_deref())?;
    let problems = config.validate();
    println!(
        "Config: generator '{}' with model '{}'",
        config.default_generator, config.default_model
    );
    for problem in &problems {
        println!("  WARNING: {problem}");
    }
    total_warnings += problems.len();

    if let Some(path) = corpus_path {
        let corpus = parse_corpus(&path)?;
        println!("Corpus: {} ({} passages)", corpus.name, corpus.len());

        let warnings = validate_corpus(&corpus);
        for w in &warnings {
            let prefix = w
                .passage_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All checks passed.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
