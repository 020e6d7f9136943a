//! The `mockview init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("mockview.toml").exists() {
        println!("mockview.toml already exists, skipping.");
    } else {
        std::fs::write("mockview.toml", SAMPLE_CONFIG)?;
        println!("Created mockview.toml");
    }

    std::fs::create_dir_all("corpus")?;
    let corpus_path = Path::new("corpus/python-basics.toml");
    if corpus_path.exists() {
        println!("corpus/python-basics.toml already exists, skipping.");
    } else {
        std::fs::write(corpus_path, EXAMPLE_CORPUS)?;
        println!("Created corpus/python-basics.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY or edit mockview.toml");
    println!("  2. Run: mockview validate --corpus corpus/python-basics.toml");
    println!("  3. Run: mockview user add <name>");
    println!("  4. Run: mockview interview --user <name>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mockview configuration

default_generator = "openai"
default_model = "gpt-4o-mini"
default_temperature = 0.7
max_tokens = 1024
database = "mockview.db"

[generators.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[generators.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# Serve passages from a local corpus file. To use a Pinecone index instead:
#
# [retriever]
# type = "pinecone"
# api_key = "${PINECONE_API_KEY}"
# index_host = "https://example-index-abc123.svc.pinecone.io"
# namespace = "example-namespace"
[retriever]
type = "corpus"
path = "corpus/python-basics.toml"

[interview]
topic_query = "junior developer technical interview"
top_k = 10
max_attempts = 5
request_timeout_secs = 60
"#;

const EXAMPLE_CORPUS: &str = r#"[corpus]
id = "python-basics"
name = "Python basics"
description = "Reference notes for junior Python developer interviews"

[[passages]]
id = "tuples"
text = """
Lists are mutable sequences; tuples are immutable. Because tuples cannot
change, they are hashable when their items are, and can be used as
dictionary keys.
"""

[[passages]]
id = "gil"
text = """
CPython's global interpreter lock lets only one thread execute Python
bytecode at a time. Threads still help for I/O-bound work because the lock
is released while waiting on I/O.
"""

[[passages]]
id = "generators"
text = """
A generator function uses `yield` to produce values lazily. Each call to
next() resumes execution after the last yield, so large sequences can be
processed without holding them in memory.
"""

[[passages]]
id = "decorators"
text = """
A decorator is a callable that takes a function and returns a new function,
usually wrapping the original to add behaviour such as logging or caching.
"""
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use mockview_core::corpus::parse_corpus_str;
    use mockview_core::selector::ContextSelector;
    use mockview_providers::config::MockviewConfig;
    use mockview_providers::memory::MemoryRetriever;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn starter_config_reaches_every_passage() {
        let config: MockviewConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        let corpus =
            parse_corpus_str(EXAMPLE_CORPUS, Path::new("corpus/python-basics.toml")).unwrap();
        let total = corpus.len();
        assert!(config.interview.top_k >= total);

        let selector = ContextSelector::new(
            Arc::new(MemoryRetriever::new(corpus)),
            config.interview.topic_query.clone(),
        )
        .with_top_k(config.interview.top_k);
        let mut used = HashSet::new();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..total {
            let selection = selector.select(&used, None, &mut rng).await.unwrap();
            assert!(selection.is_fresh());
            used.insert(selection.into_text());
        }
        assert_eq!(used.len(), total);
    }
}
