//! In-process retriever over a loaded corpus file.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;

use mockview_core::corpus::{parse_corpus, validate_corpus, Corpus};
use mockview_core::model::Passage;
use mockview_core::traits::Retriever;

/// Ranks corpus passages by how many distinct query terms they contain.
///
/// Like a vector index it always returns the `top_k` nearest passages, even
/// when nothing overlaps. Ties keep file order.
pub struct MemoryRetriever {
    corpus: Corpus,
    terms: Vec<HashSet<String>>,
}

impl MemoryRetriever {
    pub fn new(corpus: Corpus) -> Self {
        let terms = corpus.passages.iter().map(|p| terms(&p.text)).collect();
        Self { corpus, terms }
    }

    /// Load and index a corpus file. Validation problems are logged.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let corpus = parse_corpus(path)?;
        for warning in validate_corpus(&corpus) {
            tracing::warn!(
                corpus = %corpus.id,
                passage = warning.passage_id.as_deref().unwrap_or("-"),
                "{}",
                warning.message
            );
        }
        Ok(Self::new(corpus))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Retriever for MemoryRetriever {
    fn name(&self) -> &str {
        "corpus"
    }

    async fn query(&self, text: &str, top_k: usize) -> anyhow::Result<Vec<Passage>> {
        let query = terms(text);
        let mut ranked: Vec<(usize, &Passage)> = self
            .corpus
            .passages
            .iter()
            .zip(&self.terms)
            .map(|(passage, passage_terms)| (query.intersection(passage_terms).count(), passage))
            .collect();
        // Stable sort keeps file order among equal scores.
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(overlap, passage)| Passage {
                score: overlap as f32,
                ..passage.clone()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Corpus {
        Corpus {
            id: "test".into(),
            name: "Test".into(),
            description: String::new(),
            passages: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Passage::new(format!("p{i}"), *t))
                .collect(),
        }
    }

    #[tokio::test]
    async fn ranks_by_term_overlap() {
        let retriever = MemoryRetriever::new(corpus(&[
            "Rust ownership rules",
            "Python tuples are immutable",
            "Python lists and tuples",
        ]));

        let passages = retriever.query("python tuples lists", 2).await.unwrap();

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].id, "p2");
        assert_eq!(passages[0].score, 3.0);
        assert_eq!(passages[1].id, "p1");
    }

    #[tokio::test]
    async fn ties_keep_file_order_and_nothing_is_filtered() {
        let retriever = MemoryRetriever::new(corpus(&["alpha", "beta", "gamma"]));

        let passages = retriever.query("unrelated", 5).await.unwrap();
        let ids: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2"]);
    }

    #[tokio::test]
    async fn empty_corpus_returns_nothing() {
        let retriever = MemoryRetriever::new(corpus(&[]));
        assert!(retriever.query("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.toml");
        std::fs::write(
            &path,
            "[corpus]\nid = \"c\"\nname = \"C\"\n\n[[passages]]\ntext = \"Generators yield lazily.\"\n",
        )
        .unwrap();

        let retriever = MemoryRetriever::from_path(&path).unwrap();
        assert_eq!(retriever.corpus().len(), 1);
        let passages = retriever.query("generators", 3).await.unwrap();
        assert_eq!(passages[0].text, "Generators yield lazily.");
    }
}
