//! mockview-providers — generator and retriever backends.
//!
//! Implements the core `Generator` trait for OpenAI and Ollama and the
//! `Retriever` trait for Pinecone and in-memory corpus files, plus the
//! configuration that selects between them.

pub mod config;
pub mod error;
pub mod memory;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod pinecone;

pub use config::{
    create_generator, create_retriever, load_config, load_config_from, GeneratorConfig,
    MockviewConfig, RetrieverConfig,
};
pub use error::ProviderError;
