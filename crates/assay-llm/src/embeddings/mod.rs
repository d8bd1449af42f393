//! Embedding providers.

mod ollama;
mod openai;

pub use ollama::OllamaEmbeddings;
pub use openai::OpenAIEmbeddings;
