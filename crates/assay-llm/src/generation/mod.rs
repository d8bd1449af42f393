//! Text generation providers.

mod ollama;
mod openai;

pub use ollama::OllamaGeneration;
pub use openai::OpenAIGeneration;

pub(crate) use openai::build_client;

use assay_core::{GenerationProvider, StageError, StageResult};
use serde_json::Value;
use tracing::warn;

/// Map an HTTP status to the retryability taxonomy. Rate limiting and server
/// faults are worth retrying, other client errors are not.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> StageError {
    if status.as_u16() == 429 || status.is_server_error() {
        StageError::Transient(format!("provider returned {status}: {body}"))
    } else {
        StageError::Unrecoverable(format!("provider returned {status}: {body}"))
    }
}

/// Shared structured-output path: ask for JSON matching `schema`, repair the
/// response, and retry once with a stricter instruction before giving up.
pub(crate) async fn generate_structured_with_retry(
    provider: &dyn GenerationProvider,
    prompt: &str,
    system: Option<&str>,
    schema: &Value,
) -> StageResult<Value> {
    let schema_text = serde_json::to_string_pretty(schema)
        .map_err(|e| StageError::Unrecoverable(format!("schema is not serialisable: {e}")))?;
    let first_prompt = format!(
        "{prompt}\n\nRespond with a single JSON value matching this schema:\n{schema_text}"
    );
    let raw = provider.generate(&first_prompt, system).await?;
    if let Some(value) = crate::json_repair::parse_lenient(&raw) {
        return Ok(value);
    }

    warn!(
        provider = provider.name(),
        "structured output was not parseable, retrying with stricter prompt"
    );
    let strict_prompt = format!(
        "{prompt}\n\nReturn ONLY valid JSON matching this schema. No prose, \
         no markdown fences, no explanation:\n{schema_text}"
    );
    let raw = provider.generate(&strict_prompt, system).await?;
    crate::json_repair::parse_lenient(&raw).ok_or_else(|| {
        StageError::MalformedOutput(format!(
            "provider {} produced unparseable JSON after retry",
            provider.name()
        ))
    })
}
