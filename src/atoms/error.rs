// ── Mnemo Atoms: Error Types ───────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (Config, Store, Llm, Network…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • Only `Config` ever surfaces to the host as a hard error. Storage and
//     model failures are absorbed into degraded results by the engine layer.
//   • `EngineError` → `String` conversion is provided via `Display` so that
//     host boundaries (`Result<T, String>`) can call `.map_err(|e|
//     e.to_string())` without boilerplate.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine configuration is invalid (e.g. threshold ordering).
    /// The only error class that propagates to callers synchronously.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage collaborator failure (backend adapter reported an error).
    #[error("Store error: {operation}: {message}")]
    Store { operation: String, message: String },

    /// A record the caller referenced does not exist in the store.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// External-model scoring failure (bad response shape, missing fields).
    #[error("Model scorer error: {0}")]
    Llm(String),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a store error tagged with the failing operation.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store { operation: operation.into(), message: message.into() }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
/// At host boundaries, convert with `.map_err(|e| e.to_string())`.
pub type EngineResult<T> = Result<T, EngineError>;

// ── Conversion: EngineError → String ──────────────────────────────────────
// Lets host command functions call `.map_err(EngineError::into)` directly.

impl From<EngineError> for String {
    fn from(e: EngineError) -> Self {
        e.to_string()
    }
}
