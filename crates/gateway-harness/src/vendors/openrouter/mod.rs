//! OpenRouter provider: OpenAI-compatible chat completions over SSE.
//!
//! The API key is read on every availability check and request, so setting
//! `OPENROUTER_API_KEY` takes effect without a restart.
mod adapter;
mod config;
pub mod transport;

pub use adapter::{OPENROUTER_PROVIDER, OpenRouterProvider};
pub use config::{
    API_KEY_ENV, BASE_URL_ENV, Credentials, DEFAULT_BASE_URL, DEFAULT_MODEL, OpenRouterConfig,
};
pub use transport::{SseDecoder, StreamNormalizer};
