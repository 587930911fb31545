/// Deterministic, always-available reference provider.
pub mod echo;
/// HTTP/SSE-backed provider for OpenRouter.
pub mod openrouter;
