//! Generative model service adapter (chat-completions over HTTPS).

pub mod client;
pub mod errors;
pub mod types;

pub use client::ChatCompletionsClient;
pub use errors::ModelApiError;
