//! Concrete chat completion provider implementations.

pub mod common;
pub mod openai;

pub use openai::OpenAiClient;
