//! Conversion between internal canonical types and backend wire formats

pub mod ollama;
pub mod openai;
