//! Wire format types for backend API protocols
//!
//! Each module contains pure serde structs matching the respective
//! backend's JSON API format. These types are only used at the boundary
//! and are converted to the internal types immediately.

pub mod ollama;
pub mod openai;
