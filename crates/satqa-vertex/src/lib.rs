//! Satellite image inspection through Gemini on Vertex AI.
//!
//! [`SatelliteInspector`] sends one image, a fixed remote-sensing instruction
//! and the [`satqa_core::analysis_response_schema`] to the model and parses
//! the structured verdict. There are no retries and no partial results.

pub mod client;
pub mod error;
pub mod inspector;
pub mod types;

pub use client::{GeminiClient, VertexSettings};
pub use error::VertexError;
pub use inspector::{mime_type_for_path, ImageSource, SatelliteInspector};
