//! # Schema Inference
//!
//! Structural schemas inferred from document samples, and the permissive
//! write validation that checks incoming documents against them.
//!
//! A detected shape describes *observed* structure in a bounded sample. It
//! is a best-effort description, not a guarantee that every stored document
//! conforms.

mod engine;
mod inference;
mod types;
mod validator;

pub use engine::{DetectOptions, Detection, DetectionStatus, SchemaInferenceEngine};
pub use inference::{ShapeInferrer, DEFAULT_MAX_DEPTH};
pub use types::{FieldShape, SchemaShape, TypeTag};
pub use validator::{ValidationDetails, WriteValidator, WriteVerdict};
