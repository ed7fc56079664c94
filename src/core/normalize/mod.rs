//! Source normalization into the canonical envelope form

pub mod normalizer;

pub use normalizer::{SourceNormalizer, ENVELOPE_TAG, RECORD_TAG, UNIQUE_ID_TAG};
