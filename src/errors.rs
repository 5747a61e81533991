use thiserror::Error;

/// Domain failures of the import pipeline.
///
/// Everything here is fatal for the run: there is no per-file containment and
/// no per-record recovery. The one non-fatal condition (no identity-like
/// field on a dataset) is a logged warning that triggers the synthesized
/// identity fallback, so it has no variant.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot reach document store at '{uri}': {reason}")]
    Connectivity { uri: String, reason: String },

    #[error("not a valid dataset dump: {reason}")]
    Parse { reason: String },

    #[error("record {index} is not an object with exactly one top-level key wrapping a mapping")]
    RecordShape { index: usize },

    #[error("record {index} is tagged '{found}', expected '{expected}'")]
    TypeTagMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("record {index} is missing identity field '{field}'")]
    MissingIdentityField { index: usize, field: String },

    #[error("identity field '{field}' holds a non-scalar value")]
    NonScalarIdentity { field: String },
}
