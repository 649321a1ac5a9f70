//! Interpretation pipeline: turns free-form line descriptions into
//! structured quantity/unit/category candidates with confidence scores.

pub mod confidence;
pub mod extractor;
pub mod matcher;
pub mod normalize;
