//! Exporting drawn samples. Each format sits behind its own feature.

#[cfg(feature = "csv")]
pub mod csv;
