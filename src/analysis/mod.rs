/// Summaries over written artifact trees.
///
/// Trend statistics are computed by the trend engine; this module only
/// derives descriptive counts from files already in the store.
///
/// Submodules:
/// - `coverage`: number of stations with observations per timestamp.

pub mod coverage;
