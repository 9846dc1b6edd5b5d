
/// Helper functions for writing JSON via serde
pub mod json_io;
/// Small probability helpers
pub mod math;
/// Helper functions for generating the progress bars
pub mod progress_bar;
/// Disjoint set for clustering
pub mod union_find;
