// Poster composition service: copy parsing, the blocking compose pipeline,
// and the HTTP handlers that drive it.

pub mod compose;
pub mod extractor;
pub mod handlers;
