/// Router Module Index
///
/// The public router needs no token at all. The api router is wrapped in the access gate
/// by `create_router`; the gate itself lets GET reads and login through.

/// Health check and the static `/uploads` directory.
pub mod public;

/// Everything under `/api`: login, article reads and writes, image upload.
pub mod api;
