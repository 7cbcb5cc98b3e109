// src/fetch/mod.rs
// =============================================================================
// This module gets bytes from the network onto the disk.
//
// Submodules:
// - http: the GET itself (timeout, status check, buffered or streamed body)
// - disk: creating directories and writing files under the mirror root
// =============================================================================

mod disk;
mod http;

pub use disk::write_file;
pub use http::Fetcher;
