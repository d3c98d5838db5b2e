//! Integration test suite for gobl task discovery.
//!
//! # Test Categories
//!
//! - `registry`: Listing across roots, failure isolation, caching through the facade
//! - `shell`: Real `sh` descriptors driven through `ShellRunner` (Unix only)
//! - `watching`: Descriptor edits invalidating the cache


mod registry;
mod watching;
