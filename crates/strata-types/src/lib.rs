//! Foundation types for Strata.
//!
//! Every other Strata crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`FilesetId`] — Content-derived fileset handle (BLAKE3 hash)
//! - [`PathRange`] — Half-open range of paths used to shard work

pub mod error;
pub mod id;
pub mod path_range;

pub use error::TypeError;
pub use id::FilesetId;
pub use path_range::PathRange;
