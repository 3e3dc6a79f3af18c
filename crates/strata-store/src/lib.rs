//! Fileset metadata model and storage for Strata.
//!
//! A fileset is either a [`Primitive`] layer holding path-indexed entries, or
//! a [`Composite`] that points at other filesets in order. Metadata is keyed by
//! a [`FilesetId`](strata_types::FilesetId) derived from its encoded content.
//!
//! # Storage Backends
//!
//! All backends implement the [`MetadataStore`] trait:
//!
//! - [`InMemoryMetadataStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Metadata is immutable once written. Every write produces an id for the
//!    written content; nothing is updated in place.
//! 2. Concurrent reads are always safe.
//! 3. Each write carries a time-to-live. Reclaiming expired metadata is left
//!    to the caller.
//! 4. All lookup errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod metadata;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMetadataStore;
pub use metadata::{Composite, FileEntry, Metadata, Primitive};
pub use traits::MetadataStore;
