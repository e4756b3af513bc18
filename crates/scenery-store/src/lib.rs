//! Persisted tile container.
//!
//! A store file is a flat sequence of tagged atoms: the token dictionary,
//! the raster layer directory, one atom per layer and the map. Readers
//! skip atoms they do not know, so newer writers can add atoms freely.
//! Enumeration ids are always rewritten into the reader's vocabulary.

pub mod atom;
pub mod store;

pub use store::SceneryStore;
