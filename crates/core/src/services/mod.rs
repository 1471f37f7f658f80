//! Extraction services: the backend trait and registry, concrete backends,
//! and instruction normalization.

pub mod backends;
pub mod extraction;
pub mod normalize;
