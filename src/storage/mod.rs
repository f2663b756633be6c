//! Local scratch storage for in-flight uploads

pub mod scratch;

pub use scratch::TemporaryArtifact;
