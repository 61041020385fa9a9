//! Collaborator seams: the relational store and the evidence upload sink.

pub mod datastore;
pub mod evidence;

pub use datastore::TaskDatastore;
pub use evidence::{EvidenceSink, EvidenceUpload};
