//! Marker model, the authoritative store and the identity reconciler

pub mod marker;
pub mod reconcile;
pub mod store;
