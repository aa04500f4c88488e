//! Typed command channel to the map rendering surface

pub mod command;
pub mod surface;
