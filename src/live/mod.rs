//! Live push updates: envelope parsing, transports and the channel lifecycle

pub mod channel;
pub mod event;
pub mod source;
