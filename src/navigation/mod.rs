//! Position providers, nearest-marker selection and the navigation tracker

pub mod nearest;
pub mod provider;
pub mod tracker;
