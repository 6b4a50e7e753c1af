//! Protocol-specific stat adapters

pub mod marinade;

pub use marinade::{MarinadeAdapter, MarinadeClient, MarinadeStats};
