//! Integration test crate for Texel.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the cache through the headless device to verify the crates
//! work together.


#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod residency;

#[cfg(test)]
mod persistence;
