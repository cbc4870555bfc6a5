//! Timestamp helpers shared by the artifact builder and persistence.

pub mod timestamps;

pub use timestamps::{file_timestamp, iso_timestamp, Timestamp};
