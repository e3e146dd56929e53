#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod model;
pub mod sequencer;
pub mod time;

pub use error::Error;
pub use time::Clock;
