#![allow(dead_code)]

pub mod sources;
pub mod status;
pub mod strategies;

pub use sources::*;
pub use status::*;
pub use strategies::*;
