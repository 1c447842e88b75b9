extern crate self as bobtail_core;

pub mod log;
pub mod panic;
pub mod time;
