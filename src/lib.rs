#[macro_use]
extern crate tracing;

pub mod layout;
pub mod utils;
