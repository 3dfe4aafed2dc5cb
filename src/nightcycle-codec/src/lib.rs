#[macro_use]
extern crate serde;

mod error;
pub use error::CodecError;

mod monitoring;
pub use monitoring::*;
