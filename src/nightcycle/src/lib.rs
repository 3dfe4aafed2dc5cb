#[macro_use]
extern crate log;

mod input;
pub use input::load_monitoring_files;

mod dump;
pub use dump::write_minutes;

pub use nightcycle_algos as algo;
