mod commands;
mod engine;
mod probe;
mod progress;
mod wrapper;

pub use commands::*;
pub use engine::*;
pub use probe::*;
pub use progress::*;
pub use wrapper::*;
