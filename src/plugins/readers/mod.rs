//! Built-in readers: file playback, live serial links, synthetic frames.

mod file;
mod mock;
mod serial;

pub use file::FileReader;
pub use mock::MockReader;
pub use serial::SerialReader;
