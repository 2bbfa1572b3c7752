//! Built-in sinks: console output and CSV recording.

mod console;
mod csv_recorder;

pub use console::ConsoleSink;
pub use csv_recorder::CsvRecorder;
