//! Built-in processors: filtering, fan-out, spectral analysis, scripting.

mod axis_split;
mod lowpass;
mod script_map;
mod spectrum;
mod threshold;

pub use axis_split::AxisSplit;
pub use lowpass::LowPassFilter;
pub use script_map::ScriptMap;
pub use spectrum::Spectrum;
pub use threshold::ThresholdFilter;
