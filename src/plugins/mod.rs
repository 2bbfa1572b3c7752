//! Built-in plugin set.
//!
//! Sources, decoders, processors and sinks that ship with the crate,
//! installed into a [`PluginRegistry`](crate::plugin::PluginRegistry) by
//! [`register_builtins`]. Embedders can register additional factories next
//! to these; name collisions replace the built-in (last wins).

pub mod decoders;
pub mod processors;
pub mod readers;
pub mod visualizers;

use crate::plugin::{Decoder, Processor, PluginRegistry, Reader, Visualizer};

/// Install every built-in factory into `registry`.
pub fn register_builtins(registry: &mut PluginRegistry) {
    registry.register_reader(
        "file",
        Box::new(|cfg| Ok(Box::new(readers::FileReader::from_config(cfg)?) as Box<dyn Reader>)),
    );
    registry.register_reader(
        "serial",
        Box::new(|cfg| Ok(Box::new(readers::SerialReader::from_config(cfg)?) as Box<dyn Reader>)),
    );
    registry.register_reader(
        "mock",
        Box::new(|cfg| Ok(Box::new(readers::MockReader::from_config(cfg)?) as Box<dyn Reader>)),
    );

    registry.register_decoder(
        "imu_frames",
        Box::new(|cfg| {
            Ok(Box::new(decoders::ImuFrameDecoder::from_config(cfg)?) as Box<dyn Decoder>)
        }),
    );
    registry.register_decoder(
        "text_lines",
        Box::new(|cfg| Ok(Box::new(decoders::LineDecoder::from_config(cfg)?) as Box<dyn Decoder>)),
    );

    registry.register_processor(
        "lowpass",
        Box::new(|cfg| {
            Ok(Box::new(processors::LowPassFilter::from_config(cfg)?) as Box<dyn Processor>)
        }),
    );
    registry.register_processor(
        "axis_split",
        Box::new(|cfg| Ok(Box::new(processors::AxisSplit::from_config(cfg)?) as Box<dyn Processor>)),
    );
    registry.register_processor(
        "threshold",
        Box::new(|cfg| {
            Ok(Box::new(processors::ThresholdFilter::from_config(cfg)?) as Box<dyn Processor>)
        }),
    );
    registry.register_processor(
        "spectrum",
        Box::new(|cfg| Ok(Box::new(processors::Spectrum::from_config(cfg)?) as Box<dyn Processor>)),
    );
    registry.register_processor(
        "script_map",
        Box::new(|cfg| Ok(Box::new(processors::ScriptMap::from_config(cfg)?) as Box<dyn Processor>)),
    );

    registry.register_visualizer(
        "console",
        Box::new(|cfg| {
            Ok(Box::new(visualizers::ConsoleSink::from_config(cfg)?) as Box<dyn Visualizer>)
        }),
    );
    registry.register_visualizer(
        "csv_recorder",
        Box::new(|cfg| {
            Ok(Box::new(visualizers::CsvRecorder::from_config(cfg)?) as Box<dyn Visualizer>)
        }),
    );
}
