//! Built-in decoders: framed binary IMU streams and delimited text rows.

pub mod imu_frames;
mod text_lines;

pub use imu_frames::ImuFrameDecoder;
pub use text_lines::LineDecoder;
