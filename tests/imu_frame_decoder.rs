//! Property tests for the framed IMU decoder's buffering discipline.

mod common;

use proptest::prelude::*;
use sensorvis_rs::config::PluginConfig;
use sensorvis_rs::plugin::Decoder as _;
use sensorvis_rs::plugins::decoders::{imu_frames, ImuFrameDecoder};
use sensorvis_rs::sample::SensorSample;

fn decoder() -> ImuFrameDecoder {
    ImuFrameDecoder::from_config(&PluginConfig::new().with("sensor_id", "imu1")).unwrap()
}

fn decode_all<C: AsRef<[u8]>>(dec: &mut ImuFrameDecoder, chunks: &[C]) -> Vec<SensorSample> {
    let mut out = Vec::new();
    for chunk in chunks {
        dec.decode(chunk.as_ref(), &mut out).unwrap();
    }
    out
}

/// Channel payloads must match regardless of where the stream was cut.
fn assert_same_payloads(a: &[SensorSample], b: &[SensorSample]) {
    assert_eq!(a.len(), b.len());
    for (left, right) in a.iter().zip(b) {
        assert_eq!(left.sensor_id, right.sensor_id);
        assert_eq!(left.data_type, right.data_type);
        assert_eq!(left.values, right.values);
        assert_eq!(left.units, right.units);
    }
}

proptest! {
    /// Split-packet invariant: for any frame content and any split point,
    /// decoding the two halves equals decoding the whole frame.
    #[test]
    fn split_point_never_changes_the_sample(
        x in -16.0f64..16.0,
        y in -16.0f64..16.0,
        z in -16.0f64..16.0,
        split in 0usize..=imu_frames::FRAME_LEN,
    ) {
        let frame = imu_frames::encode_acc(x, y, z, 16.0, 25.0);

        let whole = decode_all(&mut decoder(), &[&frame]);
        let halves = decode_all(&mut decoder(), &[&frame[..split], &frame[split..]]);

        prop_assert_eq!(whole.len(), 1);
        assert_same_payloads(&whole, &halves);
    }

    /// Any number of frames in one chunk decode once each, in order.
    #[test]
    fn frames_in_one_chunk_decode_in_order(values in prop::collection::vec(-180.0f64..180.0, 1..8)) {
        let mut stream = Vec::new();
        for &v in &values {
            stream.extend_from_slice(&imu_frames::encode_angle(v, 0.0, 0.0));
        }

        let out = decode_all(&mut decoder(), &[&stream]);
        prop_assert_eq!(out.len(), values.len());
        for (sample, &v) in out.iter().zip(&values) {
            let roll = sample.value_f64("roll", f64::NAN);
            prop_assert!((roll - v).abs() < 0.02, "roll {} != {}", roll, v);
        }
    }

    /// Leading garbage of any shape never loses the following frame, as
    /// long as it contains no byte that parses as a valid frame start.
    #[test]
    fn garbage_prefix_is_resynced_past(garbage in prop::collection::vec(0u8..0x55, 0..24)) {
        let mut stream = garbage.clone();
        stream.extend_from_slice(&imu_frames::encode_acc(1.0, 2.0, 3.0, 16.0, 25.0));

        let out = decode_all(&mut decoder(), &[&stream]);
        prop_assert_eq!(out.len(), 1);
        let x = out[0].value_f64("x", f64::NAN);
        prop_assert!((x - 1.0).abs() < 1e-2);
    }

    /// Chopping one stream into arbitrary chunk sizes never changes the
    /// decoded sequence.
    #[test]
    fn arbitrary_chunking_is_transparent(chunk_sizes in prop::collection::vec(1usize..16, 1..12)) {
        let mut stream = Vec::new();
        for i in 0..4 {
            stream.extend_from_slice(&imu_frames::encode_gyro(
                f64::from(i) * 10.0,
                0.0,
                -f64::from(i),
                2000.0,
                25.0,
            ));
        }

        let whole = decode_all(&mut decoder(), &[&stream]);

        let mut chunked = Vec::new();
        let mut dec = decoder();
        let mut offset = 0;
        for &size in &chunk_sizes {
            if offset >= stream.len() {
                break;
            }
            let end = (offset + size).min(stream.len());
            dec.decode(&stream[offset..end], &mut chunked).unwrap();
            offset = end;
        }
        dec.decode(&stream[offset.min(stream.len())..], &mut chunked).unwrap();

        prop_assert_eq!(whole.len(), 4);
        assert_same_payloads(&whole, &chunked);
    }
}

#[test]
fn empty_chunk_is_a_noop() {
    let mut dec = decoder();
    let mut out = Vec::new();
    dec.decode(b"", &mut out).unwrap();
    assert!(out.is_empty());
}

/// The spec's end-to-end resync scenario: a frame split across chunks, a
/// stray byte, then a second frame completing later — two samples total,
/// in order, no error.
#[test]
fn split_then_stray_then_second_frame() {
    let frame1 = imu_frames::encode_acc(1.0, 0.0, 0.0, 16.0, 25.0);
    let frame2 = imu_frames::encode_acc(2.0, 0.0, 0.0, 16.0, 25.0);

    let chunk1 = frame1[..5].to_vec();
    let mut chunk2 = frame1[5..].to_vec();
    chunk2.push(0xFF); // stray byte needing resync
    chunk2.extend_from_slice(&frame2[..3]);
    let chunk3 = frame2[3..].to_vec();

    let mut dec = decoder();
    let out = decode_all(&mut dec, &[&chunk1, &chunk2, &chunk3]);

    assert_eq!(out.len(), 2);
    common::assert_float_eq(out[0].value_f64("x", 0.0), 1.0, 1e-2);
    common::assert_float_eq(out[1].value_f64("x", 0.0), 2.0, 1e-2);
}
