//! Built-in gain endpoint served by the `harp-endpoint` binary.

use harp_core::{build, ControlDescriptor, EndpointContract, ModelCard};
use harp_export::{load_audio, OutputDir};
use std::path::PathBuf;

pub const GAIN_MIN_DB: f64 = -24.0;
pub const GAIN_MAX_DB: f64 = 24.0;

/// Applies a fixed gain in decibels and writes the result into `output`.
pub fn gain_endpoint(output: OutputDir) -> harp_core::Result<EndpointContract> {
    build(
        vec![
            ControlDescriptor::audio_input("Input Audio"),
            ControlDescriptor::slider("Gain (dB)", GAIN_MIN_DB, GAIN_MAX_DB, 0.5, 0.0),
        ],
        ControlDescriptor::audio_output("Output Audio"),
        move |audio: PathBuf, gain_db: f64| -> harp_export::Result<PathBuf> {
            let mut signal = load_audio(&audio)?;
            let gain = 10f32.powf(gain_db as f32 / 20.0);
            signal.map_samples(|s| s * gain);
            output.save(&signal)
        },
        ModelCard::new("Gain", "Scales the input by a fixed gain in decibels", "HARP")
            .tags(["gain", "utility", "example"])
            .version(env!("CARGO_PKG_VERSION")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::{JobContext, ProcessRequest};
    use harp_export::{BitDepth, Signal};

    #[test]
    fn test_gain_endpoint_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let contract = gain_endpoint(OutputDir::new(tmp.path())).unwrap();

        let doc = contract.metadata_document();
        assert_eq!(doc["card"]["name"], "Gain");
        assert_eq!(doc["controls"][0]["kind"], "audio_input");
        assert_eq!(doc["controls"][1]["kind"], "slider");
        assert_eq!(doc["controls"][1]["default"], 0.0);
    }

    #[test]
    fn test_gain_endpoint_scales_audio() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = OutputDir::new(tmp.path().join("in")).bit_depth(BitDepth::Float32);
        let input = inputs
            .save(&Signal::mono(vec![0.5, -0.25, 0.0], 22050).unwrap())
            .unwrap();

        let contract = gain_endpoint(OutputDir::new(tmp.path().join("out"))).unwrap();
        let out = contract
            .process(
                &JobContext::detached(),
                ProcessRequest::new(&input).value(-6.020599913279624),
            )
            .unwrap();

        assert!(out.starts_with(tmp.path().join("out")));
        let result = load_audio(&out).unwrap();
        let samples = &result.channels()[0];
        assert!((samples[0] - 0.25).abs() < 1e-4);
        assert!((samples[1] + 0.125).abs() < 1e-4);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn test_gain_endpoint_missing_input_is_processing_error() {
        let tmp = tempfile::tempdir().unwrap();
        let contract = gain_endpoint(OutputDir::new(tmp.path())).unwrap();
        let err = contract
            .process(
                &JobContext::detached(),
                ProcessRequest::new(tmp.path().join("missing.wav")).value(0.0),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "processing_error");
    }
}
