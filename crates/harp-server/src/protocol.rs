//! Host/endpoint wire messages.
//!
//! Every message is a JSON object with a `type` field naming the variant.

use crate::queue::JobStatus;
use harp_core::{ControlValue, ErrorReport, JobId, ProcessRequest};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host to endpoint message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Fetch the metadata document
    Metadata,
    /// Queue a process invocation
    Process {
        audio_path: PathBuf,
        #[serde(default)]
        values: Vec<ControlValue>,
    },
    Cancel {
        job: JobId,
    },
    Status {
        job: JobId,
    },
    Shutdown,
}

impl HostMessage {
    pub fn process(request: ProcessRequest) -> Self {
        HostMessage::Process {
            audio_path: request.audio_path,
            values: request.values,
        }
    }
}

/// Endpoint to host message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointMessage {
    Metadata { document: serde_json::Value },
    Enqueued { job: JobId },
    Status(JobStatus),
    Cancel { job: JobId, accepted: bool },
    Error(ErrorReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::JobState;
    use serde_json::json;

    #[test]
    fn test_host_message_wire_shape() {
        let msg = HostMessage::process(ProcessRequest::new("/tmp/a.wav").value(3.0).value("hi"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "process", "audio_path": "/tmp/a.wav", "values": [3.0, "hi"]})
        );

        let back: HostMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_host_message_parsing() {
        let msg: HostMessage = serde_json::from_str(r#"{"type":"cancel","job":7}"#).unwrap();
        assert_eq!(msg, HostMessage::Cancel { job: JobId::from_raw(7) });

        let msg: HostMessage =
            serde_json::from_str(r#"{"type":"process","audio_path":"in.wav"}"#).unwrap();
        assert_eq!(
            msg,
            HostMessage::Process {
                audio_path: "in.wav".into(),
                values: Vec::new()
            }
        );

        assert!(serde_json::from_str::<HostMessage>(r#"{"type":"reboot"}"#).is_err());
    }

    #[test]
    fn test_endpoint_message_wire_shape() {
        let status = EndpointMessage::Status(JobStatus {
            job: JobId::from_raw(2),
            state: JobState::Succeeded,
            output: Some("/tmp/out.wav".into()),
            error: None,
        });
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"type": "status", "job": 2, "state": "succeeded", "output": "/tmp/out.wav"})
        );

        let error = EndpointMessage::Error(ErrorReport {
            kind: "unknown_job".into(),
            message: "Unknown job: Job(9)".into(),
        });
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "unknown_job");
        let back: EndpointMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, error);
    }
}
