//! Endpoint contract builder
//!
//! Turns ordered input descriptors, an output descriptor, a processing function
//! and a model card into the two operations a host consumes:
//!
//! - **metadata**: `{card, controls}` document, computed once at build time
//! - **process**: run the function on an audio path plus control values
//!
//! All shape checks happen in [`build`]; a contract that exists is valid.

use crate::card::ModelCard;
use crate::context::JobContext;
use crate::control::{ControlDescriptor, ControlValue, ToolkitControl, ValueKind};
use crate::error::{Error, Result};
use crate::process::{ParamKind, ProcessFn, Processor};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// The metadata document served to the host.
///
/// `controls` order is the rendered order and the positional binding order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    pub card: ModelCard,
    pub controls: Vec<ControlDescriptor>,
}

/// One process invocation as sent by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub audio_path: PathBuf,
    /// One value per non-audio control, in descriptor order
    #[serde(default)]
    pub values: Vec<ControlValue>,
}

impl ProcessRequest {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, value: impl Into<ControlValue>) -> Self {
        self.values.push(value.into());
        self
    }
}

/// A validated, immutable endpoint definition.
///
/// Clone is cheap (Arc clones).
#[derive(Clone)]
pub struct EndpointContract {
    metadata: Arc<EndpointMetadata>,
    document: Arc<serde_json::Value>,
    output: ControlDescriptor,
    processor: Arc<dyn Processor>,
}

impl std::fmt::Debug for EndpointContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointContract")
            .field("metadata", &self.metadata)
            .field("output", &self.output)
            .field("arity", &self.processor.arity())
            .finish()
    }
}

/// Validate and assemble an endpoint contract.
///
/// Checks, in order: each descriptor's own invariants, exactly one audio
/// input, an audio output, function arity, and parameter kinds against
/// descriptor kinds position by position. The first failure is returned.
pub fn build<M, F>(
    inputs: Vec<ControlDescriptor>,
    output: ControlDescriptor,
    process_fn: F,
    card: ModelCard,
) -> Result<EndpointContract>
where
    F: ProcessFn<M>,
{
    EndpointContract::from_parts(inputs, output, process_fn.into_processor(), card)
}

fn accepts(param: ParamKind, descriptor: &ControlDescriptor) -> bool {
    match param {
        ParamKind::AudioPath => descriptor.is_audio_input(),
        ParamKind::Value(kind) => descriptor.value_kind() == Some(kind),
    }
}

impl EndpointContract {
    pub fn from_parts(
        inputs: Vec<ControlDescriptor>,
        output: ControlDescriptor,
        processor: Arc<dyn Processor>,
        card: ModelCard,
    ) -> Result<Self> {
        for descriptor in inputs.iter().chain(std::iter::once(&output)) {
            descriptor.validate()?;
        }

        match inputs.iter().filter(|d| d.is_audio_input()).count() {
            0 => return Err(Error::MissingAudioInput),
            1 => {}
            count => return Err(Error::MultipleAudioInputs { count }),
        }

        if !output.is_audio_output() {
            return Err(Error::InvalidOutputKind {
                kind: output.kind_name().to_string(),
            });
        }

        if processor.arity() != inputs.len() {
            return Err(Error::ArityMismatch {
                expected: inputs.len(),
                actual: processor.arity(),
            });
        }

        for (position, (param, descriptor)) in
            processor.signature().iter().zip(inputs.iter()).enumerate()
        {
            if !accepts(*param, descriptor) {
                return Err(Error::SignatureMismatch {
                    position,
                    label: descriptor.label().to_string(),
                    expected: param.to_string(),
                    found: descriptor.kind_name().to_string(),
                });
            }
        }

        let card = card.canonicalize();
        let metadata = EndpointMetadata {
            card,
            controls: inputs,
        };
        let document = serde_json::to_value(&metadata)
            .map_err(|e| Error::Processing(format!("metadata serialization failed: {}", e)))?;

        tracing::info!(
            "Built endpoint '{}' ({} controls)",
            metadata.card.name,
            metadata.controls.len()
        );

        Ok(Self {
            metadata: Arc::new(metadata),
            document: Arc::new(document),
            output,
            processor,
        })
    }

    pub fn builder<M, F: ProcessFn<M>>(process_fn: F) -> EndpointBuilder {
        EndpointBuilder::new(process_fn)
    }

    pub fn card(&self) -> &ModelCard {
        &self.metadata.card
    }

    pub fn inputs(&self) -> &[ControlDescriptor] {
        &self.metadata.controls
    }

    pub fn output(&self) -> &ControlDescriptor {
        &self.output
    }

    /// Metadata operation. Deterministic and side-effect free.
    pub fn metadata(&self) -> &EndpointMetadata {
        &self.metadata
    }

    /// Metadata operation as a JSON document (cached at build time).
    pub fn metadata_document(&self) -> &serde_json::Value {
        &self.document
    }

    /// Value kinds expected by the process operation, in order.
    pub fn value_kinds(&self) -> Vec<ValueKind> {
        self.metadata
            .controls
            .iter()
            .filter_map(ControlDescriptor::value_kind)
            .collect()
    }

    /// Request pre-filled with every control's default value.
    pub fn default_request(&self, audio_path: impl Into<PathBuf>) -> ProcessRequest {
        ProcessRequest {
            audio_path: audio_path.into(),
            values: self
                .metadata
                .controls
                .iter()
                .filter_map(ControlDescriptor::default_value)
                .collect(),
        }
    }

    /// Check value count and kinds against the controls, without running anything.
    pub fn check_values(&self, values: &[ControlValue]) -> Result<()> {
        let kinds = self.value_kinds();
        if values.len() != kinds.len() {
            return Err(Error::InvalidArguments(format!(
                "expected {} control values, got {}",
                kinds.len(),
                values.len()
            )));
        }
        for (index, (value, kind)) in values.iter().zip(kinds).enumerate() {
            if value.kind() != kind {
                return Err(Error::InvalidArguments(format!(
                    "value {} should be {}, got {}",
                    index + 1,
                    kind,
                    value.kind()
                )));
            }
        }
        Ok(())
    }

    /// Process operation.
    ///
    /// Runs the processing function to completion on the caller's thread.
    /// A context cancelled before the call never reaches the function; one
    /// cancelled during the call has its result discarded. Errors and panics
    /// from the function come back as [`Error::Processing`] (or
    /// [`Error::IoWrite`] when the function reports a write failure).
    pub fn process(&self, ctx: &JobContext, request: ProcessRequest) -> Result<PathBuf> {
        let job = ctx.job_id();
        if ctx.is_cancelled() {
            tracing::debug!("{} cancelled before start", job);
            return Err(Error::Cancelled(job.as_u64()));
        }

        self.check_values(&request.values)?;

        tracing::debug!(
            "{} invoking '{}' on {}",
            job,
            self.metadata.card.name,
            request.audio_path.display()
        );
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.processor
                .call(ctx, request.audio_path, &request.values)
        }));

        let result = match outcome {
            Ok(Ok(path)) => Ok(path),
            Ok(Err(e)) => Err(classify(e, ctx.is_cancelled())),
            Err(payload) => Err(Error::Processing(panic_message(payload.as_ref()))),
        };

        if ctx.is_cancelled() {
            tracing::info!("{} cancelled while running, result discarded", job);
            return Err(Error::Cancelled(job.as_u64()));
        }

        match &result {
            Ok(path) => tracing::info!(
                "{} finished in {:.1}ms -> {}",
                job,
                started.elapsed().as_secs_f64() * 1000.0,
                path.display()
            ),
            Err(e) => tracing::warn!("{} failed: {}", job, e),
        }

        result
    }
}

/// Only run-time kinds leave the process operation. `Cancelled` is kept
/// only when the job really was cancelled.
fn classify(error: Error, cancelled: bool) -> Error {
    match error {
        Error::Processing(_) | Error::IoWrite(_) | Error::InvalidArguments(_) => error,
        Error::Cancelled(_) if cancelled => error,
        other => Error::Processing(other.to_string()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "processing function panicked".to_string()
    }
}

/// Fluent alternative to [`build`].
///
/// # Example
/// ```ignore
/// let contract = EndpointContract::builder(|audio: PathBuf, semitones: f64| shift(audio, semitones))
///     .card(ModelCard::new("Pitch Shifter", "Shifts pitch", "HARP"))
///     .input(ControlDescriptor::audio_input("Input"))
///     .input(ControlDescriptor::slider("Semitones", -24.0, 24.0, 1.0, 0.0))
///     .output(ControlDescriptor::audio_output("Output"))
///     .build()?;
/// ```
pub struct EndpointBuilder {
    card: ModelCard,
    inputs: Vec<ControlDescriptor>,
    output: Option<ControlDescriptor>,
    processor: Arc<dyn Processor>,
}

impl EndpointBuilder {
    pub fn new<M, F: ProcessFn<M>>(process_fn: F) -> Self {
        Self {
            card: ModelCard::default(),
            inputs: Vec::new(),
            output: None,
            processor: process_fn.into_processor(),
        }
    }

    pub fn card(mut self, card: ModelCard) -> Self {
        self.card = card;
        self
    }

    pub fn input(mut self, descriptor: ControlDescriptor) -> Self {
        self.inputs.push(descriptor);
        self
    }

    pub fn inputs(mut self, descriptors: impl IntoIterator<Item = ControlDescriptor>) -> Self {
        self.inputs.extend(descriptors);
        self
    }

    /// Describe a toolkit control and append it to the inputs.
    pub fn control(mut self, control: &ToolkitControl) -> Result<Self> {
        self.inputs.push(crate::control::describe(control)?);
        Ok(self)
    }

    pub fn output(mut self, descriptor: ControlDescriptor) -> Self {
        self.output = Some(descriptor);
        self
    }

    pub fn build(self) -> Result<EndpointContract> {
        let output = self.output.ok_or_else(|| Error::InvalidOutputKind {
            kind: "none".into(),
        })?;
        EndpointContract::from_parts(self.inputs, output, self.processor, self.card)
    }
}
