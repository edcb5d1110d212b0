//! Control descriptors
//!
//! A [`ControlDescriptor`] is the canonical, serializable description of one
//! UI control of an endpoint. The host renders its panel from these and binds
//! the user's values positionally to the processing function.
//!
//! Toolkit-native controls enter through [`describe`], which is the only place
//! that knows about toolkit conventions. New control kinds are added as new
//! variants here.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How audio crosses the endpoint boundary.
///
/// Only [`PathMode::Filepath`] is accepted by the contract; the other modes
/// exist so that toolkit exports and hand-written JSON can be rejected with a
/// precise error instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    #[default]
    Filepath,
    Numpy,
    Bytes,
}

impl PathMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathMode::Filepath => "filepath",
            PathMode::Numpy => "numpy",
            PathMode::Bytes => "bytes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlDescriptor {
    AudioInput {
        label: String,
        #[serde(default)]
        path_mode: PathMode,
    },
    AudioOutput {
        label: String,
        #[serde(default)]
        path_mode: PathMode,
    },
    Slider {
        label: String,
        minimum: f64,
        maximum: f64,
        step: f64,
        default: f64,
    },
    Textbox {
        label: String,
        #[serde(default)]
        default: String,
    },
}

impl ControlDescriptor {
    pub fn audio_input(label: impl Into<String>) -> Self {
        Self::AudioInput {
            label: label.into(),
            path_mode: PathMode::Filepath,
        }
    }

    pub fn audio_output(label: impl Into<String>) -> Self {
        Self::AudioOutput {
            label: label.into(),
            path_mode: PathMode::Filepath,
        }
    }

    pub fn slider(label: impl Into<String>, minimum: f64, maximum: f64, step: f64, default: f64) -> Self {
        Self::Slider {
            label: label.into(),
            minimum,
            maximum,
            step,
            default,
        }
    }

    pub fn textbox(label: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Textbox {
            label: label.into(),
            default: default.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::AudioInput { label, .. }
            | Self::AudioOutput { label, .. }
            | Self::Slider { label, .. }
            | Self::Textbox { label, .. } => label,
        }
    }

    /// The serialized `kind` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::AudioInput { .. } => "audio_input",
            Self::AudioOutput { .. } => "audio_output",
            Self::Slider { .. } => "slider",
            Self::Textbox { .. } => "textbox",
        }
    }

    pub fn is_audio_input(&self) -> bool {
        matches!(self, Self::AudioInput { .. })
    }

    pub fn is_audio_output(&self) -> bool {
        matches!(self, Self::AudioOutput { .. })
    }

    /// Kind of value this control supplies at invocation time.
    ///
    /// `None` for audio controls: the input path is bound separately and the
    /// output is produced by the processing function.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Slider { .. } => Some(ValueKind::Number),
            Self::Textbox { .. } => Some(ValueKind::Text),
            Self::AudioInput { .. } | Self::AudioOutput { .. } => None,
        }
    }

    /// Value used when the host does not send one.
    pub fn default_value(&self) -> Option<ControlValue> {
        match self {
            Self::Slider { default, .. } => Some(ControlValue::Number(*default)),
            Self::Textbox { default, .. } => Some(ControlValue::Text(default.clone())),
            Self::AudioInput { .. } | Self::AudioOutput { .. } => None,
        }
    }

    /// Check the per-kind invariants. Bounds are never coerced.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AudioInput { label, path_mode } | Self::AudioOutput { label, path_mode } => {
                if *path_mode != PathMode::Filepath {
                    return Err(Error::InvalidAudioMode {
                        label: label.clone(),
                        mode: path_mode.as_str().to_string(),
                    });
                }
                Ok(())
            }
            Self::Slider {
                label,
                minimum,
                maximum,
                step,
                default,
            } => {
                if !minimum.is_finite() || !maximum.is_finite() {
                    return Err(Error::InvalidRange {
                        label: label.clone(),
                        reason: "bounds must be finite".into(),
                    });
                }
                if minimum > maximum {
                    return Err(Error::InvalidRange {
                        label: label.clone(),
                        reason: format!("minimum {} exceeds maximum {}", minimum, maximum),
                    });
                }
                if !step.is_finite() || *step <= 0.0 {
                    return Err(Error::InvalidRange {
                        label: label.clone(),
                        reason: format!("step must be positive, got {}", step),
                    });
                }
                if !(default >= minimum && default <= maximum) {
                    return Err(Error::InvalidDefault {
                        label: label.clone(),
                        default: *default,
                        minimum: *minimum,
                        maximum: *maximum,
                    });
                }
                Ok(())
            }
            Self::Textbox { .. } => Ok(()),
        }
    }
}

/// Kind of a run-time control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Text,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Number => write!(f, "number"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

/// Value of one non-audio control, as sent by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Number(f64),
    Text(String),
}

impl ControlValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for ControlValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for ControlValue {
    fn from(n: f32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for ControlValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i64> for ControlValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<String> for ControlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ControlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Whether a toolkit audio widget reads or produces audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlRole {
    #[default]
    Input,
    Output,
}

/// A control as the UI toolkit exports it.
///
/// Field names follow the toolkit's own JSON (`type` is the audio transport
/// mode, `value` the initial value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitControl {
    pub component: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub role: ControlRole,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ControlValue>,
}

impl ToolkitControl {
    pub fn new(component: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            label: label.into(),
            role: ControlRole::Input,
            mode: None,
            minimum: None,
            maximum: None,
            step: None,
            value: None,
        }
    }

    pub fn audio(label: impl Into<String>) -> Self {
        Self::new("audio", label).mode("filepath")
    }

    pub fn slider(label: impl Into<String>, minimum: f64, maximum: f64, step: f64, value: f64) -> Self {
        let mut control = Self::new("slider", label);
        control.minimum = Some(minimum);
        control.maximum = Some(maximum);
        control.step = Some(step);
        control.value = Some(ControlValue::Number(value));
        control
    }

    pub fn textbox(label: impl Into<String>, value: impl Into<String>) -> Self {
        let mut control = Self::new("textbox", label);
        control.value = Some(ControlValue::Text(value.into()));
        control
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn output(mut self) -> Self {
        self.role = ControlRole::Output;
        self
    }
}

/// Map a toolkit control to its canonical descriptor.
///
/// Pure: no clamping, no coercion of bounds. Missing slider fields fall back
/// to the toolkit defaults (`0..=100`, step `1`, value = minimum).
pub fn describe(control: &ToolkitControl) -> Result<ControlDescriptor> {
    let label = control.label.trim().to_string();

    let descriptor = match control.component.trim().to_ascii_lowercase().as_str() {
        "audio" => {
            let mode = control.mode.as_deref().unwrap_or("filepath");
            if mode != "filepath" {
                return Err(Error::InvalidAudioMode {
                    label,
                    mode: mode.to_string(),
                });
            }
            match control.role {
                ControlRole::Input => ControlDescriptor::audio_input(label),
                ControlRole::Output => ControlDescriptor::audio_output(label),
            }
        }
        "slider" => {
            let minimum = control.minimum.unwrap_or(0.0);
            let maximum = control.maximum.unwrap_or(100.0);
            let step = control.step.unwrap_or(1.0);
            let default = match &control.value {
                None => minimum,
                Some(ControlValue::Number(n)) => *n,
                Some(ControlValue::Text(text)) => {
                    return Err(Error::InvalidRange {
                        label,
                        reason: format!("default must be numeric, got '{}'", text),
                    })
                }
            };
            ControlDescriptor::slider(label, minimum, maximum, step, default)
        }
        "textbox" => {
            let default = match &control.value {
                None => String::new(),
                Some(ControlValue::Text(text)) => text.clone(),
                Some(ControlValue::Number(n)) => n.to_string(),
            };
            ControlDescriptor::textbox(label, default)
        }
        _ => return Err(Error::UnsupportedControlKind(control.component.clone())),
    };

    descriptor.validate()?;
    Ok(descriptor)
}

impl TryFrom<&ToolkitControl> for ControlDescriptor {
    type Error = Error;

    fn try_from(control: &ToolkitControl) -> Result<Self> {
        describe(control)
    }
}
