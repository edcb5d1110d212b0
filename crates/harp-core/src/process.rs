//! Processing function adapters
//!
//! Endpoint authors write ordinary functions:
//!
//! ```ignore
//! fn pitch_shift(audio: PathBuf, semitones: f64) -> Result<PathBuf, harp_core::Error> { ... }
//! ```
//!
//! or the cooperative form that receives the job context first:
//!
//! ```ignore
//! fn separate(ctx: JobContext, audio: PathBuf, stems: i32) -> Result<PathBuf, harp_core::Error> {
//!     for chunk in chunks {
//!         if ctx.is_cancelled() { return Err("cancelled".into()); }
//!         ...
//!     }
//! }
//! ```
//!
//! [`ProcessFn`] erases either form into a [`Processor`] that knows its
//! signature, so the contract builder can check arity and parameter kinds
//! once at startup.

use crate::context::JobContext;
use crate::control::{ControlValue, ValueKind};
use crate::error::{Error, Result};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

/// Kind of one processing function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Position 0: path of the input audio file
    AudioPath,
    Value(ValueKind),
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKind::AudioPath => write!(f, "audio path"),
            ParamKind::Value(kind) => write!(f, "{}", kind),
        }
    }
}

/// A parameter type a processing function may take for a non-audio control.
pub trait FromControlValue: Sized + 'static {
    const KIND: ValueKind;

    fn from_control_value(value: &ControlValue) -> Option<Self>;
}

impl FromControlValue for f64 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromControlValue for f32 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        value.as_f64().map(|n| n as f32)
    }
}

/// Integral value within `[min, max]`, or `None`.
fn integral(value: &ControlValue, min: f64, max: f64) -> Option<f64> {
    value
        .as_f64()
        .filter(|n| n.is_finite() && n.fract() == 0.0 && *n >= min && *n <= max)
}

impl FromControlValue for i64 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        integral(value, i64::MIN as f64, i64::MAX as f64).map(|n| n as i64)
    }
}

impl FromControlValue for i32 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        integral(value, i32::MIN as f64, i32::MAX as f64).map(|n| n as i32)
    }
}

impl FromControlValue for u32 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        integral(value, 0.0, u32::MAX as f64).map(|n| n as u32)
    }
}

impl FromControlValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_control_value(value: &ControlValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// What a processing function may return.
///
/// The returned path is the single source of truth for the output file.
pub trait IntoProcessOutput {
    fn into_process_output(self) -> Result<PathBuf>;
}

impl IntoProcessOutput for PathBuf {
    fn into_process_output(self) -> Result<PathBuf> {
        Ok(self)
    }
}

impl IntoProcessOutput for String {
    fn into_process_output(self) -> Result<PathBuf> {
        Ok(PathBuf::from(self))
    }
}

impl<P, E> IntoProcessOutput for std::result::Result<P, E>
where
    P: Into<PathBuf>,
    E: Into<Error>,
{
    fn into_process_output(self) -> Result<PathBuf> {
        self.map(Into::into).map_err(Into::into)
    }
}

/// Type-erased processing function with a known signature.
pub trait Processor: Send + Sync + 'static {
    /// Parameter kinds in call order, position 0 being the audio path.
    fn signature(&self) -> &[ParamKind];

    fn arity(&self) -> usize {
        self.signature().len()
    }

    /// Convert `values` and run the function. Panics are not caught here.
    fn call(&self, ctx: &JobContext, audio: PathBuf, values: &[ControlValue]) -> Result<PathBuf>;
}

/// Marker for `Fn(PathBuf, T1, ..)` processing functions.
#[doc(hidden)]
pub struct Plain;

/// Marker for `Fn(JobContext, PathBuf, T1, ..)` processing functions.
#[doc(hidden)]
pub struct Cooperative;

/// Anything that can be turned into a [`Processor`].
///
/// `M` is inferred from the function's signature; callers never name it.
pub trait ProcessFn<M>: Send + Sync + 'static {
    fn into_processor(self) -> Arc<dyn Processor>;
}

impl ProcessFn<()> for Arc<dyn Processor> {
    fn into_processor(self) -> Arc<dyn Processor> {
        self
    }
}

#[doc(hidden)]
pub struct FnProcessor<F, M> {
    f: F,
    signature: Vec<ParamKind>,
    _marker: PhantomData<fn() -> M>,
}

impl<F, M> FnProcessor<F, M> {
    fn new(f: F, signature: Vec<ParamKind>) -> Self {
        Self {
            f,
            signature,
            _marker: PhantomData,
        }
    }
}

fn arg<T: FromControlValue>(values: &[ControlValue], index: usize) -> Result<T> {
    let value = values.get(index).ok_or_else(|| {
        Error::InvalidArguments(format!("missing value for parameter {}", index + 1))
    })?;
    T::from_control_value(value).ok_or_else(|| {
        Error::InvalidArguments(format!(
            "parameter {} expects {}, got {:?}",
            index + 1,
            T::KIND,
            value
        ))
    })
}

// Invalid arguments are reported by the conversion above, never by the
// function itself.
fn function_error(error: Error) -> Error {
    match error {
        Error::InvalidArguments(message) => Error::Processing(message),
        other => other,
    }
}

macro_rules! impl_process_fn {
    ($($ty:ident),*) => {
        impl<F, O, $($ty,)*> ProcessFn<(Plain, $($ty,)*)> for F
        where
            F: Fn(PathBuf, $($ty,)*) -> O + Send + Sync + 'static,
            O: IntoProcessOutput + 'static,
            $($ty: FromControlValue,)*
        {
            fn into_processor(self) -> Arc<dyn Processor> {
                let signature = vec![ParamKind::AudioPath, $(ParamKind::Value($ty::KIND),)*];
                Arc::new(FnProcessor::<F, (Plain, $($ty,)*)>::new(self, signature))
            }
        }

        impl<F, O, $($ty,)*> Processor for FnProcessor<F, (Plain, $($ty,)*)>
        where
            F: Fn(PathBuf, $($ty,)*) -> O + Send + Sync + 'static,
            O: IntoProcessOutput + 'static,
            $($ty: FromControlValue,)*
        {
            fn signature(&self) -> &[ParamKind] {
                &self.signature
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, _ctx: &JobContext, audio: PathBuf, values: &[ControlValue]) -> Result<PathBuf> {
                let mut index = 0usize;
                $(
                    let $ty = arg::<$ty>(values, index)?;
                    index += 1;
                )*
                (self.f)(audio, $($ty,)*)
                    .into_process_output()
                    .map_err(function_error)
            }
        }

        impl<F, O, $($ty,)*> ProcessFn<(Cooperative, $($ty,)*)> for F
        where
            F: Fn(JobContext, PathBuf, $($ty,)*) -> O + Send + Sync + 'static,
            O: IntoProcessOutput + 'static,
            $($ty: FromControlValue,)*
        {
            fn into_processor(self) -> Arc<dyn Processor> {
                let signature = vec![ParamKind::AudioPath, $(ParamKind::Value($ty::KIND),)*];
                Arc::new(FnProcessor::<F, (Cooperative, $($ty,)*)>::new(self, signature))
            }
        }

        impl<F, O, $($ty,)*> Processor for FnProcessor<F, (Cooperative, $($ty,)*)>
        where
            F: Fn(JobContext, PathBuf, $($ty,)*) -> O + Send + Sync + 'static,
            O: IntoProcessOutput + 'static,
            $($ty: FromControlValue,)*
        {
            fn signature(&self) -> &[ParamKind] {
                &self.signature
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call(&self, ctx: &JobContext, audio: PathBuf, values: &[ControlValue]) -> Result<PathBuf> {
                let mut index = 0usize;
                $(
                    let $ty = arg::<$ty>(values, index)?;
                    index += 1;
                )*
                (self.f)(ctx.clone(), audio, $($ty,)*)
                    .into_process_output()
                    .map_err(function_error)
            }
        }
    };
}

impl_process_fn!();
impl_process_fn!(T1);
impl_process_fn!(T1, T2);
impl_process_fn!(T1, T2, T3);
impl_process_fn!(T1, T2, T3, T4);
impl_process_fn!(T1, T2, T3, T4, T5);
impl_process_fn!(T1, T2, T3, T4, T5, T6);
impl_process_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_process_fn!(T1, T2, T3, T4, T5, T6, T7, T8);
