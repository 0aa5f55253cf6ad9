//! Interception engine
//!
//! The sniffer wraps a fixed set of client operations so that every call is turned into
//! a [`CallRecord`] and handed to a [`Reporter`](crate::reporters::Reporter), without the
//! calling code or the client knowing.
//!
//! # Architecture
//!
//! - **Registry**: which operations are intercepted and the names they are reported under
//! - **Interceptor**: generic before/after wrapping with a skip outcome
//! - **Normalizer**: per-operation translation of a call into a record
//! - **Traceback**: optional stack snapshot delivered alongside each record
//! - **Sniffer**: builds the wrapped methods and swaps them in and out of a dispatch table

mod controller;
pub mod interceptor;
mod normalizer;
mod record;
mod registry;
mod traceback;

pub use controller::Sniffer;
pub use interceptor::{wrap, AfterHook, BeforeHook, HookOutcome};
pub use normalizer::Normalizer;
pub use record::CallRecord;
pub use registry::{default_registry, OperationDescriptor, Registry};
pub use traceback::{Frame, Traceback};
