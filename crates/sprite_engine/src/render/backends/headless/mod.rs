//! Headless backend
//!
//! A [`GfxDevice`](crate::render::device::GfxDevice) that records calls
//! instead of issuing them. It drives the test suite and the demo binary.

pub mod introspect;
pub mod recording;

pub use introspect::introspect;
pub use recording::{DeviceCall, DrawRecord, RecordingDevice};
