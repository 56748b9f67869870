//! Backend implementations for the render module
//!
//! Only the headless recording backend ships with the engine; windowed
//! backends implement [`GfxDevice`](crate::render::device::GfxDevice) in
//! the application.

/// Headless recording backend
pub mod headless;
