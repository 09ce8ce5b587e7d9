//! Per-item acquisition.
//!
//! Split into focused submodules:
//! - [`state`] - Protocol states and their legal order
//! - [`context`] - Shared collaborators and per-item state tracking
//! - [`machine`] - Navigation, format selection, trigger, extraction and settlement
//! - [`download`] - Download lifecycle stream consumption

mod context;
mod download;
mod machine;
mod state;


pub(crate) use context::{AcquisitionContext, AcquisitionServices};
pub(crate) use machine::run_acquisition;
pub use machine::select_format;
pub use state::AcquisitionState;
