//! # kubeframe-core
//!
//! Foundation types shared by every kubeframe crate:
//!
//! - **Branded IDs**: [`ClusterId`], [`EntityId`] newtypes plus the numeric
//!   [`FrameRoutingId`]
//! - **Errors**: [`FrameError`] taxonomy via `thiserror`
//! - **App events**: [`AppEvent`] telemetry payloads

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;

pub use errors::{FrameError, ReadinessError, Result};
pub use events::AppEvent;
pub use ids::{ClusterId, EntityId, FrameRoutingId};
