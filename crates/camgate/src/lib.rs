//! camgate - network gateway for a single 360 camera.
//!
//! ## Architecture
//!
//! - **device**: capability traits over the vendor SDK, plus a simulated camera
//! - **session**: handle lifecycle and serialized access (the operation ticket)
//! - **settings**: partial exposure/capture updates merged onto live values
//! - **files**: device URI to local file and public locator
//! - **gateway**: the facade every caller goes through
//! - **web**: axum routes under `/api/v1`

pub mod device;
pub mod error;
pub mod files;
pub mod gateway;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod web;

pub use error::{ErrorKind, GatewayError, GatewayResult, Outcome};
pub use gateway::{Gateway, GatewayConfig};
pub use session::{SessionManager, SessionState};
