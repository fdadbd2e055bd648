//! Sentiscope Service
//!
//! HTTP surface for the sentiment pipeline. The startup sequence resolves and
//! loads the artifacts into an [`AppContext`]; the router is only built from a
//! ready context, so every served request sees fully loaded handles.

pub mod cli;
pub mod config;
pub mod routes;
pub mod startup;
pub mod state;
pub mod telemetry;

pub use cli::Cli;
pub use config::ServiceConfig;
pub use routes::{create_router, AppError};
pub use startup::{FailedPhase, Startup, StartupError, StartupPhase};
pub use state::AppContext;
