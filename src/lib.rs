//! Crate entrypoint wiring together configuration, the store, the rendering
//! pipeline, and the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod deploy;
pub mod dns;
pub mod error;
pub mod publish;
pub mod staging;
pub mod validation;
pub mod vcs;

use config::AppConfig;
use db::Db;
use deploy::DeploymentGate;
use publish::Publisher;
use staging::StagingCoordinator;

use std::sync::Arc;

/// Complete application dependencies shared across handlers.
pub struct AppState {
    pub config: AppConfig,
    pub db: Db,
    pub staging: StagingCoordinator,
    pub gate: DeploymentGate,
    pub publisher: Publisher,
}

/// Arc-wrapped version of `AppState` passed into Axum extensions.
pub type SharedState = Arc<AppState>;
