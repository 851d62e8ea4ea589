//! Deployment status state machine and the external deployer collaborator.
//!
//! The status flag is the one piece of cross-cutting process state besides
//! the staging flags themselves:
//! `clean -> staging -> awaiting_deployment -> deployed`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::db::{Db, config_repo};

pub const DEPLOY_STATUS_KEY: &str = "deploy_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Clean,
    Staging,
    AwaitingDeployment,
    Deployed,
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployStatus::Clean => "clean",
            DeployStatus::Staging => "staging",
            DeployStatus::AwaitingDeployment => "awaiting_deployment",
            DeployStatus::Deployed => "deployed",
        };
        f.write_str(s)
    }
}

impl FromStr for DeployStatus {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, GateError> {
        match s {
            "clean" => Ok(DeployStatus::Clean),
            "staging" => Ok(DeployStatus::Staging),
            "awaiting_deployment" => Ok(DeployStatus::AwaitingDeployment),
            "deployed" => Ok(DeployStatus::Deployed),
            other => Err(GateError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("store access failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("deployment status row is missing")]
    Missing,

    #[error("unknown deployment status '{0}'")]
    UnknownStatus(String),

    #[error("deployment status is '{found}', expected '{expected}'")]
    UnexpectedStatus {
        expected: DeployStatus,
        found: DeployStatus,
    },
}

/// Owns the deployment status flag and its legal transitions.
#[derive(Clone)]
pub struct DeploymentGate {
    db: Db,
}

impl DeploymentGate {
    pub fn new(db: Db) -> Self {
        DeploymentGate { db }
    }

    /// The flag as stored, ignoring staged rows.
    pub async fn stored(&self) -> Result<DeployStatus, GateError> {
        let value = config_repo::get(&self.db, DEPLOY_STATUS_KEY)
            .await?
            .ok_or(GateError::Missing)?;
        value.parse()
    }

    /// Effective status: the existence of any staged row means `staging`,
    /// whatever the stored flag says.
    pub async fn status(&self) -> Result<DeployStatus, GateError> {
        let (zones,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM zones WHERE staging = 1")
            .fetch_one(&self.db)
            .await?;
        let (records,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE staging = 1")
            .fetch_one(&self.db)
            .await?;
        if zones + records > 0 {
            return Ok(DeployStatus::Staging);
        }
        self.stored().await
    }

    /// Record that an edit exists. Called by the CRUD surface on every
    /// create, update, or delete.
    pub async fn mark_staging(&self) -> Result<(), GateError> {
        config_repo::set(&self.db, DEPLOY_STATUS_KEY, "staging").await?;
        Ok(())
    }

    /// Move the flag from `from` to `to`. Finding any other current value is
    /// reported, never silently overwritten.
    pub async fn advance(&self, from: DeployStatus, to: DeployStatus) -> Result<(), GateError> {
        let swapped = config_repo::compare_and_set(
            &self.db,
            DEPLOY_STATUS_KEY,
            &from.to_string(),
            &to.to_string(),
        )
        .await?;

        if !swapped {
            let found = self.stored().await?;
            return Err(GateError::UnexpectedStatus {
                expected: from,
                found,
            });
        }

        info!(%from, %to, "deployment status advanced");
        Ok(())
    }
}

/// External collaborator that applies the committed configuration to the DNS
/// server fleet.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn run(&self) -> anyhow::Result<String>;
}

/// Runs the operator's ansible playbook against the configured inventory.
pub struct AnsibleDeployer {
    pub playbook: PathBuf,
    pub inventory: PathBuf,
}

#[async_trait]
impl Deployer for AnsibleDeployer {
    async fn run(&self) -> anyhow::Result<String> {
        if !self.playbook.exists() {
            bail!("playbook not found: {}", self.playbook.display());
        }
        if !self.inventory.exists() {
            bail!("inventory not found: {}", self.inventory.display());
        }

        let output = tokio::process::Command::new("ansible-playbook")
            .arg("-i")
            .arg(&self.inventory)
            .arg(&self.playbook)
            .output()
            .await
            .context("failed to start ansible-playbook")?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            bail!(
                "ansible-playbook exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        info!("ansible playbook completed");
        Ok(stdout)
    }
}
