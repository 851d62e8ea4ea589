//! The publish pipeline: assemble, render, push, commit, and advance the
//! deployment gate, with all-or-nothing semantics at every step.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::deploy::{DeployStatus, Deployer, DeploymentGate, GateError};
use crate::dns::assemble::{AssembleError, ZoneAssembler};
use crate::dns::render::{RenderError, RenderedSet, ZoneFileRenderer};
use crate::staging::{StagingCoordinator, StagingError};
use crate::vcs::VersionControl;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("zone assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("zone rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("push to version control failed: {0:#}")]
    Push(#[source] anyhow::Error),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("deployment failed: {0:#}")]
    Deploy(#[source] anyhow::Error),
}

/// Facade over the whole pipeline. One value per process; concurrent publish
/// requests are serialized on an internal lock so two callers cannot
/// interleave a render-push-commit sequence.
pub struct Publisher {
    assembler: ZoneAssembler,
    renderer: ZoneFileRenderer,
    staging: StagingCoordinator,
    gate: DeploymentGate,
    vcs: Arc<dyn VersionControl>,
    deployer: Arc<dyn Deployer>,
    publish_lock: Mutex<()>,
}

impl Publisher {
    pub fn new(
        assembler: ZoneAssembler,
        renderer: ZoneFileRenderer,
        staging: StagingCoordinator,
        gate: DeploymentGate,
        vcs: Arc<dyn VersionControl>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Publisher {
            assembler,
            renderer,
            staging,
            gate,
            vcs,
            deployer,
            publish_lock: Mutex::new(()),
        }
    }

    /// Render the current visible zone set to in-memory text without touching
    /// disk or committed state.
    pub async fn preview(&self) -> Result<RenderedSet, PublishError> {
        let zones = self.assembler.build_zones().await?;
        Ok(self.renderer.render(&zones)?)
    }

    /// The full publish sequence: render and write the zone files, push them
    /// to version control, then commit the staged rows and advance the gate.
    ///
    /// Ordering is deliberate: the commit only runs once the rendered files
    /// are safely pushed, so any earlier failure leaves every row staged and
    /// the operation retryable. Returns the number of rows committed.
    pub async fn publish(&self) -> Result<u64, PublishError> {
        let _guard = self.publish_lock.lock().await;

        let zones = self.assembler.build_zones().await?;
        self.renderer.render_and_write(&zones)?;
        info!(zones = zones.len(), "zone set rendered");

        self.vcs.push().await.map_err(PublishError::Push)?;

        let committed = self.staging.commit_all().await?;
        if committed > 0 {
            self.gate
                .advance(DeployStatus::Staging, DeployStatus::AwaitingDeployment)
                .await?;
        }
        info!(committed, "publish complete");
        Ok(committed)
    }

    /// Run the external deployer against the committed configuration. Only
    /// legal while awaiting deployment; a deployer failure leaves the gate
    /// where it was so the deploy can be retried without a re-render.
    ///
    /// Takes the same lock as `publish` so a concurrent caller cannot pass
    /// the gate check while a playbook run is already in flight.
    pub async fn deploy(&self) -> Result<String, PublishError> {
        let _guard = self.publish_lock.lock().await;

        let status = self.gate.status().await?;
        if status != DeployStatus::AwaitingDeployment {
            return Err(PublishError::Gate(GateError::UnexpectedStatus {
                expected: DeployStatus::AwaitingDeployment,
                found: status,
            }));
        }

        let output = self.deployer.run().await.map_err(PublishError::Deploy)?;
        self.gate
            .advance(DeployStatus::AwaitingDeployment, DeployStatus::Deployed)
            .await?;
        info!("deployment complete");
        Ok(output)
    }
}
