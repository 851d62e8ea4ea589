//! Deployment status and trigger endpoints.

use axum::{Extension, Json};
use serde::Serialize;

use crate::SharedState;
use crate::deploy::DeployStatus;
use crate::error::AppError;

#[derive(Serialize)]
pub struct DeployStatusDto {
    pub status: DeployStatus,
    pub awaiting_deployment: bool,
}

pub async fn get_deploy_status(
    Extension(state): Extension<SharedState>,
) -> Result<Json<DeployStatusDto>, AppError> {
    let status = state.gate.status().await?;
    Ok(Json(DeployStatusDto {
        status,
        awaiting_deployment: status == DeployStatus::AwaitingDeployment,
    }))
}

#[derive(Serialize)]
pub struct DeployResultDto {
    pub status: DeployStatus,
    pub output: String,
}

pub async fn run_deploy(
    Extension(state): Extension<SharedState>,
) -> Result<Json<DeployResultDto>, AppError> {
    let output = state.publisher.deploy().await?;
    Ok(Json(DeployResultDto {
        status: DeployStatus::Deployed,
        output,
    }))
}
