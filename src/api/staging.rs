//! Staging inspection, render preview, and the publish endpoint.

use std::collections::BTreeMap;

use axum::{Extension, Json};
use serde::Serialize;

use crate::SharedState;
use crate::api::records::RecordDto;
use crate::api::zones::ZoneDto;
use crate::error::AppError;

#[derive(Serialize)]
pub struct StagingDto {
    pub zones: Vec<ZoneDto>,
    pub records: Vec<RecordDto>,
}

/// Everything currently staged, for preview and audit.
pub async fn get_staging(
    Extension(state): Extension<SharedState>,
) -> Result<Json<StagingDto>, AppError> {
    let (zones, records) = state.staging.get_staged().await?;
    Ok(Json(StagingDto {
        zones: zones.into_iter().map(ZoneDto::from).collect(),
        records: records.into_iter().map(RecordDto::from).collect(),
    }))
}

#[derive(Serialize)]
pub struct PreviewDto {
    pub index: String,
    pub files: BTreeMap<String, String>,
}

/// Render the would-be-published zone set to text without touching disk.
pub async fn preview_render(
    Extension(state): Extension<SharedState>,
) -> Result<Json<PreviewDto>, AppError> {
    let rendered = state.publisher.preview().await?;
    Ok(Json(PreviewDto {
        index: rendered.index,
        files: rendered.files,
    }))
}

#[derive(Serialize)]
pub struct ApplyDto {
    pub committed: u64,
}

/// The full publish sequence: render, write, push, commit.
pub async fn apply_staging(
    Extension(state): Extension<SharedState>,
) -> Result<Json<ApplyDto>, AppError> {
    let committed = state.publisher.publish().await?;
    Ok(Json(ApplyDto { committed }))
}
