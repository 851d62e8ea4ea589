//! Configuration key/value endpoints. These sit beside the zone CRUD so an
//! operator can inspect and adjust process settings (including the deployment
//! status flag) without touching the database directly.

use axum::{Extension, Json, extract::Path};
use serde::{Deserialize, Serialize};

use crate::SharedState;
use crate::db::config_repo;
use crate::error::AppError;

#[derive(Serialize)]
pub struct ConfigDto {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct CreateConfigRequest {
    pub key: String,
    pub value: String,
}

#[derive(Deserialize)]
pub struct UpdateConfigRequest {
    pub value: String,
}

pub async fn list_configs(
    Extension(state): Extension<SharedState>,
) -> Result<Json<Vec<ConfigDto>>, AppError> {
    let entries = config_repo::list(&state.db).await?;
    Ok(Json(
        entries
            .into_iter()
            .map(|(key, value)| ConfigDto { key, value })
            .collect(),
    ))
}

pub async fn get_config(
    Extension(state): Extension<SharedState>,
    Path(config_key): Path<String>,
) -> Result<Json<ConfigDto>, AppError> {
    let value = config_repo::get(&state.db, &config_key)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(ConfigDto {
        key: config_key,
        value,
    }))
}

pub async fn create_config(
    Extension(state): Extension<SharedState>,
    Json(req): Json<CreateConfigRequest>,
) -> Result<Json<ConfigDto>, AppError> {
    if req.key.is_empty() {
        return Err(AppError::bad_request("config key must not be empty"));
    }
    if config_repo::get(&state.db, &req.key).await?.is_some() {
        return Err(AppError::conflict(format!(
            "config '{}' already exists",
            req.key
        )));
    }

    config_repo::set(&state.db, &req.key, &req.value).await?;
    Ok(Json(ConfigDto {
        key: req.key,
        value: req.value,
    }))
}

pub async fn update_config(
    Extension(state): Extension<SharedState>,
    Path(config_key): Path<String>,
    Json(req): Json<UpdateConfigRequest>,
) -> Result<Json<ConfigDto>, AppError> {
    config_repo::update(&state.db, &config_key, &req.value).await?;
    Ok(Json(ConfigDto {
        key: config_key,
        value: req.value,
    }))
}

pub async fn delete_config(
    Extension(state): Extension<SharedState>,
    Path(config_key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    config_repo::delete(&state.db, &config_key).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
