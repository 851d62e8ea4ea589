//! Zone CRUD endpoints. Every mutation lands in the staged state; nothing
//! here touches rendered output.

use axum::{Extension, Json, extract::Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SharedState;
use crate::db::zone_repo::{self, Zone, ZoneInput};
use crate::error::AppError;
use crate::validation::validate_zone_name;

#[derive(Serialize)]
pub struct ZoneDto {
    pub uuid: Uuid,
    pub name: String,
    pub primary_ns: String,
    pub admin_email: String,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
    pub ttl: u32,
    pub staging: bool,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<Zone> for ZoneDto {
    fn from(zone: Zone) -> Self {
        ZoneDto {
            uuid: zone.uuid,
            name: zone.name,
            primary_ns: zone.primary_ns,
            admin_email: zone.admin_email,
            refresh: zone.refresh,
            retry: zone.retry,
            expire: zone.expire,
            minimum: zone.minimum,
            ttl: zone.ttl,
            staging: zone.staging,
            tags: zone.tags,
            created_at: zone.created_at.timestamp(),
            modified_at: zone.modified_at.timestamp(),
            deleted_at: zone.deleted_at.map(|t| t.timestamp()),
        }
    }
}

#[derive(Deserialize)]
pub struct ZoneRequest {
    pub name: String,
    pub primary_ns: String,
    pub admin_email: String,
    #[serde(default = "default_refresh")]
    pub refresh: u32,
    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_expire")]
    pub expire: u32,
    #[serde(default = "default_minimum")]
    pub minimum: u32,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_refresh() -> u32 {
    1800
}
fn default_retry() -> u32 {
    1800
}
fn default_expire() -> u32 {
    604_800
}
fn default_minimum() -> u32 {
    1800
}
fn default_ttl() -> u32 {
    3600
}

impl ZoneRequest {
    fn into_input(self) -> ZoneInput {
        ZoneInput {
            name: self.name,
            primary_ns: self.primary_ns,
            admin_email: self.admin_email,
            refresh: self.refresh,
            retry: self.retry,
            expire: self.expire,
            minimum: self.minimum,
            ttl: self.ttl,
            tags: self.tags,
        }
    }
}

pub async fn list_zones(
    Extension(state): Extension<SharedState>,
) -> Result<Json<Vec<ZoneDto>>, AppError> {
    let zones = zone_repo::visible(&state.db).await?;
    Ok(Json(zones.into_iter().map(ZoneDto::from).collect()))
}

pub async fn get_zone(
    Extension(state): Extension<SharedState>,
    Path(zone_uuid): Path<Uuid>,
) -> Result<Json<ZoneDto>, AppError> {
    let zone = zone_repo::find(&state.db, zone_uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(zone.into()))
}

pub async fn create_zone(
    Extension(state): Extension<SharedState>,
    Json(req): Json<ZoneRequest>,
) -> Result<Json<ZoneDto>, AppError> {
    validate_zone_name(&req.name)?;

    if zone_repo::exists(&state.db, &req.name).await? {
        return Err(AppError::conflict(format!(
            "zone '{}' already exists",
            req.name
        )));
    }

    let uuid = zone_repo::insert(&state.db, &req.into_input()).await?;
    state.gate.mark_staging().await?;

    let zone = zone_repo::find(&state.db, uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(zone.into()))
}

pub async fn update_zone(
    Extension(state): Extension<SharedState>,
    Path(zone_uuid): Path<Uuid>,
    Json(req): Json<ZoneRequest>,
) -> Result<Json<ZoneDto>, AppError> {
    validate_zone_name(&req.name)?;

    zone_repo::update(&state.db, zone_uuid, &req.into_input()).await?;
    state.gate.mark_staging().await?;

    let zone = zone_repo::find(&state.db, zone_uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(zone.into()))
}

pub async fn delete_zone(
    Extension(state): Extension<SharedState>,
    Path(zone_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    zone_repo::soft_delete(&state.db, zone_uuid).await?;
    state.gate.mark_staging().await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
