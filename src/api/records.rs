//! Record CRUD endpoints.

use axum::{Extension, Json, extract::Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SharedState;
use crate::db::record_repo::{self, Record, RecordInput};
use crate::db::zone_repo;
use crate::error::AppError;
use crate::validation::{validate_record_host, validate_record_type, validate_ttl};

#[derive(Serialize)]
pub struct RecordDto {
    pub uuid: Uuid,
    pub zone_uuid: Uuid,
    #[serde(rename = "type")]
    pub rtype: String,
    pub host: String,
    pub content: String,
    pub ttl: u32,
    pub add_ptr: bool,
    pub staging: bool,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<Record> for RecordDto {
    fn from(record: Record) -> Self {
        RecordDto {
            uuid: record.uuid,
            zone_uuid: record.zone_uuid,
            rtype: record.rtype,
            host: record.host,
            content: record.content,
            ttl: record.ttl,
            add_ptr: record.add_ptr,
            staging: record.staging,
            tags: record.tags,
            created_at: record.created_at.timestamp(),
            modified_at: record.modified_at.timestamp(),
            deleted_at: record.deleted_at.map(|t| t.timestamp()),
        }
    }
}

#[derive(Deserialize)]
pub struct RecordRequest {
    #[serde(rename = "type")]
    pub rtype: String,
    pub host: String,
    pub content: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub add_ptr: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_ttl() -> u32 {
    3600
}

impl RecordRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_record_type(&self.rtype)?;
        validate_record_host(&self.host)?;
        validate_ttl(self.ttl)?;
        if self.add_ptr && !matches!(self.rtype.as_str(), "A" | "AAAA") {
            return Err(AppError::bad_request(
                "add_ptr is only valid on A and AAAA records",
            ));
        }
        Ok(())
    }

    fn into_input(self) -> RecordInput {
        RecordInput {
            rtype: self.rtype,
            host: self.host,
            content: self.content,
            ttl: self.ttl,
            add_ptr: self.add_ptr,
            tags: self.tags,
        }
    }
}

pub async fn list_records(
    Extension(state): Extension<SharedState>,
    Path(zone_uuid): Path<Uuid>,
) -> Result<Json<Vec<RecordDto>>, AppError> {
    // surface a clean 404 for unknown zones rather than an empty list
    zone_repo::find(&state.db, zone_uuid)
        .await?
        .ok_or(AppError::NotFound)?;

    let records = record_repo::visible_for_zone(&state.db, zone_uuid).await?;
    Ok(Json(records.into_iter().map(RecordDto::from).collect()))
}

pub async fn get_record(
    Extension(state): Extension<SharedState>,
    Path(record_uuid): Path<Uuid>,
) -> Result<Json<RecordDto>, AppError> {
    let record = record_repo::find(&state.db, record_uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record.into()))
}

pub async fn create_record(
    Extension(state): Extension<SharedState>,
    Path(zone_uuid): Path<Uuid>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<RecordDto>, AppError> {
    req.validate()?;

    zone_repo::find(&state.db, zone_uuid)
        .await?
        .ok_or(AppError::NotFound)?;

    let uuid = record_repo::insert(&state.db, zone_uuid, &req.into_input()).await?;
    state.gate.mark_staging().await?;

    let record = record_repo::find(&state.db, uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record.into()))
}

pub async fn update_record(
    Extension(state): Extension<SharedState>,
    Path(record_uuid): Path<Uuid>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<RecordDto>, AppError> {
    req.validate()?;

    record_repo::update(&state.db, record_uuid, &req.into_input()).await?;
    state.gate.mark_staging().await?;

    let record = record_repo::find(&state.db, record_uuid)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(record.into()))
}

pub async fn delete_record(
    Extension(state): Extension<SharedState>,
    Path(record_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    record_repo::soft_delete(&state.db, record_uuid).await?;
    state.gate.mark_staging().await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
