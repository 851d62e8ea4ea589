pub mod configs;
pub mod deploy;
pub mod records;
pub mod staging;
pub mod zones;

use crate::SharedState;
use axum::{
    Extension, Json, Router,
    routing::{get, post},
};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_router(state: SharedState) -> Router {
    use crate::api::{configs, deploy, records, staging, zones};

    Router::new()
        .route("/api/v1/health", get(health))
        // zone CRUD
        .route("/api/v1/zones", get(zones::list_zones).post(zones::create_zone))
        .route(
            "/api/v1/zones/{zone_uuid}",
            get(zones::get_zone)
                .put(zones::update_zone)
                .delete(zones::delete_zone),
        )
        // record CRUD
        .route(
            "/api/v1/zones/{zone_uuid}/records",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/api/v1/records/{record_uuid}",
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        // config key/value CRUD
        .route(
            "/api/v1/configs",
            get(configs::list_configs).post(configs::create_config),
        )
        .route(
            "/api/v1/configs/{config_key}",
            get(configs::get_config)
                .put(configs::update_config)
                .delete(configs::delete_config),
        )
        // staging and publish
        .route("/api/v1/staging", get(staging::get_staging))
        .route("/api/v1/staging/apply", post(staging::apply_staging))
        .route("/api/v1/render/preview", get(staging::preview_render))
        // deployment
        .route(
            "/api/v1/deploy",
            get(deploy::get_deploy_status).post(deploy::run_deploy),
        )
        .layer(Extension(state))
}
