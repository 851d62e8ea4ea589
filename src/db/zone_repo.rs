//! Repository functions for manipulating rows in the `zones` table.
//!
//! Every mutation marks the row as staged; only the staging coordinator ever
//! clears that flag. Deletes are soft: the row keeps its data and stays
//! visible while the deletion itself is staged.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Application-level representation of a stored zone.
#[derive(Debug, Clone)]
pub struct Zone {
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
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating or replacing a zone.
#[derive(Debug, Clone)]
pub struct ZoneInput {
    pub name: String,
    pub primary_ns: String,
    pub admin_email: String,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
    pub ttl: u32,
    pub tags: Vec<String>,
}

/// A zone's identity is derived from its name, so re-creating a zone of the
/// same name yields the same UUID.
pub fn zone_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

const ZONE_COLUMNS: &str = "uuid, name, primary_ns, admin_email, refresh, retry, expire, minimum, \
                            ttl, staging, created_at, modified_at, deleted_at";

fn zone_from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Zone> {
    let uuid: String = row.get("uuid");
    let uuid = uuid
        .parse::<Uuid>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(Zone {
        uuid,
        name: row.get("name"),
        primary_ns: row.get("primary_ns"),
        admin_email: row.get("admin_email"),
        refresh: row.get::<i64, _>("refresh") as u32,
        retry: row.get::<i64, _>("retry") as u32,
        expire: row.get::<i64, _>("expire") as u32,
        minimum: row.get::<i64, _>("minimum") as u32,
        ttl: row.get::<i64, _>("ttl") as u32,
        staging: row.get::<i64, _>("staging") != 0,
        tags: Vec::new(),
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        deleted_at: row.get("deleted_at"),
    })
}

async fn attach_tags(db: &SqlitePool, zones: &mut [Zone]) -> sqlx::Result<()> {
    for zone in zones.iter_mut() {
        zone.tags = tags(db, zone.uuid).await?;
    }
    Ok(())
}

/// Fetch every zone visible to rendering: published rows plus rows carrying a
/// staged edit or staged delete. Ordered by name for deterministic output.
pub async fn visible(db: &SqlitePool) -> sqlx::Result<Vec<Zone>> {
    let rows = sqlx::query(&format!(
        "SELECT {ZONE_COLUMNS} FROM zones WHERE deleted_at IS NULL OR staging = 1 ORDER BY name"
    ))
    .fetch_all(db)
    .await?;

    let mut zones = rows
        .iter()
        .map(zone_from_row)
        .collect::<sqlx::Result<Vec<_>>>()?;
    attach_tags(db, &mut zones).await?;
    Ok(zones)
}

/// Fetch every zone with an uncommitted edit.
pub async fn staged(db: &SqlitePool) -> sqlx::Result<Vec<Zone>> {
    let rows = sqlx::query(&format!(
        "SELECT {ZONE_COLUMNS} FROM zones WHERE staging = 1 ORDER BY name"
    ))
    .fetch_all(db)
    .await?;

    let mut zones = rows
        .iter()
        .map(zone_from_row)
        .collect::<sqlx::Result<Vec<_>>>()?;
    attach_tags(db, &mut zones).await?;
    Ok(zones)
}

/// Fetch a single visible zone by UUID.
pub async fn find(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<Option<Zone>> {
    let row = sqlx::query(&format!(
        "SELECT {ZONE_COLUMNS} FROM zones WHERE uuid = ? AND (deleted_at IS NULL OR staging = 1)"
    ))
    .bind(uuid.to_string())
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut zone = zone_from_row(&row)?;
    zone.tags = tags(db, zone.uuid).await?;
    Ok(Some(zone))
}

/// Determine whether a visible zone of the given name already exists.
pub async fn exists(db: &SqlitePool, name: &str) -> sqlx::Result<bool> {
    let cnt: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM zones WHERE name = ? AND (deleted_at IS NULL OR staging = 1)",
    )
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(cnt.0 > 0)
}

/// Create a new zone row in the staged state and return its derived UUID.
/// Because the UUID is derived from the name, re-creating a zone whose delete
/// was already committed resurrects the old row instead of colliding with it.
pub async fn insert(db: &SqlitePool, input: &ZoneInput) -> sqlx::Result<Uuid> {
    let uuid = zone_uuid(&input.name);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO zones (
            uuid, name, primary_ns, admin_email,
            refresh, retry, expire, minimum, ttl,
            staging, created_at, modified_at, deleted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, NULL)
        ON CONFLICT (uuid)
        DO UPDATE SET primary_ns = excluded.primary_ns,
                      admin_email = excluded.admin_email,
                      refresh = excluded.refresh,
                      retry = excluded.retry,
                      expire = excluded.expire,
                      minimum = excluded.minimum,
                      ttl = excluded.ttl,
                      staging = 1,
                      modified_at = excluded.modified_at,
                      deleted_at = NULL
        "#,
    )
    .bind(uuid.to_string())
    .bind(&input.name)
    .bind(&input.primary_ns)
    .bind(&input.admin_email)
    .bind(input.refresh as i64)
    .bind(input.retry as i64)
    .bind(input.expire as i64)
    .bind(input.minimum as i64)
    .bind(input.ttl as i64)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    replace_tags(db, uuid, &input.tags).await?;
    Ok(uuid)
}

/// Update a zone in place and re-stage it.
pub async fn update(db: &SqlitePool, uuid: Uuid, input: &ZoneInput) -> sqlx::Result<()> {
    let now = Utc::now();
    let res = sqlx::query(
        r#"
        UPDATE zones
        SET name = ?, primary_ns = ?, admin_email = ?,
            refresh = ?, retry = ?, expire = ?, minimum = ?, ttl = ?,
            staging = 1, modified_at = ?
        WHERE uuid = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.primary_ns)
    .bind(&input.admin_email)
    .bind(input.refresh as i64)
    .bind(input.retry as i64)
    .bind(input.expire as i64)
    .bind(input.minimum as i64)
    .bind(input.ttl as i64)
    .bind(now)
    .bind(uuid.to_string())
    .execute(db)
    .await?;

    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    replace_tags(db, uuid, &input.tags).await?;
    Ok(())
}

/// Soft-delete a zone: the row keeps its data, and the staged flag keeps the
/// deletion previewable until commit.
pub async fn soft_delete(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<()> {
    let now = Utc::now();
    let res = sqlx::query(
        "UPDATE zones SET deleted_at = ?, staging = 1, modified_at = ? \
         WHERE uuid = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(uuid.to_string())
    .execute(db)
    .await?;

    if res.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

/// Fetch the free-form tags attached to a zone.
pub async fn tags(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT tag FROM zone_tags WHERE zone_uuid = ? ORDER BY tag")
            .bind(uuid.to_string())
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Replace the zone's tag set wholesale.
pub async fn replace_tags(db: &SqlitePool, uuid: Uuid, tags: &[String]) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM zone_tags WHERE zone_uuid = ?")
        .bind(uuid.to_string())
        .execute(db)
        .await?;
    for tag in tags {
        sqlx::query("INSERT INTO zone_tags (zone_uuid, tag) VALUES (?, ?)")
            .bind(uuid.to_string())
            .bind(tag)
            .execute(db)
            .await?;
    }
    Ok(())
}
