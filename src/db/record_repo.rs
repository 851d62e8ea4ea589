//! Repository functions for manipulating rows in the `records` table.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Application-level representation of a stored resource record.
#[derive(Debug, Clone)]
pub struct Record {
    pub uuid: Uuid,
    pub zone_uuid: Uuid,
    pub rtype: String,
    pub host: String,
    pub content: String,
    pub ttl: u32,
    pub add_ptr: bool,
    pub staging: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating or replacing a record.
#[derive(Debug, Clone)]
pub struct RecordInput {
    pub rtype: String,
    pub host: String,
    pub content: String,
    pub ttl: u32,
    pub add_ptr: bool,
    pub tags: Vec<String>,
}

const RECORD_COLUMNS: &str = "uuid, zone_uuid, rtype, host, content, ttl, add_ptr, staging, \
                              created_at, modified_at, deleted_at";

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Record> {
    let parse = |col: &str| -> sqlx::Result<Uuid> {
        row.get::<String, _>(col)
            .parse::<Uuid>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    };
    Ok(Record {
        uuid: parse("uuid")?,
        zone_uuid: parse("zone_uuid")?,
        rtype: row.get("rtype"),
        host: row.get("host"),
        content: row.get("content"),
        ttl: row.get::<i64, _>("ttl") as u32,
        add_ptr: row.get::<i64, _>("add_ptr") != 0,
        staging: row.get::<i64, _>("staging") != 0,
        tags: Vec::new(),
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        deleted_at: row.get("deleted_at"),
    })
}

async fn attach_tags(db: &SqlitePool, records: &mut [Record]) -> sqlx::Result<()> {
    for record in records.iter_mut() {
        record.tags = tags(db, record.uuid).await?;
    }
    Ok(())
}

/// Fetch every visible record of a zone, in a stable order so re-rendering a
/// fixed snapshot yields identical output.
pub async fn visible_for_zone(db: &SqlitePool, zone_uuid: Uuid) -> sqlx::Result<Vec<Record>> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM records \
         WHERE zone_uuid = ? AND (deleted_at IS NULL OR staging = 1) \
         ORDER BY host, rtype, content, uuid"
    ))
    .bind(zone_uuid.to_string())
    .fetch_all(db)
    .await?;

    let mut records = rows
        .iter()
        .map(record_from_row)
        .collect::<sqlx::Result<Vec<_>>>()?;
    attach_tags(db, &mut records).await?;
    Ok(records)
}

/// Fetch every record with an uncommitted edit.
pub async fn staged(db: &SqlitePool) -> sqlx::Result<Vec<Record>> {
    let rows = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM records WHERE staging = 1 ORDER BY host, rtype, content, uuid"
    ))
    .fetch_all(db)
    .await?;

    let mut records = rows
        .iter()
        .map(record_from_row)
        .collect::<sqlx::Result<Vec<_>>>()?;
    attach_tags(db, &mut records).await?;
    Ok(records)
}

/// Fetch a single visible record by UUID.
pub async fn find(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<Option<Record>> {
    let row = sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM records WHERE uuid = ? AND (deleted_at IS NULL OR staging = 1)"
    ))
    .bind(uuid.to_string())
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut record = record_from_row(&row)?;
    record.tags = tags(db, record.uuid).await?;
    Ok(Some(record))
}

/// Create a new record row in the staged state.
pub async fn insert(db: &SqlitePool, zone_uuid: Uuid, input: &RecordInput) -> sqlx::Result<Uuid> {
    let uuid = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO records (
            uuid, zone_uuid, rtype, host, content, ttl, add_ptr,
            staging, created_at, modified_at, deleted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, NULL)
        "#,
    )
    .bind(uuid.to_string())
    .bind(zone_uuid.to_string())
    .bind(&input.rtype)
    .bind(&input.host)
    .bind(&input.content)
    .bind(input.ttl as i64)
    .bind(input.add_ptr as i64)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    replace_tags(db, uuid, &input.tags).await?;
    Ok(uuid)
}

/// Update a record in place and re-stage it.
pub async fn update(db: &SqlitePool, uuid: Uuid, input: &RecordInput) -> sqlx::Result<()> {
    let now = Utc::now();
    let res = sqlx::query(
        r#"
        UPDATE records
        SET rtype = ?, host = ?, content = ?, ttl = ?, add_ptr = ?,
            staging = 1, modified_at = ?
        WHERE uuid = ?
        "#,
    )
    .bind(&input.rtype)
    .bind(&input.host)
    .bind(&input.content)
    .bind(input.ttl as i64)
    .bind(input.add_ptr as i64)
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

/// Soft-delete a record, keeping the deletion previewable until commit.
pub async fn soft_delete(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<()> {
    let now = Utc::now();
    let res = sqlx::query(
        "UPDATE records SET deleted_at = ?, staging = 1, modified_at = ? \
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

/// Fetch the free-form tags attached to a record.
pub async fn tags(db: &SqlitePool, uuid: Uuid) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT tag FROM record_tags WHERE record_uuid = ? ORDER BY tag")
            .bind(uuid.to_string())
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}

/// Replace the record's tag set wholesale.
pub async fn replace_tags(db: &SqlitePool, uuid: Uuid, tags: &[String]) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM record_tags WHERE record_uuid = ?")
        .bind(uuid.to_string())
        .execute(db)
        .await?;
    for tag in tags {
        sqlx::query("INSERT INTO record_tags (record_uuid, tag) VALUES (?, ?)")
            .bind(uuid.to_string())
            .bind(tag)
            .execute(db)
            .await?;
    }
    Ok(())
}
