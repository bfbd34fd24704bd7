//! Storage of entity records as JSON documents

use anyhow::Context;
use parking_lot::RwLock;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Resource;
use crate::error::{ApiError, ApiResult};

type MemoryTable = HashMap<&'static str, Vec<(String, Value)>>;

/// Record storage shared by every resource router.
///
/// Listing returns records newest first. `modify` is an atomic
/// read-modify-write: a row lock in Postgres, the table write lock in memory.
#[derive(Clone)]
pub enum RecordStore {
    Postgres(PgPool),
    Memory(Arc<RwLock<MemoryTable>>),
}

impl RecordStore {
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }

    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn health_check(&self) -> bool {
        match self {
            Self::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            Self::Memory(_) => true,
        }
    }

    pub async fn list<R: Resource>(&self) -> ApiResult<Vec<R>> {
        let bodies: Vec<Value> = match self {
            Self::Postgres(pool) => sqlx::query_scalar::<_, Json<Value>>(
                "SELECT body FROM records WHERE resource = $1 ORDER BY created_at DESC, id",
            )
            .bind(R::KIND)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|Json(body)| body)
            .collect(),
            Self::Memory(table) => {
                let table = table.read();
                table
                    .get(R::KIND)
                    .map(|rows| rows.iter().map(|(_, body)| body.clone()).collect())
                    .unwrap_or_default()
            }
        };

        bodies.into_iter().map(decode::<R>).collect()
    }

    pub async fn get<R: Resource>(&self, id: &str) -> ApiResult<Option<R>> {
        let body = match self {
            Self::Postgres(pool) => sqlx::query_scalar::<_, Json<Value>>(
                "SELECT body FROM records WHERE resource = $1 AND id = $2",
            )
            .bind(R::KIND)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(|Json(body)| body),
            Self::Memory(table) => {
                let table = table.read();
                table.get(R::KIND).and_then(|rows| {
                    rows.iter()
                        .find(|(row_id, _)| row_id == id)
                        .map(|(_, body)| body.clone())
                })
            }
        };

        body.map(decode::<R>).transpose()
    }

    pub async fn insert<R: Resource>(&self, record: &R) -> ApiResult<()> {
        let body = encode(record)?;
        match self {
            Self::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO records (resource, id, body, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(R::KIND)
                .bind(record.id())
                .bind(Json(body))
                .bind(record.audit().created_at)
                .bind(record.audit().updated_at)
                .execute(pool)
                .await?;
            }
            Self::Memory(table) => {
                let mut table = table.write();
                let rows = table.entry(R::KIND).or_default();
                if rows.iter().any(|(row_id, _)| row_id == record.id()) {
                    return Err(ApiError::Conflict(format!(
                        "{} {} already exists",
                        R::KIND,
                        record.id()
                    )));
                }
                rows.insert(0, (record.id().to_string(), body));
            }
        }
        Ok(())
    }

    /// Remove a record. Returns false when it did not exist.
    pub async fn delete<R: Resource>(&self, id: &str) -> ApiResult<bool> {
        match self {
            Self::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM records WHERE resource = $1 AND id = $2")
                    .bind(R::KIND)
                    .bind(id)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            Self::Memory(table) => {
                let mut table = table.write();
                let Some(rows) = table.get_mut(R::KIND) else {
                    return Ok(false);
                };
                let before = rows.len();
                rows.retain(|(row_id, _)| row_id != id);
                Ok(rows.len() < before)
            }
        }
    }

    /// Load record `id`, transform it with `f` and store the result.
    ///
    /// Nothing is written when `f` fails.
    pub async fn modify<R, F>(&self, id: &str, f: F) -> ApiResult<R>
    where
        R: Resource,
        F: FnOnce(R) -> ApiResult<R> + Send,
    {
        match self {
            Self::Postgres(pool) => {
                let mut tx = pool.begin().await?;

                let body = sqlx::query_scalar::<_, Json<Value>>(
                    "SELECT body FROM records WHERE resource = $1 AND id = $2 FOR UPDATE",
                )
                .bind(R::KIND)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| not_found::<R>(id))?;

                let updated = f(decode(body.0)?)?;

                sqlx::query(
                    "UPDATE records SET body = $3, updated_at = $4 WHERE resource = $1 AND id = $2",
                )
                .bind(R::KIND)
                .bind(id)
                .bind(Json(encode(&updated)?))
                .bind(updated.audit().updated_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(updated)
            }
            Self::Memory(table) => {
                let mut table = table.write();
                let slot = table
                    .get_mut(R::KIND)
                    .and_then(|rows| rows.iter_mut().find(|(row_id, _)| row_id == id))
                    .ok_or_else(|| not_found::<R>(id))?;

                let updated = f(decode(slot.1.clone())?)?;
                slot.1 = encode(&updated)?;
                Ok(updated)
            }
        }
    }
}

pub fn not_found<R: Resource>(id: &str) -> ApiError {
    ApiError::not_found(format!("{} record {} not found", R::KIND, id))
}

fn encode<R: Resource>(record: &R) -> ApiResult<Value> {
    Ok(serde_json::to_value(record).context("Failed to serialize record")?)
}

fn decode<R: Resource>(body: Value) -> ApiResult<R> {
    Ok(serde_json::from_value(body)
        .with_context(|| format!("Stored {} record does not match its type", R::KIND))?)
}
