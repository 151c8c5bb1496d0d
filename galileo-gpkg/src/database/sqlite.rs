use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tempfile::NamedTempFile;

use super::{ColumnInfo, GpkgDatabase, GpkgOpener, SqlValue, TableInfo};
use crate::error::GpkgError;

const FEATURE_TABLES_QUERY: &str = "SELECT c.table_name AS table_name, g.column_name AS column_name, \
     g.geometry_type_name AS geometry_type_name, g.srs_id AS srs_id \
     FROM gpkg_contents c JOIN gpkg_geometry_columns g ON c.table_name = g.table_name \
     WHERE c.data_type = 'features'";

const HAS_STYLES_QUERY: &str =
    "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'layer_styles'";

/// GeoPackage stored in an SQLite database file.
pub struct SqliteDatabase {
    pool: SqlitePool,
    _file: Option<NamedTempFile>,
}

impl SqliteDatabase {
    /// Opens an existing GeoPackage file in read-only mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GpkgError> {
        let pool = connect(path.as_ref()).await?;
        Ok(Self { pool, _file: None })
    }

    /// Stores the content of a GeoPackage in a temporary file and opens it. The file is removed when
    /// the database is dropped.
    pub async fn from_bytes(bytes: &[u8]) -> Result<Self, GpkgError> {
        let file = NamedTempFile::new()?;
        tokio::fs::write(file.path(), bytes).await?;
        log::debug!("GeoPackage of {} bytes stored in {:?}", bytes.len(), file.path());

        let pool = connect(file.path()).await?;
        Ok(Self {
            pool,
            _file: Some(file),
        })
    }
}

async fn connect(path: &Path) -> Result<SqlitePool, GpkgError> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    Ok(SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn read_value(row: &SqliteRow, index: usize) -> Result<SqlValue, GpkgError> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(index)?),
        "REAL" => SqlValue::Real(row.try_get(index)?),
        "BLOB" => SqlValue::Blob(row.try_get(index)?),
        _ => SqlValue::Text(row.try_get(index)?),
    };

    Ok(value)
}

#[async_trait]
impl GpkgDatabase for SqliteDatabase {
    async fn feature_tables(&self) -> Result<Vec<TableInfo>, GpkgError> {
        let rows = sqlx::query(FEATURE_TABLES_QUERY)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(TableInfo {
                    name: row.try_get("table_name")?,
                    geometry_column: row.try_get("column_name")?,
                    geometry_type: row.try_get("geometry_type_name")?,
                    srs_id: row.try_get::<i64, _>("srs_id")? as i32,
                })
            })
            .collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, GpkgError> {
        let query = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Err(GpkgError::TableNotFound(table.to_string()));
        }

        rows.iter()
            .map(|row| {
                Ok(ColumnInfo {
                    name: row.try_get("name")?,
                    declared_type: row.try_get("type")?,
                })
            })
            .collect()
    }

    async fn rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>, GpkgError> {
        let query = format!("SELECT * FROM {}", quote_identifier(table));
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| (0..row.len()).map(|index| read_value(row, index)).collect())
            .collect()
    }

    async fn layer_styles(&self) -> Result<Vec<(String, String)>, GpkgError> {
        let has_styles: i64 = sqlx::query(HAS_STYLES_QUERY)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        if has_styles == 0 {
            return Ok(vec![]);
        }

        let rows = sqlx::query("SELECT f_table_name, styleSLD FROM layer_styles")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Ok((row.try_get("f_table_name")?, row.try_get("styleSLD")?)))
            .collect()
    }
}

/// Opens GeoPackage blobs with SQLite.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteOpener;

#[async_trait]
impl GpkgOpener for SqliteOpener {
    async fn open(&self, bytes: Bytes) -> Result<Box<dyn GpkgDatabase>, GpkgError> {
        Ok(Box::new(SqliteDatabase::from_bytes(&bytes).await?))
    }
}
