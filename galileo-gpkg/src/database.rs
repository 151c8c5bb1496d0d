//! Access to the tables of a GeoPackage database.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::GpkgError;

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteOpener};

/// A single value stored in a database cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// `NULL`
    Null,
    /// Integer storage class.
    Integer(i64),
    /// Floating point storage class.
    Real(f64),
    /// Text storage class.
    Text(String),
    /// Blob storage class.
    Blob(Vec<u8>),
}

/// Feature table registered in `gpkg_contents` and `gpkg_geometry_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Name of the table.
    pub name: String,
    /// Name of the column that stores geometry blobs.
    pub geometry_column: String,
    /// Geometry type name, e.g. `POINT` or `MULTIPOLYGON`.
    pub geometry_type: String,
    /// Spatial reference system id of the table.
    pub srs_id: i32,
}

/// Column of a table as declared in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type of the column, can be empty.
    pub declared_type: String,
}

/// Read-only access to a GeoPackage database.
#[async_trait]
pub trait GpkgDatabase: Send + Sync {
    /// Lists feature tables of the database.
    async fn feature_tables(&self) -> Result<Vec<TableInfo>, GpkgError>;
    /// Lists columns of the given table in the schema order.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, GpkgError>;
    /// Returns all rows of the given table. Values are in the order of [`GpkgDatabase::columns`].
    async fn rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>, GpkgError>;
    /// Returns `(table name, SLD document)` pairs from the `layer_styles` table, if present.
    async fn layer_styles(&self) -> Result<Vec<(String, String)>, GpkgError>;
}

/// Opens a database from its binary content.
#[async_trait]
pub trait GpkgOpener: Send + Sync {
    /// Opens the database stored in `bytes`.
    async fn open(&self, bytes: Bytes) -> Result<Box<dyn GpkgDatabase>, GpkgError>;
}

/// Database stored in memory. Useful when the content of the package is produced by other means than
/// SQLite, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Vec<MemoryTable>,
    styles: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    info: TableInfo,
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<SqlValue>>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature table.
    pub fn with_table(
        mut self,
        info: TableInfo,
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Self {
        self.tables.push(MemoryTable {
            info,
            columns,
            rows,
        });
        self
    }

    /// Adds an SLD style for the table.
    pub fn with_style(mut self, table: impl Into<String>, sld: impl Into<String>) -> Self {
        self.styles.push((table.into(), sld.into()));
        self
    }

    fn table(&self, name: &str) -> Result<&MemoryTable, GpkgError> {
        self.tables
            .iter()
            .find(|table| table.info.name == name)
            .ok_or_else(|| GpkgError::TableNotFound(name.to_string()))
    }
}

#[async_trait]
impl GpkgDatabase for MemoryDatabase {
    async fn feature_tables(&self) -> Result<Vec<TableInfo>, GpkgError> {
        Ok(self.tables.iter().map(|table| table.info.clone()).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>, GpkgError> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>, GpkgError> {
        Ok(self.table(table)?.rows.clone())
    }

    async fn layer_styles(&self) -> Result<Vec<(String, String)>, GpkgError> {
        Ok(self.styles.clone())
    }
}

/// Opener that ignores the binary content and always returns a copy of the given in-memory database.
#[derive(Debug, Clone)]
pub struct MemoryOpener(pub MemoryDatabase);

#[async_trait]
impl GpkgOpener for MemoryOpener {
    async fn open(&self, _bytes: Bytes) -> Result<Box<dyn GpkgDatabase>, GpkgError> {
        Ok(Box::new(self.0.clone()))
    }
}
