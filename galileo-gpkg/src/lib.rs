//! Reader of GeoPackage feature tables.
//!
//! [`read_package`] enumerates the feature tables of a [`GpkgDatabase`], derives field definitions
//! for every table, attaches SLD styles stored in the `layer_styles` table, and decodes feature
//! geometries with the [`geometry`] decoder.

use std::collections::HashMap;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

pub mod database;
pub mod error;
pub mod geometry;

pub use database::{
    ColumnInfo, GpkgDatabase, GpkgOpener, MemoryDatabase, MemoryOpener, SqlValue, TableInfo,
};
use error::GpkgError;

/// Type of a field as exposed to the users of the layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Date or date-time value.
    Date,
    /// Integer or floating point value.
    Number,
    /// Anything else.
    String,
}

/// Field of a feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpkgField {
    /// Column name.
    pub name: String,
    /// Inferred field type.
    pub field_type: FieldType,
}

/// Single feature of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct GpkgFeature {
    /// Decoded geometry. `None` if the geometry cell is `NULL`.
    pub geometry: Option<Geometry<f64>>,
    /// Attribute values in the order of [`GpkgTable::fields`].
    pub properties: Vec<SqlValue>,
}

/// Feature table with its fields, style and features.
#[derive(Debug, Clone, PartialEq)]
pub struct GpkgTable {
    /// Table description from the package contents.
    pub info: TableInfo,
    /// Attribute fields. The geometry column is not included.
    pub fields: Vec<GpkgField>,
    /// SLD document from the `layer_styles` table.
    pub style_sld: Option<String>,
    /// Features of the table.
    pub features: Vec<GpkgFeature>,
}

/// Content of a package.
#[derive(Debug, Default)]
pub struct PackageContent {
    /// Tables that were read successfully.
    pub tables: Vec<GpkgTable>,
    /// Tables that failed to be read, with the reason.
    pub failed: Vec<(String, GpkgError)>,
}

impl PackageContent {
    /// Returns the table with the given name.
    pub fn table(&self, name: &str) -> Option<&GpkgTable> {
        self.tables.iter().find(|table| table.info.name == name)
    }

    /// Returns the error of the table with the given name, if reading it failed.
    pub fn table_error(&self, name: &str) -> Option<&GpkgError> {
        self.failed
            .iter()
            .find(|(table, _)| table == name)
            .map(|(_, error)| error)
    }
}

/// Reads all feature tables of the database.
///
/// A failure to read one table does not prevent reading the others. Only failures to list the
/// tables are returned as an error.
pub async fn read_package(db: &dyn GpkgDatabase) -> Result<PackageContent, GpkgError> {
    let infos = db.feature_tables().await?;
    let mut styles: HashMap<String, String> = HashMap::new();
    for (table, sld) in db.layer_styles().await? {
        // The first style registered for a table is the default one.
        styles.entry(table).or_insert(sld);
    }

    let mut content = PackageContent::default();
    for info in infos {
        let name = info.name.clone();
        let style_sld = styles.get(&name).cloned();
        match read_table(db, info, style_sld).await {
            Ok(table) => content.tables.push(table),
            Err(error) => {
                log::warn!("Failed to read table {name}: {error}");
                content.failed.push((name, error));
            }
        }
    }

    Ok(content)
}

async fn read_table(
    db: &dyn GpkgDatabase,
    info: TableInfo,
    style_sld: Option<String>,
) -> Result<GpkgTable, GpkgError> {
    let columns = db.columns(&info.name).await?;
    let rows = db.rows(&info.name).await?;
    let geometry_index = columns
        .iter()
        .position(|column| column.name.eq_ignore_ascii_case(&info.geometry_column));

    let fields = columns
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != geometry_index)
        .map(|(index, column)| GpkgField {
            name: column.name.clone(),
            field_type: infer_field_type(column, rows.iter().filter_map(|row| row.get(index))),
        })
        .collect();

    let mut features = Vec::with_capacity(rows.len());
    for row in rows {
        let mut geometry = None;
        let mut properties = Vec::with_capacity(row.len());
        for (index, value) in row.into_iter().enumerate() {
            if Some(index) == geometry_index {
                if let SqlValue::Blob(blob) = &value {
                    geometry = Some(crate::geometry::decode_geometry(blob)?);
                }
            } else {
                properties.push(value);
            }
        }

        features.push(GpkgFeature {
            geometry,
            properties,
        });
    }

    log::debug!(
        "Read table {} with {} features",
        info.name,
        features.len()
    );

    Ok(GpkgTable {
        info,
        fields,
        style_sld,
        features,
    })
}

/// Infers the type of a column from its declared type and the values stored in it.
///
/// Columns declared as dates are `Date`. Otherwise the first non-null value decides: numeric
/// values give `Number`, ISO dates (`YYYY-MM-DD...`) give `Date`, anything else `String`. Columns
/// without values fall back to the declared type.
pub fn infer_field_type<'a>(
    column: &ColumnInfo,
    values: impl IntoIterator<Item = &'a SqlValue>,
) -> FieldType {
    let declared = column.declared_type.to_ascii_uppercase();
    if declared.starts_with("DATE") || declared.starts_with("TIMESTAMP") {
        return FieldType::Date;
    }

    let sample = values
        .into_iter()
        .find(|value| !matches!(value, SqlValue::Null));
    match sample {
        Some(SqlValue::Integer(_)) | Some(SqlValue::Real(_)) => FieldType::Number,
        Some(SqlValue::Text(text)) if is_iso_date(text) => FieldType::Date,
        Some(_) => FieldType::String,
        None if is_numeric_declaration(&declared) => FieldType::Number,
        None => FieldType::String,
    }
}

fn is_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return false;
    }

    bytes[..10].iter().enumerate().all(|(index, byte)| match index {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    }) && (bytes.len() == 10 || matches!(bytes[10], b'T' | b' '))
}

fn is_numeric_declaration(declared: &str) -> bool {
    ["INT", "REAL", "DOUBLE", "FLOAT", "NUMERIC", "DECIMAL"]
        .iter()
        .any(|numeric| declared.contains(numeric))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::geometry::tests::{blob, wkb_point};

    fn column(name: &str, declared_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    fn parks() -> MemoryDatabase {
        MemoryDatabase::new()
            .with_table(
                TableInfo {
                    name: "parks".into(),
                    geometry_column: "geom".into(),
                    geometry_type: "POINT".into(),
                    srs_id: 4326,
                },
                vec![
                    column("fid", "INTEGER"),
                    column("geom", "POINT"),
                    column("name", "TEXT"),
                    column("opened", "DATE"),
                    column("area", ""),
                ],
                vec![vec![
                    SqlValue::Integer(1),
                    SqlValue::Blob(blob(1, 4326, &wkb_point(1.0, 2.0))),
                    SqlValue::Text("Central".into()),
                    SqlValue::Text("2001-01-01".into()),
                    SqlValue::Real(10.5),
                ]],
            )
            .with_style("parks", "<StyledLayerDescriptor/>")
    }

    #[test]
    fn field_type_inference() {
        let date = column("d", "DATETIME");
        assert_eq!(infer_field_type(&date, &[SqlValue::Integer(1)]), FieldType::Date);

        let untyped = column("v", "");
        assert_eq!(
            infer_field_type(&untyped, &[SqlValue::Null, SqlValue::Real(1.0)]),
            FieldType::Number
        );
        assert_eq!(
            infer_field_type(&untyped, &[SqlValue::Text("a".into())]),
            FieldType::String
        );
        assert_eq!(
            infer_field_type(&untyped, &[SqlValue::Text("2024-03-01T10:00:00Z".into())]),
            FieldType::Date
        );
        assert_eq!(
            infer_field_type(&untyped, &[SqlValue::Text("2024-03-01 10:00:00".into())]),
            FieldType::Date
        );
        assert_eq!(
            infer_field_type(&untyped, &[SqlValue::Text("2024-3-1".into())]),
            FieldType::String
        );
        assert_eq!(infer_field_type(&untyped, std::iter::empty()), FieldType::String);

        let integer = column("v", "MEDIUMINT");
        assert_eq!(infer_field_type(&integer, std::iter::empty()), FieldType::Number);
    }

    #[tokio::test]
    async fn reads_tables() {
        let db = parks();
        let content = read_package(&db).await.unwrap();
        let table = content.table("parks").unwrap();

        let fields: Vec<(&str, FieldType)> = table
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("fid", FieldType::Number),
                ("name", FieldType::String),
                ("opened", FieldType::Date),
                ("area", FieldType::Number),
            ]
        );
        assert_eq!(table.style_sld.as_deref(), Some("<StyledLayerDescriptor/>"));
        assert_eq!(table.features.len(), 1);
        assert_eq!(
            table.features[0].geometry,
            Some(Geometry::Point(geo_types::Point::new(1.0, 2.0)))
        );
        assert_eq!(table.features[0].properties.len(), 4);
    }

    #[tokio::test]
    async fn failed_table_does_not_affect_others() {
        let broken_blob = {
            let mut blob = blob(0, 4326, &wkb_point(1.0, 2.0));
            blob[3] = 7 << 1;
            blob
        };
        let db = parks().with_table(
            TableInfo {
                name: "broken".into(),
                geometry_column: "geom".into(),
                geometry_type: "POINT".into(),
                srs_id: 4326,
            },
            vec![column("geom", "POINT")],
            vec![vec![SqlValue::Blob(broken_blob)]],
        );

        let content = read_package(&db).await.unwrap();
        assert!(content.table("parks").is_some());
        assert!(content.table("broken").is_none());
        assert_matches!(
            content.table_error("broken"),
            Some(GpkgError::UnsupportedGeometryEnvelope(7))
        );
    }
}
