//! GeoPackage content as layer metadata.

use bytes::Bytes;
use galileo_gpkg::error::GpkgError;
use galileo_gpkg::{read_package, GpkgFeature, GpkgField, GpkgOpener, PackageContent, TableInfo};

use crate::error::LayerConfigError;
use crate::style::sld::style_from_sld;
use crate::style::{GeometryKind, StyleDefinition};

/// Feature table of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackagedTable {
    /// Table description.
    pub info: TableInfo,
    /// Geometry kind of the table.
    pub geometry_kind: Option<GeometryKind>,
    /// Attribute fields.
    pub fields: Vec<GpkgField>,
    /// Style from the `layer_styles` table. Empty if the package has no style for the table or the
    /// style cannot be read.
    pub style: StyleDefinition,
    /// Features.
    pub features: Vec<GpkgFeature>,
}

/// Content of a GeoPackage.
#[derive(Debug, Clone, Default)]
pub struct PackagedMetadata {
    /// Tables that were read.
    pub tables: Vec<PackagedTable>,
    /// Tables that could not be read.
    pub failed: Vec<(String, GpkgError)>,
}

impl PackagedMetadata {
    /// Opens the package and reads all its feature tables.
    pub async fn load(opener: &dyn GpkgOpener, bytes: Bytes) -> Result<Self, LayerConfigError> {
        let database = opener.open(bytes).await?;
        let content = read_package(database.as_ref()).await?;
        Ok(Self::from_content(content))
    }

    /// Converts the package content, extracting the table styles.
    pub fn from_content(content: PackageContent) -> Self {
        let tables = content
            .tables
            .into_iter()
            .map(|table| {
                let style = match table.style_sld.as_deref().map(style_from_sld) {
                    Some(Ok(style)) => style,
                    Some(Err(error)) => {
                        log::warn!("Failed to read style of table {}: {error}", table.info.name);
                        StyleDefinition::new()
                    }
                    None => StyleDefinition::new(),
                };

                PackagedTable {
                    geometry_kind: GeometryKind::from_gpkg_type(&table.info.geometry_type),
                    info: table.info,
                    fields: table.fields,
                    style,
                    features: table.features,
                }
            })
            .collect();

        Self {
            tables,
            failed: content.failed,
        }
    }

    /// Table with the given name.
    pub fn table(&self, name: &str) -> Option<&PackagedTable> {
        self.tables.iter().find(|table| table.info.name == name)
    }

    /// Error of the table with the given name, if the table could not be read.
    pub fn table_error(&self, name: &str) -> Option<&GpkgError> {
        self.failed
            .iter()
            .find(|(table, _)| table == name)
            .map(|(_, error)| error)
    }
}
