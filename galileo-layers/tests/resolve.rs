use assert_matches::assert_matches;
use galileo_gpkg::{ColumnInfo, MemoryDatabase, MemoryOpener, SqlValue, TableInfo};
use galileo_layers::fetch::{StaticTransport, TransportError};
use galileo_layers::{
    ConfigNode, ErrorKind, LayerConfigError, LayerConfigResolver, LayerDescriptor,
    LayerEntryConfig, LayerStatus, ResolverConfig, ServiceType,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const MAP_SERVER: &str = "https://example.com/arcgis/rest/services/Water/MapServer";
const WMS: &str = "https://example.com/wms";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn resolver(transport: StaticTransport) -> LayerConfigResolver {
    LayerConfigResolver::with_transport(ResolverConfig::default().with_cache_capacity(0), transport)
}

fn esri_layer(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "geometryType": "esriGeometryPolygon",
        "capabilities": "Map,Query",
        "drawingInfo": {"renderer": {
            "type": "simple",
            "symbol": {"type": "esriSFS", "style": "esriSFSSolid", "color": [0, 92, 230, 255]},
        }},
    })
}

fn water_service() -> StaticTransport {
    StaticTransport::new()
        .with_json(
            format!("{MAP_SERVER}?f=json"),
            json!({"layers": [
                {"id": 0, "name": "Water", "subLayerIds": [1, 2]},
                {"id": 1, "name": "Lakes", "geometryType": "esriGeometryPolygon"},
                {"id": 2, "name": "Reservoirs", "geometryType": "esriGeometryPolygon"},
            ]}),
        )
        .with_json(format!("{MAP_SERVER}/1?f=json"), esri_layer(1, "Lakes"))
        .with_json(
            format!("{MAP_SERVER}/2?f=json"),
            json!({"error": {"code": 400, "message": "Layer not found"}}),
        )
}

fn paths(nodes: &[ConfigNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| node.layer_path().to_string())
        .collect()
}

#[tokio::test]
async fn esri_group_with_a_failed_leaf() {
    init_logger();
    let descriptor = LayerDescriptor::new("water", ServiceType::EsriDynamic, MAP_SERVER)
        .with_entries(vec![LayerEntryConfig::group(
            "basins",
            vec![LayerEntryConfig::leaf("1"), LayerEntryConfig::leaf("2")],
        )]);

    let resolved = resolver(water_service())
        .resolve(&descriptor, &CancellationToken::new())
        .await
        .unwrap();

    let group = resolved.tree.find("water/basins").unwrap();
    assert_eq!(group.status(), LayerStatus::Processed);
    assert_eq!(
        paths(group.children()),
        vec!["water/basins/1", "water/basins/2"]
    );

    let lakes = resolved.tree.find("water/basins/1").unwrap().common();
    assert_eq!(lakes.status, LayerStatus::Processed);
    assert!(lakes.feature_info.queryable);
    assert!(!lakes.style.is_empty());

    assert_eq!(
        resolved.tree.find("water/basins/2").unwrap().status(),
        LayerStatus::Error
    );
    assert_eq!(resolved.errors.len(), 1);
    assert_eq!(resolved.errors[0].layer_path, "water/basins/2");
    assert!(resolved.errors[0].message().contains("Layer not found"));
    assert!(resolved.tree.is_settled());
}

#[tokio::test]
async fn esri_group_layer_is_promoted() {
    init_logger();
    let descriptor = LayerDescriptor::new("water", ServiceType::EsriDynamic, MAP_SERVER)
        .with_entries(vec![LayerEntryConfig::leaf("0")]);

    let resolved = resolver(water_service())
        .resolve(&descriptor, &CancellationToken::new())
        .await
        .unwrap();

    let water = resolved.tree.find("water/0").unwrap();
    assert!(water.is_group());
    assert_eq!(water.common().name.en.as_deref(), Some("Water"));
    assert_eq!(
        paths(water.children()),
        vec!["water/0/1", "water/0/2"]
    );
    assert_eq!(water.status(), LayerStatus::Processed);
    assert_eq!(resolved.errors.len(), 1);
    assert_eq!(resolved.errors[0].kind(), ErrorKind::ServiceMetadataContent);
}

#[tokio::test]
async fn unreachable_service_fails_the_descriptor_only() {
    init_logger();
    let transport = water_service().with_failure(
        "https://example.com/arcgis/rest/services/Roads/MapServer?f=json",
        TransportError::Status(503),
    );
    let descriptors = vec![
        LayerDescriptor::new(
            "roads",
            ServiceType::EsriDynamic,
            "https://example.com/arcgis/rest/services/Roads/MapServer",
        ),
        LayerDescriptor::new("water", ServiceType::EsriDynamic, MAP_SERVER)
            .with_entries(vec![LayerEntryConfig::leaf("1")]),
    ];

    let results = resolver(transport)
        .resolve_all(&descriptors, &CancellationToken::new())
        .await;

    assert_matches!(
        &results[0],
        Err(LayerConfigError::ServiceMetadataFetch { .. })
    );
    let water = results[1].as_ref().unwrap();
    assert!(water.errors.is_empty());
    assert_eq!(
        water.tree.find("water/1").unwrap().status(),
        LayerStatus::Processed
    );
}

const CAPABILITIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0">
  <Service><Title>Weather</Title></Service>
  <Capability>
    <Request>
      <GetMap>
        <Format>image/png</Format>
        <DCPType><HTTP><Get><OnlineResource href="https://example.com/wms?"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Layer>
      <Title>Weather</Title>
      <CRS>EPSG:4326</CRS>
      <Layer queryable="1">
        <Name>radar</Name>
        <Title>Radar</Title>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

const SATELLITE_CAPABILITIES: &str = r#"<WMS_Capabilities version="1.3.0">
  <Capability>
    <Layer>
      <Title>Weather</Title>
      <CRS>EPSG:3857</CRS>
      <Layer>
        <Name>satellite</Name>
        <Title>Satellite</Title>
        <MinScaleDenominator>1000</MinScaleDenominator>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

#[tokio::test]
async fn wms_layers_are_merged_from_separate_documents() {
    init_logger();
    let capabilities_url = format!("{WMS}?service=WMS&request=GetCapabilities");
    let transport = StaticTransport::new()
        .with_text(capabilities_url.clone(), CAPABILITIES)
        .with_text(format!("{capabilities_url}&layers=radar"), CAPABILITIES)
        .with_text(
            format!("{capabilities_url}&layers=satellite"),
            SATELLITE_CAPABILITIES,
        );
    let descriptor = LayerDescriptor::new("weather", ServiceType::Wms, WMS)
        .with_entries(vec![
            LayerEntryConfig::leaf("radar"),
            LayerEntryConfig::leaf("satellite"),
        ])
        .with_fetch_per_layer(true);

    let resolved = resolver(transport)
        .resolve(&descriptor, &CancellationToken::new())
        .await
        .unwrap();

    assert!(resolved.errors.is_empty(), "{:?}", resolved.errors);
    let radar = resolved.tree.find("weather/radar").unwrap().common();
    assert!(radar.feature_info.queryable);
    assert_eq!(radar.source.projection, Some(4326));

    let satellite = resolved.tree.find("weather/satellite").unwrap().common();
    assert_eq!(satellite.status, LayerStatus::Processed);
    assert_eq!(satellite.scale_limits.max_scale, Some(1000.0));
    assert_eq!(satellite.source.projection, Some(3857));

    let document = resolved.metadata.as_capabilities().unwrap();
    assert!(document.find_layer("satellite").is_some());
}

#[tokio::test]
async fn wms_exception_report_fails_the_descriptor() {
    init_logger();
    let report = r#"<ServiceExceptionReport version="1.3.0">
        <ServiceException code="InvalidFormat">Unknown service</ServiceException>
    </ServiceExceptionReport>"#;
    let transport = StaticTransport::new()
        .with_text(format!("{WMS}?service=WMS&request=GetCapabilities"), report);
    let descriptor = LayerDescriptor::new("weather", ServiceType::Wms, WMS);

    let result = resolver(transport)
        .resolve(&descriptor, &CancellationToken::new())
        .await;

    assert_matches!(
        result,
        Err(LayerConfigError::ServiceMetadataContent { message, .. }) if message.contains("Unknown service")
    );
}

#[tokio::test]
async fn geopackage_tables() {
    init_logger();
    let database = MemoryDatabase::new()
        .with_table(
            TableInfo {
                name: "hydrants".into(),
                geometry_column: "geom".into(),
                geometry_type: "POINT".into(),
                srs_id: 4326,
            },
            vec![
                ColumnInfo {
                    name: "geom".into(),
                    declared_type: "POINT".into(),
                },
                ColumnInfo {
                    name: "pressure".into(),
                    declared_type: "REAL".into(),
                },
            ],
            vec![vec![SqlValue::Null, SqlValue::Real(4.5)]],
        )
        .with_style("hydrants", "not an sld document");
    let config = ResolverConfig::default().with_gpkg_opener(MemoryOpener(database));
    let transport =
        StaticTransport::new().with_bytes("https://example.com/data/city.gpkg", vec![0u8; 16]);
    let resolver = LayerConfigResolver::with_transport(config, transport);
    let descriptor = LayerDescriptor::new(
        "city",
        ServiceType::GeoPackage,
        "https://example.com/data/city.gpkg",
    )
    .with_entries(vec![
        LayerEntryConfig::leaf("hydrants"),
        LayerEntryConfig::leaf("parcels"),
    ]);

    let resolved = resolver
        .resolve(&descriptor, &CancellationToken::new())
        .await
        .unwrap();

    let hydrants = resolved.tree.find("city/hydrants").unwrap().common();
    assert_eq!(hydrants.status, LayerStatus::Processed);
    assert_eq!(hydrants.source.projection, Some(4326));
    assert_eq!(hydrants.feature_info.fields.len(), 1);
    assert_eq!(hydrants.feature_info.fields[0].name, "pressure");

    assert_eq!(
        resolved.tree.find("city/parcels").unwrap().status(),
        LayerStatus::Error
    );
    assert_eq!(resolved.errors.len(), 1);
    assert_eq!(resolved.errors[0].kind(), ErrorKind::LayerIdNotFound);
}
