//! Host-supplied data: view snapshots, published vector layers and themes.
//!
//! The host application (the owner of the live map canvas and project)
//! implements these traits; the service only ever sees value snapshots.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use mapview_common::layer::{FieldDef, FieldKind, GeometryKind, SymbolStyle};
use mapview_common::theme::LayerState;
use mapview_common::{
    BoundingBox, CrsCode, Feature, MapViewSnapshot, ThemeState, VectorLayer,
};

/// Provider of the current map view.
#[async_trait]
pub trait ViewSnapshotProvider: Send + Sync {
    async fn current_view(&self) -> MapViewSnapshot;
}

/// Published vector layers and named themes.
#[async_trait]
pub trait LayerStore: ViewSnapshotProvider {
    /// Layers exported for WFS/WMTS serving, in paint order.
    async fn vector_layers(&self) -> Vec<VectorLayer>;

    /// Resolve a named theme to per-layer display state.
    async fn theme(&self, theme_id: &str) -> Option<ThemeState>;
}

/// In-memory store used by the standalone binary and tests.
pub struct InMemoryLayerStore {
    view: RwLock<MapViewSnapshot>,
    layers: RwLock<Vec<VectorLayer>>,
    themes: RwLock<BTreeMap<String, ThemeState>>,
}

impl InMemoryLayerStore {
    pub fn new(view: MapViewSnapshot) -> Self {
        Self {
            view: RwLock::new(view),
            layers: RwLock::new(Vec::new()),
            themes: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn set_view(&self, view: MapViewSnapshot) {
        *self.view.write().await = view;
    }

    pub async fn publish_layer(&self, layer: VectorLayer) {
        self.layers.write().await.push(layer);
    }

    pub async fn insert_theme(&self, id: impl Into<String>, theme: ThemeState) {
        self.themes.write().await.insert(id.into(), theme);
    }

    /// A store seeded with a small demo project around Tokyo.
    pub fn with_sample_data() -> Self {
        let landmarks = VectorLayer {
            id: "landmarks".to_string(),
            title: "Landmarks".to_string(),
            crs: CrsCode::Epsg4326,
            geometry: GeometryKind::Point,
            wgs84_bbox: BoundingBox::new(139.4, 35.4, 139.9, 35.9),
            fields: vec![
                FieldDef {
                    name: "name".to_string(),
                    kind: FieldKind::String,
                },
                FieldDef {
                    name: "kind".to_string(),
                    kind: FieldKind::String,
                },
            ],
            style: SymbolStyle {
                color: "#e03131".to_string(),
                stroke_color: Some("#1a1a1a".to_string()),
                size: Some(6.0),
                opacity: 1.0,
            },
            visible: true,
            features: vec![
                Feature {
                    id: 1,
                    geometry: serde_json::json!({
                        "type": "Point",
                        "coordinates": [139.6917, 35.6895]
                    }),
                    properties: BTreeMap::from([
                        ("name".to_string(), serde_json::json!("Shinjuku")),
                        ("kind".to_string(), serde_json::json!("station")),
                    ]),
                },
                Feature {
                    id: 2,
                    geometry: serde_json::json!({
                        "type": "Point",
                        "coordinates": [139.7454, 35.6586]
                    }),
                    properties: BTreeMap::from([
                        ("name".to_string(), serde_json::json!("Tokyo Tower")),
                        ("kind".to_string(), serde_json::json!("tower")),
                    ]),
                },
            ],
        };

        let mut theme = ThemeState::new("StandardMap");
        theme.layer_states.insert(
            "landmarks".to_string(),
            LayerState {
                name: "Landmarks".to_string(),
                visible: true,
                opacity: 1.0,
                current_style: None,
            },
        );

        Self {
            view: RwLock::new(MapViewSnapshot {
                center: (15550408.0, 4257415.0),
                scale: 40_000.0,
                rotation: 0.0,
                crs: CrsCode::Epsg3857,
                width: 1024,
                height: 768,
            }),
            layers: RwLock::new(vec![landmarks]),
            themes: RwLock::new(BTreeMap::from([("StandardMap".to_string(), theme)])),
        }
    }
}

#[async_trait]
impl ViewSnapshotProvider for InMemoryLayerStore {
    async fn current_view(&self) -> MapViewSnapshot {
        self.view.read().await.clone()
    }
}

#[async_trait]
impl LayerStore for InMemoryLayerStore {
    async fn vector_layers(&self) -> Vec<VectorLayer> {
        self.layers.read().await.clone()
    }

    async fn theme(&self, theme_id: &str) -> Option<ThemeState> {
        self.themes.read().await.get(theme_id).cloned()
    }
}
