use crate::model::GroundGeometry;
use crate::prelude::ViewSynchronizer;
use crate::views::{RenderContext, TrackView};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayerShape {
    /// Exterior ring as `[lat, lon]` pairs.
    Polygon { ring: Vec<[f64; 2]> },
    Marker { lat: f64, lon: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundLayer {
    pub id: String,
    pub name: String,
    pub shape: LayerShape,
    pub description: Option<String>,
}

/// Desired map state for one context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub generation: u64,
    pub grounds: Vec<GroundLayer>,
    /// `[lat, lon]` of each boat detection.
    pub boats: Vec<[f64; 2]>,
    pub boats_visible: bool,
    pub center: Option<[f64; 2]>,
}

#[derive(Debug, Default)]
pub struct MapLayerSynchronizer;

impl ViewSynchronizer for MapLayerSynchronizer {
    type Output = MapView;

    fn name(&self) -> &'static str {
        "map_layers"
    }

    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output {
        let grounds: Vec<GroundLayer> = context
            .dataset()
            .fishing_grounds
            .iter()
            .filter_map(|ground| {
                let shape = match &ground.geometry {
                    GroundGeometry::Polygon { ring } if !ring.is_empty() => LayerShape::Polygon {
                        ring: ring.iter().map(|[lon, lat]| [*lat, *lon]).collect(),
                    },
                    GroundGeometry::Point { lat, lon } => LayerShape::Marker {
                        lat: *lat,
                        lon: *lon,
                    },
                    _ => return None,
                };
                Some(GroundLayer {
                    id: format!("ground-{}", ground.index),
                    name: ground.name.clone(),
                    shape,
                    description: ground.description.clone(),
                })
            })
            .collect();

        let center = context
            .selected_storm()
            .and_then(|storm| storm.track.first())
            .map(|point| [point.lat, point.lon])
            .or_else(|| {
                context
                    .dataset()
                    .fishing_grounds
                    .iter()
                    .find_map(|ground| ground.geometry.centroid())
                    .map(|(lat, lon)| [lat, lon])
            });

        MapView {
            generation: context.snapshot.generation,
            grounds,
            boats: context
                .snapshot
                .detections
                .iter()
                .map(|point| [point.lat, point.lon])
                .collect(),
            boats_visible: context.snapshot.boats_visible,
            center,
        }
    }
}

/// Imperative change applied to a live map widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayerOp {
    RemoveLayer { id: String },
    AddLayer { layer: GroundLayer },
    AttachBoats { count: usize },
    DetachBoats,
    ClearTrack,
    DrawTrack { points: usize },
}

/// Layers currently attached to a live map. Turns successive [`MapView`]s and
/// [`TrackView`]s into the minimal ops: ground layers are removed and re-added
/// only when the dataset generation changes, the boat layer is attached or
/// detached on visibility flips, and the track is cleared before redrawing.
#[derive(Debug, Default)]
pub struct MapLayerRegistry {
    generation: Option<u64>,
    ground_ids: Vec<String>,
    boats_attached: bool,
    track: Option<TrackView>,
}

impl MapLayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, map: &MapView, track: &TrackView) -> Vec<LayerOp> {
        let mut ops = Vec::new();

        if self.generation != Some(map.generation) {
            ops.extend(
                self.ground_ids
                    .drain(..)
                    .map(|id| LayerOp::RemoveLayer { id }),
            );
            for layer in &map.grounds {
                self.ground_ids.push(layer.id.clone());
                ops.push(LayerOp::AddLayer {
                    layer: layer.clone(),
                });
            }
            if self.boats_attached {
                ops.push(LayerOp::DetachBoats);
                self.boats_attached = false;
            }
            self.generation = Some(map.generation);
        }

        if map.boats_visible != self.boats_attached {
            ops.push(if map.boats_visible {
                LayerOp::AttachBoats {
                    count: map.boats.len(),
                }
            } else {
                LayerOp::DetachBoats
            });
            self.boats_attached = map.boats_visible;
        }

        if self.track.as_ref() != Some(track) {
            if self.track.is_some() {
                ops.push(LayerOp::ClearTrack);
            }
            if !track.polyline.is_empty() {
                ops.push(LayerOp::DrawTrack {
                    points: track.polyline.len(),
                });
            }
            self.track = Some(track.clone());
        }
        ops
    }

    pub fn ground_ids(&self) -> &[String] {
        &self.ground_ids
    }

    pub fn boats_attached(&self) -> bool {
        self.boats_attached
    }
}
