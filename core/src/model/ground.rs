use serde::{Deserialize, Serialize};

/// Geometry of a fishing ground. Polygon rings hold `[lon, lat]` pairs, exterior only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GroundGeometry {
    Polygon { ring: Vec<[f64; 2]> },
    Point { lat: f64, lon: f64 },
    None,
}

impl GroundGeometry {
    /// Mean of the ring vertices, or the point itself.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        match self {
            GroundGeometry::Polygon { ring } if !ring.is_empty() => {
                let count = ring.len() as f64;
                let lon = ring.iter().map(|c| c[0]).sum::<f64>() / count;
                let lat = ring.iter().map(|c| c[1]).sum::<f64>() / count;
                Some((lat, lon))
            }
            GroundGeometry::Point { lat, lon } => Some((*lat, *lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishingGround {
    pub index: usize,
    pub name: String,
    pub geometry: GroundGeometry,
    pub description: Option<String>,
}

impl FishingGround {
    /// Placeholder ground used when a dataset carries per-ground arrays but no ground list.
    pub fn synthesized(index: usize) -> Self {
        Self {
            index,
            name: format!("Ground {}", index),
            geometry: GroundGeometry::None,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_centroid_averages_vertices() {
        let geometry = GroundGeometry::Polygon {
            ring: vec![[120.0, 14.0], [122.0, 14.0], [122.0, 16.0], [120.0, 16.0]],
        };
        assert_eq!(geometry.centroid(), Some((15.0, 121.0)));
        assert_eq!(GroundGeometry::None.centroid(), None);
    }
}
