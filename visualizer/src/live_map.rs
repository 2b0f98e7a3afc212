use cyclonecore::views::{GroundLayer, LayerOp, LayerShape, MapLayerRegistry, MapView, TrackView};

/// Degrees shown around a lone point when nothing else is on the map.
const MIN_SPAN: f64 = 2.0;

/// Western Pacific, shown before any data arrives.
const DEFAULT_EXTENT: Extent = Extent {
    south: 0.0,
    north: 30.0,
    west: 100.0,
    east: 150.0,
};

/// Lat/lon box the map canvas fits to its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Extent {
    fn point(lat: f64, lon: f64) -> Self {
        Self {
            south: lat,
            north: lat,
            west: lon,
            east: lon,
        }
    }

    fn include(&mut self, lat: f64, lon: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lon);
        self.east = self.east.max(lon);
    }

    fn padded(self) -> Self {
        let lat_pad = ((self.north - self.south).max(MIN_SPAN)) * 0.1;
        let lon_pad = ((self.east - self.west).max(MIN_SPAN)) * 0.1;
        let lat_mid = (self.north + self.south) / 2.0;
        let lon_mid = (self.east + self.west) / 2.0;
        let half_lat = (self.north - self.south).max(MIN_SPAN) / 2.0 + lat_pad;
        let half_lon = (self.east - self.west).max(MIN_SPAN) / 2.0 + lon_pad;
        Self {
            south: lat_mid - half_lat,
            north: lat_mid + half_lat,
            west: lon_mid - half_lon,
            east: lon_mid + half_lon,
        }
    }

    /// Equirectangular projection into a `width` x `height` box, keeping the
    /// aspect ratio and centering the extent.
    pub fn project(&self, lat: f64, lon: f64, width: f32, height: f32) -> (f32, f32) {
        let lon_span = (self.east - self.west).max(f64::EPSILON);
        let lat_span = (self.north - self.south).max(f64::EPSILON);
        let scale = (width as f64 / lon_span).min(height as f64 / lat_span);
        let x_offset = (width as f64 - lon_span * scale) / 2.0;
        let y_offset = (height as f64 - lat_span * scale) / 2.0;
        let x = x_offset + (lon - self.west) * scale;
        let y = y_offset + (self.north - lat) * scale;
        (x as f32, y as f32)
    }
}

/// The layers a map widget currently shows, kept in step with successive
/// frames through the ops of a [`MapLayerRegistry`].
#[derive(Debug, Default)]
pub struct LiveMap {
    registry: MapLayerRegistry,
    grounds: Vec<GroundLayer>,
    boats: Option<Vec<[f64; 2]>>,
    track: Option<TrackView>,
    center: Option<[f64; 2]>,
}

impl LiveMap {
    /// Applies the changes between the last synced frame and this one;
    /// returns the ops that were applied.
    pub fn sync(&mut self, map: &MapView, track: &TrackView) -> Vec<LayerOp> {
        let ops = self.registry.apply(map, track);
        for op in &ops {
            match op {
                LayerOp::RemoveLayer { id } => self.grounds.retain(|layer| &layer.id != id),
                LayerOp::AddLayer { layer } => self.grounds.push(layer.clone()),
                LayerOp::AttachBoats { .. } => self.boats = Some(map.boats.clone()),
                LayerOp::DetachBoats => self.boats = None,
                LayerOp::ClearTrack => self.track = None,
                LayerOp::DrawTrack { .. } => self.track = Some(track.clone()),
            }
        }
        if !ops.is_empty() {
            log::debug!("map: applied {} layer ops", ops.len());
        }
        self.center = map.center;
        ops
    }

    pub fn grounds(&self) -> &[GroundLayer] {
        &self.grounds
    }

    pub fn boats(&self) -> &[[f64; 2]] {
        self.boats.as_deref().unwrap_or_default()
    }

    pub fn track(&self) -> Option<&TrackView> {
        self.track.as_ref()
    }

    /// Box around everything drawn, or around the center when nothing is.
    pub fn extent(&self) -> Extent {
        let mut points = self
            .grounds
            .iter()
            .flat_map(|layer| match &layer.shape {
                LayerShape::Polygon { ring } => ring.clone(),
                LayerShape::Marker { lat, lon } => vec![[*lat, *lon]],
            })
            .chain(self.track.iter().flat_map(|track| track.polyline.iter().copied()))
            .filter(|[lat, lon]| lat.is_finite() && lon.is_finite());

        let Some([lat, lon]) = points.next().or(self.center) else {
            return DEFAULT_EXTENT;
        };
        let mut extent = Extent::point(lat, lon);
        for [lat, lon] in points {
            extent.include(lat, lon);
        }
        extent.padded()
    }
}
