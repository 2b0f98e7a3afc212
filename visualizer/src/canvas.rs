use crate::live_map::LiveMap;
use cyclonecore::views::{AxisBounds, BarTone, DualAxisChartView, LayerShape, RankedChartView};
use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Pixels, Point, Rectangle, Renderer, Size, Theme,
};

const BACKGROUND: Color = Color::from_rgb(0.05, 0.05, 0.07);
const GRID: Color = Color::from_rgb(0.25, 0.25, 0.3);
const LABEL: Color = Color::from_rgb(0.8, 0.8, 0.85);
const GREEN: Color = Color::from_rgb(0.3, 0.75, 0.4);
const RED: Color = Color::from_rgb(0.85, 0.3, 0.3);
const BASELINE: Color = Color::from_rgb(0.25, 0.55, 0.9);
const HIGHLIGHT: Color = Color::from_rgb(0.95, 0.7, 0.2);

fn label(frame: &mut Frame, content: impl Into<String>, position: Point, size: f32, color: Color) {
    frame.fill_text(canvas::Text {
        content: content.into(),
        position,
        color,
        size: Pixels(size),
        ..canvas::Text::default()
    });
}

fn background(frame: &mut Frame, bounds: Rectangle) {
    frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND);
}

/// Fishing grounds, boat detections and the selected storm's track.
pub struct MapCanvas<'a> {
    map: &'a LiveMap,
}

impl<'a> MapCanvas<'a> {
    pub fn new(map: &'a LiveMap) -> Self {
        Self { map }
    }
}

impl<Message> canvas::Program<Message> for MapCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.03, 0.08, 0.16));

        let extent = self.map.extent();
        let project = |lat: f64, lon: f64| {
            let (x, y) = extent.project(lat, lon, bounds.width, bounds.height);
            Point::new(x, y)
        };

        for layer in self.map.grounds() {
            match &layer.shape {
                LayerShape::Polygon { ring } if ring.len() > 2 => {
                    let outline = Path::new(|builder| {
                        for (i, [lat, lon]) in ring.iter().enumerate() {
                            if i == 0 {
                                builder.move_to(project(*lat, *lon));
                            } else {
                                builder.line_to(project(*lat, *lon));
                            }
                        }
                        builder.close();
                    });
                    frame.fill(&outline, Color::from_rgba(0.3, 0.75, 0.4, 0.25));
                    frame.stroke(&outline, Stroke::default().with_width(1.5).with_color(GREEN));
                    let [lat, lon] = ring[0];
                    label(&mut frame, layer.name.clone(), project(lat, lon), 12.0, LABEL);
                }
                LayerShape::Polygon { .. } => {}
                LayerShape::Marker { lat, lon } => {
                    let at = project(*lat, *lon);
                    frame.fill(&Path::circle(at, 5.0), GREEN);
                    label(&mut frame, layer.name.clone(), Point::new(at.x + 7.0, at.y - 6.0), 12.0, LABEL);
                }
            }
        }

        for [lat, lon] in self.map.boats() {
            frame.fill(&Path::circle(project(*lat, *lon), 1.5), Color::from_rgb(0.95, 0.9, 0.4));
        }

        if let Some(track) = self.map.track() {
            if track.polyline.len() > 1 {
                let line = Path::new(|builder| {
                    for (i, [lat, lon]) in track.polyline.iter().enumerate() {
                        if i == 0 {
                            builder.move_to(project(*lat, *lon));
                        } else {
                            builder.line_to(project(*lat, *lon));
                        }
                    }
                });
                frame.stroke(&line, Stroke::default().with_width(2.5).with_color(RED));
            }
            let hovered = cursor.position_in(bounds);
            for marker in &track.markers {
                let at = project(marker.lat, marker.lon);
                frame.fill(&Path::circle(at, 4.0), RED);
                if hovered.map_or(false, |cursor| cursor.distance(at) < 8.0) {
                    for (row, line) in marker.popup.lines().enumerate() {
                        label(
                            &mut frame,
                            line,
                            Point::new(at.x + 8.0, at.y + row as f32 * 14.0),
                            12.0,
                            Color::WHITE,
                        );
                    }
                }
            }
        }

        label(
            &mut frame,
            format!("{:.1}N {:.1}E", extent.north, extent.west),
            Point::new(6.0, 4.0),
            11.0,
            GRID,
        );
        vec![frame.into_geometry()]
    }
}

/// Maps `value` onto the vertical pixel range `[top, bottom]` of `axis`.
fn scale_y(value: f64, axis: AxisBounds, top: f32, bottom: f32) -> f32 {
    let span = axis.max - axis.min;
    if span <= 0.0 || !value.is_finite() {
        return bottom;
    }
    let ratio = ((axis.max - value) / span).clamp(0.0, 1.0) as f32;
    top + ratio * (bottom - top)
}

/// Percentage change per fishing ground (left axis) next to its baseline
/// boat count (right axis).
pub struct DualAxisCanvas<'a> {
    view: &'a DualAxisChartView,
}

impl<'a> DualAxisCanvas<'a> {
    pub fn new(view: &'a DualAxisChartView) -> Self {
        Self { view }
    }
}

impl<Message> canvas::Program<Message> for DualAxisCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        background(&mut frame, bounds);

        let view = self.view;
        label(&mut frame, view.title.clone(), Point::new(8.0, 4.0), 14.0, LABEL);
        if view.labels.is_empty() {
            label(&mut frame, "No fishing ground data", Point::new(8.0, 28.0), 12.0, GRID);
            return vec![frame.into_geometry()];
        }

        let (left, right, top, bottom) = (52.0, bounds.width - 52.0, 28.0, bounds.height - 28.0);
        let slot = (right - left) / view.labels.len() as f32;
        let bar = slot * 0.35;

        let zero = scale_y(0.0, view.difference_axis, top, bottom);
        frame.stroke(
            &Path::line(Point::new(left, zero), Point::new(right, zero)),
            Stroke::default().with_color(GRID),
        );

        for (i, name) in view.labels.iter().enumerate() {
            let x = left + slot * i as f32 + slot * 0.1;

            let difference = view.differences.get(i).copied().unwrap_or(0.0);
            let tone = view.tones.get(i).copied().unwrap_or(BarTone::Green);
            let y = scale_y(difference, view.difference_axis, top, bottom);
            let color = match tone {
                BarTone::Green => GREEN,
                BarTone::Red => RED,
            };
            frame.fill_rectangle(
                Point::new(x, y.min(zero)),
                Size::new(bar, (zero - y).abs()),
                color,
            );

            let baseline = view.baseline.get(i).copied().unwrap_or(0.0);
            let y = scale_y(baseline, view.baseline_axis, top, bottom);
            let floor = scale_y(view.baseline_axis.min.max(0.0), view.baseline_axis, top, bottom);
            frame.fill_rectangle(
                Point::new(x + bar, y.min(floor)),
                Size::new(bar, (floor - y).abs()),
                BASELINE,
            );

            label(&mut frame, name.clone(), Point::new(x, bottom + 6.0), 11.0, LABEL);
        }

        let axis_labels = [
            (format!("{:.0}%", view.difference_axis.max), Point::new(4.0, top)),
            (format!("{:.0}%", view.difference_axis.min), Point::new(4.0, bottom - 12.0)),
            (format!("{:.0}", view.baseline_axis.max), Point::new(right + 6.0, top)),
            (format!("{:.0}", view.baseline_axis.min), Point::new(right + 6.0, bottom - 12.0)),
        ];
        for (text, at) in axis_labels {
            label(&mut frame, text, at, 11.0, GRID);
        }
        vec![frame.into_geometry()]
    }
}

/// Storms ranked by impact, one horizontal bar each; the selected storm is
/// highlighted.
pub struct RankedCanvas<'a> {
    view: &'a RankedChartView,
}

impl<'a> RankedCanvas<'a> {
    pub fn new(view: &'a RankedChartView) -> Self {
        Self { view }
    }
}

impl<Message> canvas::Program<Message> for RankedCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        background(&mut frame, bounds);

        let bars = &self.view.bars;
        if bars.is_empty() {
            label(&mut frame, "No storms to rank", Point::new(8.0, 8.0), 12.0, GRID);
            return vec![frame.into_geometry()];
        }

        let (left, right) = (110.0, bounds.width - 60.0);
        let row_height = ((bounds.height - 8.0) / bars.len() as f32).min(26.0);
        let axis_max = self.view.axis_max.max(f64::EPSILON);
        for (i, entry) in bars.iter().enumerate() {
            let y = 4.0 + row_height * i as f32;
            let ratio = (entry.value / axis_max).clamp(0.0, 1.0) as f32;
            let color = if entry.selected { HIGHLIGHT } else { BASELINE };
            frame.fill_rectangle(
                Point::new(left, y + 3.0),
                Size::new((right - left) * ratio, row_height - 6.0),
                color,
            );
            label(&mut frame, entry.label.clone(), Point::new(6.0, y + 4.0), 12.0, LABEL);
            label(
                &mut frame,
                format!("{:.1}", entry.value),
                Point::new(left + (right - left) * ratio + 6.0, y + 4.0),
                11.0,
                GRID,
            );
        }
        vec![frame.into_geometry()]
    }
}
