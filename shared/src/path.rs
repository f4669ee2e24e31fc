use std::fmt::Write as _;

use geo_types::{Coord, Geometry, LineString, MultiLineString, Polygon};

use crate::clip;
use crate::feature::Feature;
use crate::projection::MapProjection;

const POINT_RADIUS: f64 = 4.5;
/// Longest segment, in degrees, drawn as a straight chord on a curved plane.
const RESAMPLE_STEP: f64 = 1.0;

/// Writes SVG path data for geometries under a projection.
#[derive(Debug, Clone, Copy)]
pub struct GeoPath<'a> {
    projection: &'a MapProjection,
}

impl<'a> GeoPath<'a> {
    pub fn new(projection: &'a MapProjection) -> Self {
        Self { projection }
    }

    /// All features drawn into one path.
    pub fn features(&self, features: &[Feature]) -> String {
        let mut d = String::new();
        for feature in features {
            if let Some(geometry) = &feature.geometry {
                self.write_geometry(&mut d, geometry);
            }
        }
        d
    }

    pub fn feature(&self, feature: &Feature) -> String {
        self.features(std::slice::from_ref(feature))
    }

    pub fn geometry(&self, geometry: &Geometry<f64>) -> String {
        let mut d = String::new();
        self.write_geometry(&mut d, geometry);
        d
    }

    pub fn multi_line_string(&self, lines: &MultiLineString<f64>) -> String {
        let mut d = String::new();
        for line in lines {
            self.write_line(&mut d, line);
        }
        d
    }

    fn write_geometry(&self, d: &mut String, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(point) => self.write_point(d, point.0),
            Geometry::MultiPoint(points) => {
                for point in points {
                    self.write_point(d, point.0);
                }
            }
            Geometry::Line(line) => {
                self.write_line(d, &LineString::new(vec![line.start, line.end]));
            }
            Geometry::LineString(line) => self.write_line(d, line),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    self.write_line(d, line);
                }
            }
            Geometry::Polygon(polygon) => self.write_polygon(d, polygon),
            Geometry::MultiPolygon(polygons) => {
                for polygon in polygons {
                    self.write_polygon(d, polygon);
                }
            }
            Geometry::GeometryCollection(collection) => {
                for member in collection {
                    self.write_geometry(d, member);
                }
            }
            Geometry::Rect(rect) => self.write_polygon(d, &rect.to_polygon()),
            Geometry::Triangle(triangle) => self.write_polygon(d, &triangle.to_polygon()),
        }
    }

    fn write_point(&self, d: &mut String, coord: Coord<f64>) {
        let Some(center) = self.projection.project(coord.x, coord.y) else {
            return;
        };
        let r = POINT_RADIUS;
        d.push('M');
        push_pair(d, center);
        let _ = write!(d, "m0,{r}a{r},{r} 0 1,1 0,{}a{r},{r} 0 1,1 0,{}z", -2.0 * r, 2.0 * r);
    }

    fn write_line(&self, d: &mut String, line: &LineString<f64>) {
        for plane in self.projection.planes() {
            let rotated: Vec<Coord<f64>> = line.coords().map(|c| plane.rotate(*c)).collect();
            for piece in clip::cut_line(&rotated) {
                let piece = if plane.is_curved() {
                    densify(&piece, false)
                } else {
                    piece
                };
                let projected: Vec<Coord<f64>> =
                    piece.iter().map(|c| plane.project_rotated(*c)).collect();
                let runs = match plane.extent() {
                    Some(extent) => clip::clip_line(&projected, extent),
                    None => vec![projected],
                };
                for run in runs {
                    push_points(d, &run, false);
                }
            }
        }
    }

    fn write_polygon(&self, d: &mut String, polygon: &Polygon<f64>) {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            self.write_ring(d, ring);
        }
    }

    fn write_ring(&self, d: &mut String, ring: &LineString<f64>) {
        for plane in self.projection.planes() {
            let rotated: Vec<Coord<f64>> = ring.coords().map(|c| plane.rotate(*c)).collect();
            for piece in clip::cut_ring(&rotated) {
                let piece = if plane.is_curved() {
                    densify(&piece, true)
                } else {
                    piece
                };
                let projected: Vec<Coord<f64>> =
                    piece.iter().map(|c| plane.project_rotated(*c)).collect();
                let clipped = match plane.extent() {
                    Some(extent) => clip::clip_ring(&projected, extent),
                    None => Some(projected),
                };
                if let Some(ring) = clipped {
                    push_points(d, &ring, true);
                }
            }
        }
    }
}

/// Splits segments longer than [`RESAMPLE_STEP`] into equal parts. An open
/// ring (`closed`) also gets its implicit closing segment filled.
fn densify(points: &[Coord<f64>], closed: bool) -> Vec<Coord<f64>> {
    let mut dense = Vec::with_capacity(points.len());
    for (i, &a) in points.iter().enumerate() {
        dense.push(a);
        let b = match points.get(i + 1) {
            Some(&b) => b,
            None if closed && points.len() > 1 => points[0],
            None => break,
        };
        let span = (b.x - a.x).abs().max((b.y - a.y).abs());
        let steps = (span / RESAMPLE_STEP).ceil() as usize;
        for step in 1..steps {
            let t = step as f64 / steps as f64;
            dense.push(Coord {
                x: a.x + t * (b.x - a.x),
                y: a.y + t * (b.y - a.y),
            });
        }
    }
    dense
}

fn push_points(d: &mut String, points: &[Coord<f64>], close: bool) {
    let mut points = points.iter();
    let Some(first) = points.next() else {
        return;
    };
    d.push('M');
    push_pair(d, *first);
    for point in points {
        d.push('L');
        push_pair(d, *point);
    }
    if close {
        d.push('Z');
    }
}

fn push_pair(d: &mut String, point: Coord<f64>) {
    push_number(d, point.x);
    d.push(',');
    push_number(d, point.y);
}

/// At most two decimals, trailing zeros trimmed, no negative zero.
pub(crate) fn push_number(d: &mut String, value: f64) {
    let rounded = (value * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let start = d.len();
    let _ = write!(d, "{rounded:.2}");
    let trimmed = d[start..].trim_end_matches('0').trim_end_matches('.').len();
    d.truncate(start + trimmed);
}
