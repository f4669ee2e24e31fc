//! TopoJSON topology decoding.
//!
//! A topology stores every shared boundary once as an "arc"; geometries refer
//! to arcs by index, with a negative index `i` meaning arc `!i` traversed
//! backwards. Quantized topologies delta-encode arc positions and carry a
//! transform back to longitude/latitude.

use std::collections::BTreeMap;

use geo_types::Coord;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::MapError;
use crate::selection::RegionId;

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: BTreeMap<String, Geometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: x * self.scale[0] + self.translate[0],
            y: y * self.scale[1] + self.translate[1],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct Geometry {
    pub id: Option<RegionId>,
    pub properties: Option<Map<String, Value>>,
    pub shape: Shape,
}

#[derive(Debug, Clone)]
pub enum Shape {
    GeometryCollection { geometries: Vec<Geometry> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    /// `"type": null`, a missing type, or a type this decoder does not draw.
    Null,
}

/// Wire form of a geometry. The `type` member may be null or absent, which
/// a serde internally tagged enum cannot express.
#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<RegionId>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    arcs: Option<Value>,
    #[serde(default)]
    coordinates: Option<Value>,
    #[serde(default)]
    geometries: Option<Vec<Geometry>>,
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = serde_json::Error;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let shape = match raw.kind.as_deref() {
            Some("GeometryCollection") => Shape::GeometryCollection {
                geometries: raw.geometries.unwrap_or_default(),
            },
            Some("Point") => Shape::Point {
                coordinates: member(raw.coordinates)?,
            },
            Some("MultiPoint") => Shape::MultiPoint {
                coordinates: member(raw.coordinates)?,
            },
            Some("LineString") => Shape::LineString {
                arcs: member(raw.arcs)?,
            },
            Some("MultiLineString") => Shape::MultiLineString {
                arcs: member(raw.arcs)?,
            },
            Some("Polygon") => Shape::Polygon {
                arcs: member(raw.arcs)?,
            },
            Some("MultiPolygon") => Shape::MultiPolygon {
                arcs: member(raw.arcs)?,
            },
            _ => Shape::Null,
        };
        Ok(Self {
            id: raw.id,
            properties: raw.properties,
            shape,
        })
    }
}

fn member<T: DeserializeOwned>(value: Option<Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(value.unwrap_or(Value::Null))
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MapError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn object(&self, name: &str) -> Result<&Geometry, MapError> {
        self.objects
            .get(name)
            .ok_or_else(|| MapError::MissingObject(name.to_owned()))
    }

    /// Decodes every arc to absolute coordinates.
    pub fn arc_set(&self) -> ArcSet {
        let arcs = self
            .arcs
            .iter()
            .map(|arc| match self.transform {
                Some(transform) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .map(|position| {
                            x += component(position, 0);
                            y += component(position, 1);
                            transform.apply(x, y)
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .map(|position| Coord {
                        x: component(position, 0),
                        y: component(position, 1),
                    })
                    .collect(),
            })
            .collect();

        ArcSet {
            arcs,
            transform: self.transform,
        }
    }
}

fn component(position: &[f64], index: usize) -> f64 {
    position.get(index).copied().unwrap_or(0.0)
}

/// Arcs of one topology in absolute longitude/latitude.
#[derive(Debug, Clone)]
pub struct ArcSet {
    arcs: Vec<Vec<Coord<f64>>>,
    transform: Option<Transform>,
}

impl ArcSet {
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn arc(&self, index: i64) -> Result<&[Coord<f64>], MapError> {
        let absolute = if index < 0 { !index } else { index };
        usize::try_from(absolute)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .map(Vec::as_slice)
            .ok_or(MapError::InvalidArc(index))
    }

    /// Start and end of an arc in traversal direction.
    pub fn ends(&self, index: i64) -> Result<Option<(Coord<f64>, Coord<f64>)>, MapError> {
        let arc = self.arc(index)?;
        let (Some(first), Some(last)) = (arc.first(), arc.last()) else {
            return Ok(None);
        };
        Ok(Some(if index < 0 {
            (*last, *first)
        } else {
            (*first, *last)
        }))
    }

    /// Position of a point geometry; points are never delta-encoded.
    pub fn point(&self, position: &[f64]) -> Coord<f64> {
        let (x, y) = (component(position, 0), component(position, 1));
        match self.transform {
            Some(transform) => transform.apply(x, y),
            None => Coord { x, y },
        }
    }

    pub fn line(&self, indexes: &[i64]) -> Result<Vec<Coord<f64>>, MapError> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &index in indexes {
            let arc = self.arc(index)?;
            // consecutive arcs share their join point
            points.pop();
            if index < 0 {
                points.extend(arc.iter().rev());
            } else {
                points.extend_from_slice(arc);
            }
        }
        if points.len() < 2
            && let Some(&first) = points.first()
        {
            points.push(first);
        }
        Ok(points)
    }

    pub fn ring(&self, indexes: &[i64]) -> Result<Vec<Coord<f64>>, MapError> {
        let mut points = self.line(indexes)?;
        while points.len() < 4
            && let Some(&first) = points.first()
        {
            points.push(first);
        }
        Ok(points)
    }
}
