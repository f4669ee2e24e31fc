use geo_types::{
    Geometry as GeoGeometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};
use serde_json::{Map, Value};

use crate::error::MapError;
use crate::selection::RegionId;
use crate::topology::{ArcSet, Geometry, Shape};

/// A topology geometry resolved to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<RegionId>,
    pub properties: Option<Map<String, Value>>,
    pub geometry: Option<GeoGeometry<f64>>,
}

/// Converts a topology object to features: one per member of a collection,
/// otherwise a single feature.
pub fn features(arcs: &ArcSet, object: &Geometry) -> Result<Vec<Feature>, MapError> {
    match &object.shape {
        Shape::GeometryCollection { geometries } => geometries
            .iter()
            .map(|geometry| feature(arcs, geometry))
            .collect(),
        _ => Ok(vec![feature(arcs, object)?]),
    }
}

pub fn feature(arcs: &ArcSet, object: &Geometry) -> Result<Feature, MapError> {
    Ok(Feature {
        id: object.id.clone(),
        properties: object.properties.clone(),
        geometry: geometry(arcs, &object.shape)?,
    })
}

fn geometry(arcs: &ArcSet, shape: &Shape) -> Result<Option<GeoGeometry<f64>>, MapError> {
    let converted = match shape {
        Shape::Null => return Ok(None),
        Shape::Point { coordinates } => Point::from(arcs.point(coordinates)).into(),
        Shape::MultiPoint { coordinates } => coordinates
            .iter()
            .map(|position| Point::from(arcs.point(position)))
            .collect::<MultiPoint<f64>>()
            .into(),
        Shape::LineString { arcs: indexes } => LineString::new(arcs.line(indexes)?).into(),
        Shape::MultiLineString { arcs: lines } => MultiLineString::new(
            lines
                .iter()
                .map(|indexes| arcs.line(indexes).map(LineString::new))
                .collect::<Result<_, _>>()?,
        )
        .into(),
        Shape::Polygon { arcs: rings } => polygon(arcs, rings)?.into(),
        Shape::MultiPolygon { arcs: polygons } => MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| polygon(arcs, rings))
                .collect::<Result<_, _>>()?,
        )
        .into(),
        Shape::GeometryCollection { geometries } => {
            let mut members = Vec::with_capacity(geometries.len());
            for member in geometries {
                if let Some(converted) = geometry(arcs, &member.shape)? {
                    members.push(converted);
                }
            }
            GeoGeometry::GeometryCollection(GeometryCollection::new_from(members))
        }
    };
    Ok(Some(converted))
}

fn polygon(arcs: &ArcSet, rings: &[Vec<i64>]) -> Result<Polygon<f64>, MapError> {
    let mut rings = rings
        .iter()
        .map(|indexes| arcs.ring(indexes).map(LineString::new));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}
