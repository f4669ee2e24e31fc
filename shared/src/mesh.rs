//! Boundary meshes: arcs shared between geometries, each drawn once and
//! stitched into the longest possible lines.

use std::collections::{HashMap, VecDeque};

use geo_types::{Coord, LineString, MultiLineString};

use crate::error::MapError;
use crate::topology::{ArcSet, Geometry, Shape};

/// Leaf geometry identity: its position in a depth-first walk of the object.
pub type GeometryIndex = usize;

/// Every arc referenced by `object`, once.
pub fn full_mesh(arcs: &ArcSet, object: &Geometry) -> Result<MultiLineString<f64>, MapError> {
    mesh(arcs, object, |_, _| true)
}

/// Arcs shared by two distinct geometries: the lines separating adjacent
/// regions, excluding coastlines and other outer edges.
pub fn interior_mesh(arcs: &ArcSet, object: &Geometry) -> Result<MultiLineString<f64>, MapError> {
    mesh(arcs, object, |a, b| a != b)
}

/// Stitched mesh of the arcs of `object` accepted by `filter`.
///
/// The filter sees the first and last geometry referencing each arc; an arc
/// used by a single geometry is passed the same index twice.
pub fn mesh<F>(arcs: &ArcSet, object: &Geometry, filter: F) -> Result<MultiLineString<f64>, MapError>
where
    F: Fn(GeometryIndex, GeometryIndex) -> bool,
{
    let selected = extract_arcs(arcs, object, filter)?;
    let fragments = stitch(arcs, selected)?;
    let lines = fragments
        .iter()
        .map(|fragment| arcs.line(fragment).map(LineString::new))
        .collect::<Result<_, _>>()?;
    Ok(MultiLineString::new(lines))
}

fn extract_arcs<F>(arcs: &ArcSet, object: &Geometry, filter: F) -> Result<Vec<i64>, MapError>
where
    F: Fn(GeometryIndex, GeometryIndex) -> bool,
{
    // arc -> (first directed index seen, first geometry, last geometry)
    let mut users: Vec<Option<(i64, GeometryIndex, GeometryIndex)>> = vec![None; arcs.len()];
    let mut next_geometry = 0;
    walk(object, &mut next_geometry, &mut |index, geometry| {
        arcs.arc(index)?;
        match &mut users[arc_slot(index)] {
            Some((_, _, last)) => *last = geometry,
            empty => *empty = Some((index, geometry, geometry)),
        }
        Ok(())
    })?;

    Ok(users
        .into_iter()
        .flatten()
        .filter(|&(_, first, last)| filter(first, last))
        .map(|(index, _, _)| index)
        .collect())
}

fn arc_slot(index: i64) -> usize {
    (if index < 0 { !index } else { index }) as usize
}

fn walk(
    object: &Geometry,
    next_geometry: &mut GeometryIndex,
    visit: &mut impl FnMut(i64, GeometryIndex) -> Result<(), MapError>,
) -> Result<(), MapError> {
    let geometry = *next_geometry;
    let indexes: Vec<i64> = match &object.shape {
        Shape::GeometryCollection { geometries } => {
            for member in geometries {
                walk(member, next_geometry, visit)?;
            }
            return Ok(());
        }
        Shape::LineString { arcs } => arcs.clone(),
        Shape::MultiLineString { arcs } | Shape::Polygon { arcs } => {
            arcs.iter().flatten().copied().collect()
        }
        Shape::MultiPolygon { arcs } => arcs.iter().flatten().flatten().copied().collect(),
        Shape::Point { .. } | Shape::MultiPoint { .. } | Shape::Null => Vec::new(),
    };
    *next_geometry += 1;
    for index in indexes {
        visit(index, geometry)?;
    }
    Ok(())
}

type EndpointKey = (u64, u64);

fn key(coord: Coord<f64>) -> EndpointKey {
    (coord.x.to_bits(), coord.y.to_bits())
}

struct Fragment {
    arcs: VecDeque<i64>,
    start: EndpointKey,
    end: EndpointKey,
}

/// Joins directed arcs into fragments whose ends meet.
fn stitch(arcs: &ArcSet, mut selected: Vec<i64>) -> Result<Vec<Vec<i64>>, MapError> {
    // Zero-length arcs go first so longer arcs can absorb them.
    let mut empty = 0;
    for j in 0..selected.len() {
        let arc = arcs.arc(selected[j])?;
        if arc.len() < 3 && arc.first() == arc.last() {
            selected.swap(empty, j);
            empty += 1;
        }
    }

    let mut fragments: Vec<Option<Fragment>> = Vec::new();
    let mut by_start: HashMap<EndpointKey, usize> = HashMap::new();
    let mut by_end: HashMap<EndpointKey, usize> = HashMap::new();

    for index in selected {
        let Some((start, end)) = arcs.ends(index)? else {
            continue;
        };
        let (start, end) = (key(start), key(end));

        if let Some(f) = by_end.remove(&start) {
            if let Some(fragment) = fragments[f].as_mut() {
                fragment.arcs.push_back(index);
                fragment.end = end;
            }
            match by_start.remove(&end) {
                Some(g) if g != f => {
                    let tail = fragments[g].take();
                    if let (Some(fragment), Some(tail)) = (fragments[f].as_mut(), tail) {
                        fragment.arcs.extend(tail.arcs);
                        fragment.end = tail.end;
                    }
                }
                _ => {}
            }
            register(&fragments, f, &mut by_start, &mut by_end);
        } else if let Some(f) = by_start.remove(&end) {
            if let Some(fragment) = fragments[f].as_mut() {
                fragment.arcs.push_front(index);
                fragment.start = start;
            }
            let joined = match by_end.remove(&start) {
                Some(g) if g != f => {
                    let head = fragments[f].take();
                    if let (Some(fragment), Some(head)) = (fragments[g].as_mut(), head) {
                        fragment.arcs.extend(head.arcs);
                        fragment.end = head.end;
                    }
                    g
                }
                _ => f,
            };
            register(&fragments, joined, &mut by_start, &mut by_end);
        } else {
            fragments.push(Some(Fragment {
                arcs: VecDeque::from([index]),
                start,
                end,
            }));
            register(&fragments, fragments.len() - 1, &mut by_start, &mut by_end);
        }
    }

    Ok(fragments
        .into_iter()
        .flatten()
        .map(|fragment| fragment.arcs.into())
        .collect())
}

fn register(
    fragments: &[Option<Fragment>],
    index: usize,
    by_start: &mut HashMap<EndpointKey, usize>,
    by_end: &mut HashMap<EndpointKey, usize>,
) {
    if let Some(fragment) = &fragments[index] {
        by_start.insert(fragment.start, index);
        by_end.insert(fragment.end, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use crate::topology::tests::PAIR_TOPOLOGY;

    fn coords(line: &LineString<f64>) -> Vec<(f64, f64)> {
        line.0.iter().map(|c| (c.x, c.y)).collect()
    }

    #[test]
    fn interior_mesh_keeps_only_shared_edges() {
        let topology = Topology::from_slice(PAIR_TOPOLOGY.as_bytes()).unwrap();
        let arcs = topology.arc_set();
        let mesh = interior_mesh(&arcs, topology.object("countries").unwrap()).unwrap();

        assert_eq!(mesh.0.len(), 1);
        assert_eq!(coords(&mesh.0[0]), vec![(0.0, 0.0), (0.0, 10.0)]);
    }

    #[test]
    fn full_mesh_stitches_every_arc_once() {
        let topology = Topology::from_slice(PAIR_TOPOLOGY.as_bytes()).unwrap();
        let arcs = topology.arc_set();
        let mesh = full_mesh(&arcs, topology.object("countries").unwrap()).unwrap();

        assert_eq!(mesh.0.len(), 1);
        assert_eq!(
            coords(&mesh.0[0]),
            vec![
                (0.0, 0.0),
                (0.0, 10.0),
                (-10.0, 10.0),
                (-10.0, 0.0),
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
            ]
        );
    }

    #[test]
    fn single_geometry_has_no_interior_mesh() {
        let topology = Topology::from_slice(PAIR_TOPOLOGY.as_bytes()).unwrap();
        let arcs = topology.arc_set();
        let mesh = interior_mesh(&arcs, topology.object("land").unwrap()).unwrap();
        assert!(mesh.0.is_empty());
    }

    #[test]
    fn disjoint_arcs_stay_separate_lines() {
        let topology = Topology::from_slice(
            br#"{
                "type": "Topology",
                "arcs": [[[0, 0], [1, 0]], [[5, 5], [6, 5]], [[1, 0], [2, 0]]],
                "objects": {
                    "rivers": {"type": "MultiLineString", "arcs": [[0], [1], [2]]}
                }
            }"#,
        )
        .unwrap();
        let arcs = topology.arc_set();
        let mesh = full_mesh(&arcs, topology.object("rivers").unwrap()).unwrap();

        let mut lines: Vec<_> = mesh.0.iter().map(coords).collect();
        lines.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap());
        assert_eq!(
            lines,
            vec![
                vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)],
                vec![(5.0, 5.0), (6.0, 5.0)],
            ]
        );
    }

    #[test]
    fn invalid_arc_references_are_reported() {
        let topology = Topology::from_slice(
            br#"{"type":"Topology","arcs":[],"objects":{"x":{"type":"LineString","arcs":[0]}}}"#,
        )
        .unwrap();
        let arcs = topology.arc_set();
        assert!(matches!(
            full_mesh(&arcs, topology.object("x").unwrap()),
            Err(MapError::InvalidArc(0))
        ));
    }
}
