//! Clipping in geographic and screen space.
//!
//! Rings come in closed (last point equals first) and leave open; the path
//! writer closes them.

use geo_types::Coord;

use crate::projection::Extent;

/// Cuts a closed ring, given in a plane's rotated frame (degrees), into open
/// rings that never cross the antimeridian.
pub fn cut_ring(ring: &[Coord<f64>]) -> Vec<Vec<Coord<f64>>> {
    let open = open_ring(ring);
    if open.len() < 3 {
        return Vec::new();
    }
    if !crosses_antimeridian(ring) {
        return vec![open.to_vec()];
    }

    let mut unwrapped = unwrap_longitudes(ring);
    let (first, last) = (unwrapped[0], unwrapped[unwrapped.len() - 1]);
    if (last.x - first.x).abs() > 180.0 {
        // the ring winds around a pole; close it along that pole
        let mean_lat = ring.iter().map(|c| c.y).sum::<f64>() / ring.len() as f64;
        let pole = if mean_lat < 0.0 { -90.0 } else { 90.0 };
        unwrapped.push(Coord { x: last.x, y: pole });
        unwrapped.push(Coord { x: first.x, y: pole });
    } else {
        unwrapped.pop();
    }

    let (min, max) = unwrapped
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), c| (min.min(c.x), max.max(c.x)));
    let lowest = ((-180.0 - max) / 360.0).floor() as i64;
    let highest = ((180.0 - min) / 360.0).ceil() as i64;

    let mut pieces = Vec::new();
    for k in lowest..=highest {
        let shift = k as f64 * 360.0;
        let shifted: Vec<Coord<f64>> = unwrapped
            .iter()
            .map(|c| Coord { x: c.x + shift, y: c.y })
            .collect();
        let west = clip_vertical(&shifted, -180.0, |x, edge| x >= edge);
        let clipped = clip_vertical(&west, 180.0, |x, edge| x <= edge);
        if has_area(&clipped) {
            pieces.push(clipped);
        }
    }
    pieces
}

/// Splits a line, given in a plane's rotated frame, where it crosses the
/// antimeridian.
pub fn cut_line(line: &[Coord<f64>]) -> Vec<Vec<Coord<f64>>> {
    let mut lines = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();
    for &point in line {
        if let Some(&previous) = current.last()
            && (point.x - previous.x).abs() > 180.0
        {
            let edge = if previous.x > 0.0 { 180.0 } else { -180.0 };
            let target = point.x + 2.0 * edge;
            let t = (edge - previous.x) / (target - previous.x);
            let lat = previous.y + t * (point.y - previous.y);
            current.push(Coord { x: edge, y: lat });
            lines.push(std::mem::take(&mut current));
            current.push(Coord { x: -edge, y: lat });
        }
        current.push(point);
    }
    lines.push(current);
    lines.retain(|line| line.len() >= 2);
    lines
}

/// Sutherland–Hodgman clip of an open ring against a screen extent.
pub fn clip_ring(ring: &[Coord<f64>], extent: &Extent) -> Option<Vec<Coord<f64>>> {
    let ring = clip_vertical(ring, extent.x0, |x, edge| x >= edge);
    let ring = clip_vertical(&ring, extent.x1, |x, edge| x <= edge);
    let ring = clip_horizontal(&ring, extent.y0, |y, edge| y >= edge);
    let ring = clip_horizontal(&ring, extent.y1, |y, edge| y <= edge);
    has_area(&ring).then_some(ring)
}

/// Liang–Barsky clip of a line against a screen extent; each visible run
/// becomes its own line.
pub fn clip_line(line: &[Coord<f64>], extent: &Extent) -> Vec<Vec<Coord<f64>>> {
    let mut lines = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    for pair in line.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        match clip_segment(a, b, extent) {
            Some((t0, t1)) => {
                let entry = if t0 == 0.0 { a } else { lerp(a, b, t0) };
                let exit = if t1 == 1.0 { b } else { lerp(a, b, t1) };
                if current.last() != Some(&entry) {
                    flush(&mut lines, &mut current);
                    current.push(entry);
                }
                current.push(exit);
                if t1 < 1.0 {
                    flush(&mut lines, &mut current);
                }
            }
            None => flush(&mut lines, &mut current),
        }
    }
    flush(&mut lines, &mut current);
    lines
}

fn flush(lines: &mut Vec<Vec<Coord<f64>>>, current: &mut Vec<Coord<f64>>) {
    let line = std::mem::take(current);
    if line.len() >= 2 {
        lines.push(line);
    }
}

fn clip_segment(a: Coord<f64>, b: Coord<f64>, extent: &Extent) -> Option<(f64, f64)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    let edges = [
        (-dx, a.x - extent.x0),
        (dx, extent.x1 - a.x),
        (-dy, a.y - extent.y0),
        (dy, extent.y1 - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((t0, t1))
}

fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
    }
}

fn open_ring(ring: &[Coord<f64>]) -> &[Coord<f64>] {
    match ring {
        [first, .., last] if first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

fn crosses_antimeridian(ring: &[Coord<f64>]) -> bool {
    ring.windows(2)
        .any(|pair| (pair[1].x - pair[0].x).abs() > 180.0)
}

fn unwrap_longitudes(ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut unwrapped = Vec::with_capacity(ring.len() + 2);
    // (original, unwrapped) longitude of the previous point
    let mut previous: Option<(f64, f64)> = None;
    for &point in ring {
        let x = match previous {
            Some((original, x)) => {
                let mut delta = point.x - original;
                if delta > 180.0 {
                    delta -= 360.0;
                } else if delta < -180.0 {
                    delta += 360.0;
                }
                x + delta
            }
            None => point.x,
        };
        previous = Some((point.x, x));
        unwrapped.push(Coord { x, y: point.y });
    }
    unwrapped
}

fn has_area(ring: &[Coord<f64>]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut twice_area = 0.0;
    let mut previous = ring[ring.len() - 1];
    for &current in ring {
        twice_area += previous.x * current.y - current.x * previous.y;
        previous = current;
    }
    twice_area.abs() > 1e-12
}

fn clip_vertical(
    ring: &[Coord<f64>],
    edge: f64,
    inside: impl Fn(f64, f64) -> bool,
) -> Vec<Coord<f64>> {
    clip_half_plane(
        ring,
        |c| inside(c.x, edge),
        |a, b| {
            let t = (edge - a.x) / (b.x - a.x);
            Coord {
                x: edge,
                y: a.y + t * (b.y - a.y),
            }
        },
    )
}

fn clip_horizontal(
    ring: &[Coord<f64>],
    edge: f64,
    inside: impl Fn(f64, f64) -> bool,
) -> Vec<Coord<f64>> {
    clip_half_plane(
        ring,
        |c| inside(c.y, edge),
        |a, b| {
            let t = (edge - a.y) / (b.y - a.y);
            Coord {
                x: a.x + t * (b.x - a.x),
                y: edge,
            }
        },
    )
}

fn clip_half_plane(
    ring: &[Coord<f64>],
    inside: impl Fn(Coord<f64>) -> bool,
    intersect: impl Fn(Coord<f64>, Coord<f64>) -> Coord<f64>,
) -> Vec<Coord<f64>> {
    let Some(&last) = ring.last() else {
        return Vec::new();
    };
    let mut output = Vec::with_capacity(ring.len() + 4);
    let mut previous = last;
    for &current in ring {
        match (inside(previous), inside(current)) {
            (true, true) => output.push(current),
            (true, false) => output.push(intersect(previous, current)),
            (false, true) => {
                output.push(intersect(previous, current));
                output.push(current);
            }
            (false, false) => {}
        }
        previous = current;
    }
    output
}
