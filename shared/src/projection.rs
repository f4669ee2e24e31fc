//! Geographic to screen projections.
//!
//! A [`MapProjection`] is one or more [`Plane`]s. Each plane rotates
//! longitude, applies a raw projection, then scales and translates into
//! screen space (y grows downward). Composite projections such as Albers USA
//! use one plane per inset, each limited to its own clip extent.

use std::f64::consts::PI;

use geo_types::Coord;

use crate::render::MapMode;

const EXTENT_INSET: f64 = 1e-6;

/// Screen-space rectangle, `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Extent {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn contains(&self, point: Coord<f64>) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    fn inset(self, by: f64) -> Self {
        Self::new(self.x0 + by, self.y0 + by, self.x1 - by, self.y1 - by)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawProjection {
    Equirectangular,
    ConicEqualArea { n: f64, c: f64, rho0: f64 },
}

impl RawProjection {
    /// Albers equal-area conic with standard parallels in degrees. The
    /// parallels must not be symmetric about the equator.
    pub fn conic_equal_area(parallel0: f64, parallel1: f64) -> Self {
        let sin0 = parallel0.to_radians().sin();
        let n = (sin0 + parallel1.to_radians().sin()) / 2.0;
        let c = 1.0 + sin0 * (2.0 * n - sin0);
        Self::ConicEqualArea {
            n,
            c,
            rho0: c.sqrt() / n,
        }
    }

    /// Radians in, unscaled plane coordinates out (y up).
    fn forward(&self, lambda: f64, phi: f64) -> (f64, f64) {
        match *self {
            Self::Equirectangular => (lambda, phi),
            Self::ConicEqualArea { n, c, rho0 } => {
                let rho = (c - 2.0 * n * phi.sin()).max(0.0).sqrt() / n;
                let angle = lambda * n;
                (rho * angle.sin(), rho0 - rho * angle.cos())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    rotate: f64,
    raw: RawProjection,
    scale: f64,
    dx: f64,
    dy: f64,
    extent: Option<Extent>,
}

impl Plane {
    /// `rotate` and `center` are in degrees; `center` is given in the
    /// rotated frame and lands on `translate`.
    pub fn new(
        raw: RawProjection,
        rotate: f64,
        center: (f64, f64),
        scale: f64,
        translate: (f64, f64),
        extent: Option<Extent>,
    ) -> Self {
        let (cx, cy) = raw.forward(center.0.to_radians(), center.1.to_radians());
        Self {
            rotate,
            raw,
            scale,
            dx: translate.0 - cx * scale,
            dy: translate.1 + cy * scale,
            extent,
        }
    }

    /// Whether straight lines in longitude/latitude bend on this plane.
    pub fn is_curved(&self) -> bool {
        !matches!(self.raw, RawProjection::Equirectangular)
    }

    pub fn extent(&self) -> Option<&Extent> {
        self.extent.as_ref()
    }

    /// Longitude shifted into this plane's frame, wrapped to [-180, 180].
    pub fn rotate(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: wrap_longitude(coord.x + self.rotate),
            y: coord.y,
        }
    }

    /// Projects a coordinate already in this plane's rotated frame.
    pub fn project_rotated(&self, coord: Coord<f64>) -> Coord<f64> {
        let (x, y) = self.raw.forward(coord.x * PI / 180.0, coord.y * PI / 180.0);
        Coord {
            x: x * self.scale + self.dx,
            y: self.dy - y * self.scale,
        }
    }

    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        self.project_rotated(self.rotate(coord))
    }
}

pub(crate) fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    planes: Vec<Plane>,
}

impl MapProjection {
    pub fn equirectangular(scale: f64, translate: (f64, f64)) -> Self {
        Self {
            planes: vec![Plane::new(
                RawProjection::Equirectangular,
                0.0,
                (0.0, 0.0),
                scale,
                translate,
                None,
            )],
        }
    }

    /// Lower 48 states with Alaska and Hawaii insets in the lower left.
    pub fn albers_usa(scale: f64, translate: (f64, f64)) -> Self {
        let k = scale;
        let (x, y) = translate;

        let lower48 = Plane::new(
            RawProjection::conic_equal_area(29.5, 45.5),
            96.0,
            (-0.6, 38.7),
            k,
            (x, y),
            Some(Extent::new(x - 0.455 * k, y - 0.238 * k, x + 0.455 * k, y + 0.238 * k)),
        );
        let alaska = Plane::new(
            RawProjection::conic_equal_area(55.0, 65.0),
            154.0,
            (-2.0, 58.5),
            0.35 * k,
            (x - 0.307 * k, y + 0.201 * k),
            Some(
                Extent::new(x - 0.425 * k, y + 0.120 * k, x - 0.214 * k, y + 0.234 * k)
                    .inset(EXTENT_INSET),
            ),
        );
        let hawaii = Plane::new(
            RawProjection::conic_equal_area(8.0, 18.0),
            157.0,
            (-3.0, 19.9),
            k,
            (x - 0.205 * k, y + 0.212 * k),
            Some(
                Extent::new(x - 0.214 * k, y + 0.166 * k, x - 0.115 * k, y + 0.234 * k)
                    .inset(EXTENT_INSET),
            ),
        );

        Self {
            planes: vec![lower48, alaska, hawaii],
        }
    }

    pub fn for_mode(mode: MapMode, width: f64, height: f64) -> Self {
        let center = (width / 2.0, height / 2.0);
        match mode {
            MapMode::Us => Self::albers_usa(mode.scale(), center),
            MapMode::World => Self::equirectangular(mode.scale(), center),
        }
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Projects a single point. The first plane whose extent accepts the
    /// result wins; `None` when every plane rejects it.
    pub fn project(&self, lon: f64, lat: f64) -> Option<Coord<f64>> {
        self.planes.iter().find_map(|plane| {
            let point = plane.project(Coord { x: lon, y: lat });
            match plane.extent() {
                Some(extent) if !extent.contains(point) => None,
                _ => Some(point),
            }
        })
    }
}
