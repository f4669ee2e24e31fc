//! Choropleth map rendering: TopoJSON in, SVG out.
//!
//! [`render_map`] fetches a world or US topology through a
//! [`TopologySource`], then draws the land outline, one path per region
//! (classed `region` or `region selected`) and the boundary mesh between
//! adjacent regions onto a fixed 480×240 surface.

pub mod clip;
pub mod error;
pub mod feature;
pub mod mesh;
pub mod path;
pub mod projection;
pub mod render;
pub mod selection;
pub mod svg;
pub mod topology;

pub use error::{MapError, UnknownMapMode};
pub use feature::Feature;
pub use path::GeoPath;
pub use projection::MapProjection;
pub use render::*;
pub use selection::{RegionId, SelectionRule, SelectionSet};
pub use svg::{MapContainer, Surface, SvgElement};
pub use topology::Topology;
