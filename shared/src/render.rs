//! The fetch → draw pipeline.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use geo_types::{Coord, LineString, MultiLineString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MapError, UnknownMapMode};
use crate::feature::features;
use crate::mesh::interior_mesh;
use crate::path::GeoPath;
use crate::projection::MapProjection;
use crate::selection::{SelectionRule, SelectionSet};
use crate::svg::{
    BOUNDARY_CLASS, GRATICULE_CLASS, LAND_CLASS, MapContainer, REGION_CLASS,
    SELECTED_REGION_CLASS, Surface, SvgElement,
};
use crate::topology::Topology;

pub const CANVAS_WIDTH: u32 = 480;
pub const CANVAS_HEIGHT: u32 = 240;
pub const US_SCALE: f64 = 500.0;
pub const WORLD_SCALE: f64 = 80.0;
pub const LAND_OBJECT: &str = "land";

pub const WORLD_RESOURCE: &str = "world-50m.json";
pub const US_RESOURCE: &str = "us.json";

const GRATICULE_STEP: f64 = 10.0;
const GRATICULE_PRECISION: f64 = 2.5;
const GRATICULE_MAX_LAT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    World,
    Us,
}

impl MapMode {
    pub fn resource_file(self) -> &'static str {
        match self {
            Self::World => WORLD_RESOURCE,
            Self::Us => US_RESOURCE,
        }
    }

    /// Topology object holding one geometry per region.
    pub fn regions_object(self) -> &'static str {
        match self {
            Self::World => "countries",
            Self::Us => "states",
        }
    }

    pub fn scale(self) -> f64 {
        match self {
            Self::World => WORLD_SCALE,
            Self::Us => US_SCALE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Us => "us",
        }
    }
}

impl fmt::Display for MapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapMode {
    type Err = UnknownMapMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "world" => Ok(Self::World),
            "us" | "usa" => Ok(Self::Us),
            _ => Err(UnknownMapMode(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// In US mode an empty selection paints every state as selected and
    /// skips the boundary layer.
    pub us_empty_selects_all: bool,
    /// Start each surface with a graticule reference layer.
    pub graticule: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            us_empty_selects_all: true,
            graticule: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRequest {
    pub selected: SelectionSet,
    pub data_source_base: String,
    pub mode: MapMode,
    #[serde(default)]
    pub options: MapOptions,
}

impl MapRequest {
    pub fn new(selected: SelectionSet, data_source_base: impl Into<String>, mode: MapMode) -> Self {
        Self {
            selected,
            data_source_base: data_source_base.into(),
            mode,
            options: MapOptions::default(),
        }
    }

    pub fn world_map(selected: SelectionSet, data_source_base: impl Into<String>) -> Self {
        Self::new(selected, data_source_base, MapMode::World)
    }

    pub fn us_map(selected: SelectionSet, data_source_base: impl Into<String>) -> Self {
        Self::new(selected, data_source_base, MapMode::Us)
    }

    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    /// URL of the topology resource for this request's mode.
    pub fn data_url(&self) -> String {
        let base = &self.data_source_base;
        let file = self.mode.resource_file();
        if base.is_empty() || base.ends_with('/') {
            format!("{base}{file}")
        } else {
            format!("{base}/{file}")
        }
    }

    /// The blank surface a render starts from.
    pub fn new_surface(&self) -> Surface {
        let mut surface = Surface::new(CANVAS_WIDTH, CANVAS_HEIGHT);
        if self.options.graticule {
            let projection = self.projection_for(&surface);
            let d = GeoPath::new(&projection).multi_line_string(&graticule());
            surface.push(SvgElement::new(GRATICULE_CLASS, d));
        }
        surface
    }

    fn projection_for(&self, surface: &Surface) -> MapProjection {
        MapProjection::for_mode(self.mode, f64::from(surface.width), f64::from(surface.height))
    }
}

/// What one render drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub regions: usize,
    pub selected: usize,
    pub boundary_drawn: bool,
}

/// Draws land, regions and the boundary mesh onto `surface`, each layer
/// inserted below any graticule. All geometry is derived before the first
/// insert, so a failure leaves the surface untouched.
pub fn draw_map(
    topology: &Topology,
    request: &MapRequest,
    surface: &mut Surface,
) -> Result<RenderSummary, MapError> {
    let arcs = topology.arc_set();
    let land = features(&arcs, topology.object(LAND_OBJECT)?)?;
    let regions_object = topology.object(request.mode.regions_object())?;
    let regions = features(&arcs, regions_object)?;

    let rule = SelectionRule::new(&request.selected, request.mode, &request.options);
    let boundary = if rule.draws_boundaries() {
        Some(interior_mesh(&arcs, regions_object)?)
    } else {
        None
    };

    let projection = request.projection_for(surface);
    let path = GeoPath::new(&projection);

    surface.insert_before(GRATICULE_CLASS, SvgElement::new(LAND_CLASS, path.features(&land)));

    let mut selected = 0;
    for region in &regions {
        let is_selected = rule.is_selected(region.id.as_ref());
        let class = if is_selected {
            selected += 1;
            SELECTED_REGION_CLASS
        } else {
            REGION_CLASS
        };
        surface.insert_before(
            GRATICULE_CLASS,
            SvgElement::new(class, path.feature(region)).with_region(region.id.clone()),
        );
    }

    if let Some(mesh) = &boundary {
        surface.insert_before(
            GRATICULE_CLASS,
            SvgElement::new(BOUNDARY_CLASS, path.multi_line_string(mesh)),
        );
    }

    Ok(RenderSummary {
        regions: regions.len(),
        selected,
        boundary_drawn: boundary.is_some(),
    })
}

/// Where topology resources come from. One fetch per render; no caching,
/// retry or cancellation at this layer.
pub trait TopologySource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Topology, MapError>>;
}

/// Appends a fresh surface to `container`, then fetches and draws into it.
/// On error the surface stays in the container, empty apart from any
/// graticule.
pub async fn try_render_map<S: TopologySource>(
    source: &S,
    container: &mut MapContainer,
    request: &MapRequest,
) -> Result<RenderSummary, MapError> {
    let index = container.append_surface(request.new_surface());
    let url = request.data_url();
    debug!(%url, mode = %request.mode, selected = request.selected.len(), "fetching topology");

    let topology = source.fetch(&url).await?;
    let summary = draw_map(&topology, request, container.surface_mut(index))?;
    debug!(
        %url,
        regions = summary.regions,
        selected = summary.selected,
        boundary = summary.boundary_drawn,
        "map drawn"
    );
    Ok(summary)
}

/// Fire-and-forget render: failures are logged and otherwise ignored, the
/// appended surface simply stays empty.
pub async fn render_map<S: TopologySource>(
    source: &S,
    container: &mut MapContainer,
    request: &MapRequest,
) {
    if let Err(e) = try_render_map(source, container, request).await {
        warn!(error = %e, url = %request.data_url(), "map render failed");
    }
}

/// Meridians and parallels every 10°, latitudes limited to ±80°.
pub fn graticule() -> MultiLineString<f64> {
    let mut lines = Vec::new();

    let meridian_count = (360.0 / GRATICULE_STEP) as usize;
    let lat_samples = (2.0 * GRATICULE_MAX_LAT / GRATICULE_PRECISION) as usize;
    for i in 0..=meridian_count {
        let lon = -180.0 + i as f64 * GRATICULE_STEP;
        lines.push(LineString::new(
            (0..=lat_samples)
                .map(|j| Coord {
                    x: lon,
                    y: -GRATICULE_MAX_LAT + j as f64 * GRATICULE_PRECISION,
                })
                .collect(),
        ));
    }

    let parallel_count = (2.0 * GRATICULE_MAX_LAT / GRATICULE_STEP) as usize;
    let lon_samples = (360.0 / GRATICULE_PRECISION) as usize;
    for i in 0..=parallel_count {
        let lat = -GRATICULE_MAX_LAT + i as f64 * GRATICULE_STEP;
        lines.push(LineString::new(
            (0..=lon_samples)
                .map(|j| Coord {
                    x: -180.0 + j as f64 * GRATICULE_PRECISION,
                    y: lat,
                })
                .collect(),
        ));
    }

    MultiLineString::new(lines)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use futures::executor::block_on;

    use super::*;
    use crate::selection::RegionId;
    use crate::topology::tests::PAIR_TOPOLOGY;

    /// California ("06") and a neighbour ("48") sharing the -116° meridian.
    const US_TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[-116, 34], [-116, 40]],
            [[-116, 40], [-122, 40], [-122, 34], [-116, 34]],
            [[-116, 34], [-110, 34], [-110, 40], [-116, 40]]
        ],
        "objects": {
            "land": {"type": "Polygon", "arcs": [[1, 2]]},
            "states": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "id": "06", "arcs": [[0, 1]]},
                    {"type": "Polygon", "id": "48", "arcs": [[2, -1]]}
                ]
            }
        }
    }"#;

    struct FakeSource {
        files: HashMap<String, &'static str>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                files: HashMap::from([
                    ("/geo/world-50m.json".to_string(), PAIR_TOPOLOGY),
                    ("/geo/us.json".to_string(), US_TOPOLOGY),
                ]),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl TopologySource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<Topology, MapError> {
            self.requested.borrow_mut().push(url.to_owned());
            match self.files.get(url) {
                Some(json) => Topology::from_slice(json.as_bytes()),
                None => Err(MapError::Status {
                    url: url.to_owned(),
                    status: 404,
                }),
            }
        }
    }

    fn classes(surface: &Surface) -> Vec<&str> {
        surface.elements().iter().map(|e| e.class.as_str()).collect()
    }

    fn render(source: &FakeSource, request: &MapRequest) -> MapContainer {
        let mut container = MapContainer::new();
        block_on(render_map(source, &mut container, request));
        container
    }

    #[test]
    fn empty_world_selection_draws_unselected_regions_and_boundaries() {
        let source = FakeSource::new();
        let container = render(&source, &MapRequest::world_map(SelectionSet::new(), "/geo/"));

        assert_eq!(*source.requested.borrow(), vec!["/geo/world-50m.json"]);
        assert_eq!(container.surfaces().len(), 1);
        let surface = &container.surfaces()[0];
        assert_eq!((surface.width, surface.height), (480, 240));
        assert_eq!(
            classes(surface),
            vec![LAND_CLASS, REGION_CLASS, REGION_CLASS, BOUNDARY_CLASS]
        );
        assert!(surface.elements().iter().all(|e| !e.d.is_empty()));
    }

    #[test]
    fn world_selection_marks_only_members() {
        let source = FakeSource::new();
        let selected: SelectionSet = ["8"].into_iter().collect();
        let container = render(&source, &MapRequest::world_map(selected, "/geo/"));

        let surface = &container.surfaces()[0];
        assert_eq!(
            classes(surface),
            vec![LAND_CLASS, REGION_CLASS, SELECTED_REGION_CLASS, BOUNDARY_CLASS]
        );
        assert_eq!(surface.elements()[2].region, Some(RegionId::from("8")));
    }

    #[test]
    fn us_selection_marks_the_requested_state() {
        let source = FakeSource::new();
        let selected: SelectionSet = ["06"].into_iter().collect();
        let mut container = MapContainer::new();
        let summary = block_on(try_render_map(
            &source,
            &mut container,
            &MapRequest::us_map(selected, "/geo/"),
        ))
        .unwrap();

        assert_eq!(*source.requested.borrow(), vec!["/geo/us.json"]);
        assert_eq!(
            summary,
            RenderSummary {
                regions: 2,
                selected: 1,
                boundary_drawn: true
            }
        );
        let surface = &container.surfaces()[0];
        assert_eq!(
            classes(surface),
            vec![LAND_CLASS, SELECTED_REGION_CLASS, REGION_CLASS, BOUNDARY_CLASS]
        );
        assert_eq!(surface.elements()[1].region, Some(RegionId::from("06")));
    }

    #[test]
    fn empty_us_selection_selects_all_states_without_boundaries() {
        let source = FakeSource::new();
        let container = render(&source, &MapRequest::us_map(SelectionSet::new(), "/geo/"));

        assert_eq!(
            classes(&container.surfaces()[0]),
            vec![LAND_CLASS, SELECTED_REGION_CLASS, SELECTED_REGION_CLASS]
        );
    }

    #[test]
    fn empty_us_selection_uses_general_rule_when_disabled() {
        let source = FakeSource::new();
        let request = MapRequest::us_map(SelectionSet::new(), "/geo/").with_options(MapOptions {
            us_empty_selects_all: false,
            graticule: false,
        });
        let container = render(&source, &request);

        assert_eq!(
            classes(&container.surfaces()[0]),
            vec![LAND_CLASS, REGION_CLASS, REGION_CLASS, BOUNDARY_CLASS]
        );
    }

    #[test]
    fn layers_are_inserted_below_the_graticule() {
        let source = FakeSource::new();
        let request = MapRequest::world_map(SelectionSet::new(), "/geo/").with_options(MapOptions {
            graticule: true,
            ..MapOptions::default()
        });
        let container = render(&source, &request);

        assert_eq!(
            classes(&container.surfaces()[0]),
            vec![
                LAND_CLASS,
                REGION_CLASS,
                REGION_CLASS,
                BOUNDARY_CLASS,
                GRATICULE_CLASS
            ]
        );
    }

    #[test]
    fn rendering_twice_appends_two_surfaces() {
        let source = FakeSource::new();
        let request = MapRequest::world_map(SelectionSet::new(), "/geo/");
        let mut container = MapContainer::new();
        block_on(render_map(&source, &mut container, &request));
        block_on(render_map(&source, &mut container, &request));

        assert_eq!(container.surfaces().len(), 2);
        assert_eq!(container.surfaces()[0], container.surfaces()[1]);
    }

    #[test]
    fn fetch_failure_leaves_an_empty_surface() {
        let source = FakeSource::new();
        let request = MapRequest::world_map(SelectionSet::new(), "/missing/");
        let mut container = MapContainer::new();

        let result = block_on(try_render_map(&source, &mut container, &request));
        assert!(matches!(result, Err(MapError::Status { status: 404, .. })));

        block_on(render_map(&source, &mut container, &request));
        assert_eq!(container.surfaces().len(), 2);
        assert!(container.surfaces().iter().all(|s| s.elements().is_empty()));
    }

    #[test]
    fn missing_region_object_draws_nothing() {
        let topology = Topology::from_slice(PAIR_TOPOLOGY.as_bytes()).unwrap();
        let request = MapRequest::us_map(SelectionSet::new(), "/geo/");
        let mut surface = request.new_surface();

        let result = draw_map(&topology, &request, &mut surface);
        assert!(matches!(result, Err(MapError::MissingObject(name)) if name == "states"));
        assert!(surface.elements().is_empty());
    }

    #[test]
    fn data_url_joins_base_and_resource() {
        let selected = SelectionSet::new();
        assert_eq!(
            MapRequest::world_map(selected.clone(), "/geo/").data_url(),
            "/geo/world-50m.json"
        );
        assert_eq!(
            MapRequest::us_map(selected.clone(), "https://cdn.example.org/geo").data_url(),
            "https://cdn.example.org/geo/us.json"
        );
        assert_eq!(MapRequest::us_map(selected, "").data_url(), "us.json");
    }

    #[test]
    fn map_mode_parses_names() {
        assert_eq!("world".parse::<MapMode>(), Ok(MapMode::World));
        assert_eq!(" US ".parse::<MapMode>(), Ok(MapMode::Us));
        assert_eq!(
            "mars".parse::<MapMode>(),
            Err(UnknownMapMode("mars".to_string()))
        );
        assert_eq!(MapMode::Us.to_string(), "us");
    }

    #[test]
    fn graticule_covers_the_globe() {
        let lines = graticule();
        assert_eq!(lines.0.len(), 37 + 17);
        assert_eq!(lines.0[0].0.first(), Some(&Coord { x: -180.0, y: -80.0 }));
        assert_eq!(lines.0[0].0.last(), Some(&Coord { x: -180.0, y: 80.0 }));
    }
}
