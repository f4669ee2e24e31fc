use choropleth_shared::{MapMode, MapOptions, MapRequest, SelectionSet, UnknownMapMode};

pub const DEFAULT_GEO_BASE: &str = "/geo/";

/// Per-element map settings read from `data-*` attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub mode: MapMode,
    pub selected: SelectionSet,
    pub geo_base: String,
    pub options: MapOptions,
}

impl MapConfig {
    /// `attr` looks up an attribute by name, as `Element::get_attribute` does.
    pub fn from_attributes(
        attr: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, UnknownMapMode> {
        let mode = match attr("data-mode") {
            Some(value) if !value.trim().is_empty() => value.parse::<MapMode>()?,
            _ => MapMode::World,
        };
        let selected = attr("data-selected")
            .map(|raw| SelectionSet::parse(&raw))
            .unwrap_or_default();
        let geo_base = attr("data-geo-base")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GEO_BASE.to_owned());

        let defaults = MapOptions::default();
        let options = MapOptions {
            us_empty_selects_all: parse_flag(
                attr("data-us-empty-selects-all"),
                defaults.us_empty_selects_all,
            ),
            graticule: parse_flag(attr("data-graticule"), defaults.graticule),
        };

        Ok(Self {
            mode,
            selected,
            geo_base,
            options,
        })
    }

    pub fn request(&self) -> MapRequest {
        MapRequest::new(self.selected.clone(), self.geo_base.clone(), self.mode)
            .with_options(self.options)
    }
}

/// A bare attribute (`data-graticule`) counts as on.
fn parse_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
