use std::fmt::Write as _;

use crate::selection::RegionId;

pub const LAND_CLASS: &str = "land";
pub const REGION_CLASS: &str = "region";
pub const SELECTED_REGION_CLASS: &str = "region selected";
pub const BOUNDARY_CLASS: &str = "region-boundary";
pub const GRATICULE_CLASS: &str = "graticule";

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// One `<path>` on a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgElement {
    pub class: String,
    pub d: String,
    pub region: Option<RegionId>,
}

impl SvgElement {
    pub fn new(class: impl Into<String>, d: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            d: d.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: Option<RegionId>) -> Self {
        self.region = region;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class.split_whitespace().any(|c| c == class)
    }

    fn write_markup(&self, out: &mut String) {
        out.push_str("<path class=\"");
        push_escaped(out, &self.class);
        out.push('"');
        if let Some(region) = &self.region {
            out.push_str(" data-id=\"");
            push_escaped(out, region.as_str());
            out.push('"');
        }
        out.push_str(" d=\"");
        push_escaped(out, &self.d);
        out.push_str("\"/>");
    }
}

/// A fixed-size drawing surface: one `<svg>` element and its children,
/// back to front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    elements: Vec<SvgElement>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn elements(&self) -> &[SvgElement] {
        &self.elements
    }

    pub fn push(&mut self, element: SvgElement) {
        self.elements.push(element);
    }

    /// Inserts right before the first element carrying `reference_class`, or
    /// on top when there is none.
    pub fn insert_before(&mut self, reference_class: &str, element: SvgElement) {
        let position = self
            .elements
            .iter()
            .position(|existing| existing.has_class(reference_class))
            .unwrap_or(self.elements.len());
        self.elements.insert(position, element);
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "<svg xmlns=\"{SVG_NAMESPACE}\" width=\"{}\" height=\"{}\">",
            self.width, self.height
        );
        for element in &self.elements {
            element.write_markup(&mut out);
        }
        out.push_str("</svg>");
        out
    }
}

/// Caller-owned page container. Surfaces are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapContainer {
    surfaces: Vec<Surface>,
}

impl MapContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// # Panics
    ///
    /// If `index` was not returned by [`MapContainer::append_surface`].
    pub fn surface_mut(&mut self, index: usize) -> &mut Surface {
        &mut self.surfaces[index]
    }

    /// Appends a surface and returns its index.
    pub fn append_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    pub fn to_markup(&self) -> String {
        self.surfaces.iter().map(Surface::to_markup).collect()
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
