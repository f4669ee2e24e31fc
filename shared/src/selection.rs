use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::render::{MapMode, MapOptions};

/// Region identifier as it appears in the topology file.
///
/// Numeric ids are kept as their decimal text so `6` and `"6"` compare equal,
/// while `"06"` stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RegionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for RegionId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRegionId {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for RegionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawRegionId::deserialize(deserializer)? {
            RawRegionId::Text(text) => Self(text),
            RawRegionId::Integer(n) => Self(n.to_string()),
            RawRegionId::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Self((n as i64).to_string())
            }
            RawRegionId::Float(n) => Self(n.to_string()),
        })
    }
}

impl Serialize for RegionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Caller-supplied set of regions to highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet(BTreeSet<RegionId>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<RegionId>) -> bool {
        self.0.insert(id.into())
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionId> {
        self.0.iter()
    }

    /// Parses either a JSON array (`["06", 48]`) or a comma-separated list.
    /// Blank entries are ignored.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[')
            && let Ok(ids) = serde_json::from_str::<Vec<RegionId>>(trimmed)
        {
            return ids.into_iter().collect();
        }
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(RegionId::from)
            .collect()
    }
}

impl<I: Into<RegionId>> FromIterator<I> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Decides how each region of one render is classed.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRule<'a> {
    selection: &'a SelectionSet,
    select_all: bool,
}

impl<'a> SelectionRule<'a> {
    pub fn new(selection: &'a SelectionSet, mode: MapMode, options: &MapOptions) -> Self {
        let select_all =
            mode == MapMode::Us && selection.is_empty() && options.us_empty_selects_all;
        Self {
            selection,
            select_all,
        }
    }

    pub fn is_selected(&self, id: Option<&RegionId>) -> bool {
        self.select_all || id.is_some_and(|id| self.selection.contains(id))
    }

    /// Boundaries are suppressed whenever every region is painted as selected.
    pub fn draws_boundaries(&self) -> bool {
        !self.select_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_id_decodes_strings_and_numbers() {
        let ids: Vec<RegionId> = serde_json::from_str(r#"["06", 6, 48.0, "USA"]"#).unwrap();
        assert_eq!(
            ids,
            vec![
                RegionId::from("06"),
                RegionId::from("6"),
                RegionId::from("48"),
                RegionId::from("USA"),
            ]
        );
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn selection_parse_accepts_json_and_comma_lists() {
        let json = SelectionSet::parse(r#"["06", 48, "06"]"#);
        assert_eq!(json.len(), 2);
        assert!(json.contains(&RegionId::from("48")));

        let list = SelectionSet::parse(" 840, 124,,840 ");
        assert_eq!(list.len(), 2);
        assert!(list.contains(&RegionId::from("124")));

        assert!(SelectionSet::parse("   ").is_empty());
    }

    #[test]
    fn world_rule_selects_only_members() {
        let selection: SelectionSet = ["004", "840"].into_iter().collect();
        let rule = SelectionRule::new(&selection, MapMode::World, &MapOptions::default());

        assert!(rule.is_selected(Some(&RegionId::from("840"))));
        assert!(!rule.is_selected(Some(&RegionId::from("124"))));
        assert!(!rule.is_selected(None));
        assert!(rule.draws_boundaries());
    }

    #[test]
    fn empty_world_selection_selects_nothing() {
        let selection = SelectionSet::new();
        let rule = SelectionRule::new(&selection, MapMode::World, &MapOptions::default());
        assert!(!rule.is_selected(Some(&RegionId::from("840"))));
        assert!(rule.draws_boundaries());
    }

    #[test]
    fn empty_us_selection_selects_everything_without_boundaries() {
        let selection = SelectionSet::new();
        let rule = SelectionRule::new(&selection, MapMode::Us, &MapOptions::default());
        assert!(rule.is_selected(Some(&RegionId::from("06"))));
        assert!(rule.is_selected(None));
        assert!(!rule.draws_boundaries());
    }

    #[test]
    fn empty_us_selection_follows_general_rule_when_flag_is_off() {
        let selection = SelectionSet::new();
        let options = MapOptions {
            us_empty_selects_all: false,
            ..MapOptions::default()
        };
        let rule = SelectionRule::new(&selection, MapMode::Us, &options);
        assert!(!rule.is_selected(Some(&RegionId::from("06"))));
        assert!(rule.draws_boundaries());
    }
}
