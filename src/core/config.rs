//! Map configuration
//!
//! A map definition is loaded once from JSON, validated, and then shared
//! immutably with every component that needs it. Field names follow the
//! JSON format maps are authored in.

use crate::{
    constants::{DEFAULT_CIRCLE_COLOR, DEFAULT_CIRCLE_RADIUS, DEFAULT_CRS, DEFAULT_ICON_SIZE},
    core::{
        crs::CoordinateSpace,
        geo::{NativeBox, NativePoint},
    },
    rendering::surface::{CircleStyle, IconStyle, MarkerStyle, ShapeStyle},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Scope at which collected/dismissed markers are tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectibleMode {
    /// Markers cannot be dismissed
    #[default]
    None,
    /// Each marker is tracked on its own
    Individual,
    /// One flag for the whole group on this map
    Group,
    /// One flag for the group, shared by every map
    GlobalGroup,
}

impl CollectibleMode {
    pub fn is_collectible(&self) -> bool {
        !matches!(self, CollectibleMode::None)
    }
}

fn default_true() -> bool {
    true
}

fn default_crs() -> NativeBox {
    NativeBox::from_corners(DEFAULT_CRS)
}

/// Shared visual style and behaviour of a class of markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub collectible: CollectibleMode,
    /// Whether the group's legend toggle starts switched on
    #[serde(default = "default_true")]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_searchable: bool,
    #[serde(default)]
    pub article: Option<String>,
}

impl GroupDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            size: None,
            fill_color: None,
            collectible: CollectibleMode::None,
            is_default: true,
            is_searchable: true,
            article: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_collectible(mut self, mode: CollectibleMode) -> Self {
        self.collectible = mode;
        self
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.article = Some(article.into());
        self
    }

    pub fn hidden_by_default(mut self) -> Self {
        self.is_default = false;
        self
    }

    /// Icon groups render as image markers, everything else as circles
    pub fn style(&self) -> MarkerStyle {
        match &self.icon {
            Some(icon) => MarkerStyle::Icon(IconStyle {
                icon: icon.clone(),
                size: self.size.unwrap_or(DEFAULT_ICON_SIZE),
            }),
            None => MarkerStyle::Circle(CircleStyle {
                fill_color: self
                    .fill_color
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CIRCLE_COLOR.to_string()),
                radius: self.size.unwrap_or(DEFAULT_CIRCLE_RADIUS),
            }),
        }
    }
}

/// A non-group layer markers can be tagged with
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    #[serde(default)]
    pub name: Option<String>,
    /// Layer starts switched off
    #[serde(default)]
    pub hidden: bool,
    /// Layers sharing an exclusive group are shown one at a time
    #[serde(default)]
    pub exclusive: Option<String>,
}

/// Background image plus overlays drawn on top of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub image: String,
    /// Image placement; defaults to the map's coordinate space
    #[serde(default)]
    pub at: Option<NativeBox>,
    #[serde(default)]
    pub overlays: Vec<OverlayDefinition>,
}

impl BackgroundDefinition {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            name: None,
            image: image.into(),
            at: None,
            overlays: Vec::new(),
        }
    }
}

/// Raw overlay entry. Which fields are set decides the shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub at: Option<NativeBox>,
    #[serde(default)]
    pub path: Option<Vec<NativePoint>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub thickness: Option<f64>,
}

/// Resolved overlay geometry
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Image { image: String, at: NativeBox },
    Rectangle { at: NativeBox, style: ShapeStyle },
    Polyline { path: Vec<NativePoint>, style: ShapeStyle },
}

impl OverlayDefinition {
    pub fn shape(&self) -> Result<OverlayShape> {
        let style = ShapeStyle {
            color: self.color.clone(),
            thickness: self.thickness,
        };
        match (&self.image, &self.at, &self.path) {
            (Some(image), Some(at), None) => Ok(OverlayShape::Image {
                image: image.clone(),
                at: *at,
            }),
            (None, Some(at), None) => Ok(OverlayShape::Rectangle { at: *at, style }),
            (None, None, Some(path)) if path.len() >= 2 => Ok(OverlayShape::Polyline {
                path: path.clone(),
                style,
            }),
            _ => Err(MapError::InvalidConfig(format!(
                "overlay {:?} must be an image with bounds, a rectangle or a path of two or more points",
                self.name.as_deref().unwrap_or("<unnamed>")
            ))),
        }
    }
}

/// Complete map definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(default = "default_crs")]
    pub crs: NativeBox,
    #[serde(default)]
    pub backgrounds: Vec<BackgroundDefinition>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupDefinition>,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerDefinition>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            crs: default_crs(),
            backgrounds: Vec::new(),
            groups: BTreeMap::new(),
            layers: BTreeMap::new(),
        }
    }
}

impl MapConfig {
    /// Parses and validates a JSON map definition
    pub fn from_json(source: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON map definition from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    /// Checks everything that would otherwise fail later during construction
    pub fn validate(&self) -> Result<()> {
        self.coordinate_space()?;

        if self.backgrounds.is_empty() {
            return Err(MapError::InvalidConfig(
                "at least one background is required".to_string(),
            ));
        }
        for background in &self.backgrounds {
            for overlay in &background.overlays {
                overlay.shape()?;
            }
        }

        for id in self.groups.keys().chain(self.layers.keys()) {
            if id.is_empty() || id.contains(char::is_whitespace) {
                return Err(MapError::InvalidConfig(format!(
                    "layer identifier {:?} must be non-empty and contain no whitespace",
                    id
                )));
            }
        }
        if let Some(clash) = self.layers.keys().find(|id| self.groups.contains_key(*id)) {
            return Err(MapError::InvalidConfig(format!(
                "{} is declared both as a group and as a layer",
                clash
            )));
        }
        Ok(())
    }

    /// Derives the coordinate transform for this map
    pub fn coordinate_space(&self) -> Result<CoordinateSpace> {
        CoordinateSpace::new(self.crs)
    }

    pub fn group(&self, id: &str) -> Option<&GroupDefinition> {
        self.groups.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerDefinition> {
        self.layers.get(id)
    }

    /// Initial toggle state for a group or layer identifier. Unknown
    /// layers start visible.
    pub fn initially_visible(&self, id: &str) -> bool {
        if let Some(group) = self.groups.get(id) {
            return group.is_default;
        }
        self.layers.get(id).map(|layer| !layer.hidden).unwrap_or(true)
    }

    /// Exclusive group a layer belongs to, if any
    pub fn exclusive_group(&self, id: &str) -> Option<&str> {
        self.layers.get(id).and_then(|layer| layer.exclusive.as_deref())
    }

    /// Where a background's image is placed in native space
    pub fn background_bounds(&self, index: usize) -> Option<NativeBox> {
        self.backgrounds
            .get(index)
            .map(|background| background.at.unwrap_or(self.crs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "crs": [[0, 0], [1000, 1000]],
        "backgrounds": [
            { "name": "Surface", "image": "Map.png" },
            {
                "name": "Underground",
                "image": "Caves.png",
                "at": [[0, 0], [500, 500]],
                "overlays": [
                    { "name": "Zone", "at": [[10, 10], [20, 20]], "color": "#f00" },
                    { "path": [[0, 0], [5, 5], [10, 0]] }
                ]
            }
        ],
        "groups": {
            "chest": { "name": "Chests", "icon": "Chest.png", "collectible": "individual" },
            "boss": { "name": "Bosses", "fillColor": "#ff0000", "collectible": "globalGroup", "isDefault": false }
        },
        "layers": {
            "cave": { "name": "Caves", "hidden": true, "exclusive": "depth" },
            "surface": { "exclusive": "depth" }
        }
    }"##;

    #[test]
    fn test_parse_sample() {
        let config = MapConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.backgrounds.len(), 2);
        assert_eq!(config.groups.len(), 2);

        let chest = config.group("chest").unwrap();
        assert_eq!(chest.collectible, CollectibleMode::Individual);
        assert!(chest.is_default);
        assert!(chest.is_searchable);
        assert!(matches!(chest.style(), MarkerStyle::Icon(_)));

        let boss = config.group("boss").unwrap();
        assert_eq!(boss.collectible, CollectibleMode::GlobalGroup);
        assert!(!config.initially_visible("boss"));
        match boss.style() {
            MarkerStyle::Circle(style) => assert_eq!(style.fill_color, "#ff0000"),
            other => panic!("unexpected style {:?}", other),
        }

        assert!(!config.initially_visible("cave"));
        assert!(config.initially_visible("surface"));
        assert!(config.initially_visible("undeclared"));
        assert_eq!(config.exclusive_group("cave"), Some("depth"));
    }

    #[test]
    fn test_background_bounds_default_to_crs() {
        let config = MapConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.background_bounds(0), Some(config.crs));
        assert_eq!(
            config.background_bounds(1),
            Some(NativeBox::from_corners([[0.0, 0.0], [500.0, 500.0]]))
        );
        assert_eq!(config.background_bounds(2), None);
    }

    #[test]
    fn test_overlay_shapes() {
        let config = MapConfig::from_json(SAMPLE).unwrap();
        let overlays = &config.backgrounds[1].overlays;
        assert!(matches!(overlays[0].shape().unwrap(), OverlayShape::Rectangle { .. }));
        assert!(matches!(overlays[1].shape().unwrap(), OverlayShape::Polyline { .. }));

        let broken = OverlayDefinition::default();
        assert!(matches!(broken.shape(), Err(MapError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_crs() {
        let config = MapConfig::from_json(r#"{ "backgrounds": [{ "image": "a.png" }] }"#).unwrap();
        assert_eq!(config.crs, NativeBox::from_corners(DEFAULT_CRS));
    }

    #[test]
    fn test_validation_errors() {
        let no_background = r#"{ "groups": {} }"#;
        assert!(matches!(
            MapConfig::from_json(no_background),
            Err(MapError::InvalidConfig(_))
        ));

        let bad_crs = r#"{ "crs": [[0, 100], [100, 0]], "backgrounds": [{ "image": "a.png" }] }"#;
        assert!(matches!(
            MapConfig::from_json(bad_crs),
            Err(MapError::InvalidCoordinateSpace(_))
        ));

        let spaced = r#"{ "backgrounds": [{ "image": "a.png" }], "groups": { "a b": { "name": "x" } } }"#;
        assert!(matches!(
            MapConfig::from_json(spaced),
            Err(MapError::InvalidConfig(_))
        ));

        let clash = r#"{
            "backgrounds": [{ "image": "a.png" }],
            "groups": { "ore": { "name": "Ore" } },
            "layers": { "ore": {} }
        }"#;
        assert!(matches!(
            MapConfig::from_json(clash),
            Err(MapError::InvalidConfig(_))
        ));
    }
}
