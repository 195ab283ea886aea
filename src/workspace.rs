//! Persisted zones and per-source color rules.
//!
//! The file layout mirrors what the map front end stores:
//!
//! ```json
//! {
//!   "polygons": [{ "id": "1", "name": "Nagpur", "coordinates": [[21.1, 79.0], ...], "dataSource": "openmeteo" }],
//!   "colorRules": { "openmeteo": { "field": "temperature_2m", "rules": [...] } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;
use crate::rules::RuleSet;
use crate::weather::Coordinate;

pub const DEFAULT_SOURCE: &str = "openmeteo";

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,

    /// Vertices as `[latitude, longitude]` pairs.
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,

    #[serde(default = "default_source")]
    pub data_source: String,
}

impl Zone {
    /// Mean of the vertices; `None` for a zone with no vertices.
    pub fn centroid(&self) -> Option<Coordinate> {
        if self.coordinates.is_empty() {
            return None;
        }
        let n = self.coordinates.len() as f64;
        let (lat, lng) = self
            .coordinates
            .iter()
            .fold((0.0, 0.0), |(lat, lng), [a, b]| (lat + a, lng + b));
        Some(Coordinate::new(lat / n, lng / n))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default)]
    pub polygons: Vec<Zone>,

    #[serde(default = "default_rules")]
    pub color_rules: BTreeMap<String, RuleSet>,
}

fn default_rules() -> BTreeMap<String, RuleSet> {
    BTreeMap::from([(DEFAULT_SOURCE.to_string(), RuleSet::default_temperature())])
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            polygons: Vec::new(),
            color_rules: default_rules(),
        }
    }
}

impl Workspace {
    /// Reads a workspace file; a missing file yields an empty workspace.
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no workspace file, starting empty");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), WorkspaceError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn rules_for(&self, zone: &Zone) -> Option<&RuleSet> {
        self.color_rules.get(&zone.data_source)
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.polygons.iter().find(|z| z.id == id)
    }

    /// Appends a zone and returns its id.
    pub fn add_zone(&mut self, name: Option<&str>, coordinates: Vec<[f64; 2]>) -> String {
        let next = self
            .polygons
            .iter()
            .filter_map(|z| z.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        let id = next.to_string();
        let name = name.map_or_else(|| format!("Polygon {}", self.polygons.len() + 1), str::to_string);
        self.polygons.push(Zone {
            id: id.clone(),
            name,
            coordinates,
            data_source: default_source(),
        });
        id
    }

    pub fn remove_zone(&mut self, id: &str) -> Result<Zone, WorkspaceError> {
        let index = self
            .polygons
            .iter()
            .position(|z| z.id == id)
            .ok_or_else(|| WorkspaceError::UnknownZone(id.to_string()))?;
        Ok(self.polygons.remove(index))
    }

    pub fn rename_zone(&mut self, id: &str, name: &str) -> Result<(), WorkspaceError> {
        let name = name.trim();
        let zone = self
            .polygons
            .iter_mut()
            .find(|z| z.id == id)
            .ok_or_else(|| WorkspaceError::UnknownZone(id.to_string()))?;
        if !name.is_empty() {
            zone.name = name.to_string();
        }
        Ok(())
    }
}
