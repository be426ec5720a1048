//! Board resolution: turns a scenario's map spec into engine map settings

use std::path::Path;

use serde::Deserialize;

use crate::campaign::{BoardSource, MapSpec};
use crate::core::error::{Result, SortieError};
use crate::engine::{
    Atmosphere, BoardKind, GeneratedBoard, MapSettings, PlanetaryConditions, Weather, Wind,
};

/// Procedural board template, stored as TOML
#[derive(Debug, Clone, Deserialize)]
pub struct MapTemplate {
    pub theme: String,
    #[serde(default)]
    pub hills_pct: u8,
    #[serde(default)]
    pub water_pct: u8,
    #[serde(default)]
    pub forest_pct: u8,
    pub seed: Option<u64>,
}

impl MapTemplate {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let template: MapTemplate = toml::from_str(content)?;
        let coverage = template.hills_pct as u32 + template.water_pct as u32 + template.forest_pct as u32;
        if coverage > 100 {
            return Err(SortieError::Map(format!(
                "template '{}' covers {}% of the board",
                template.theme, coverage
            )));
        }
        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SortieError::Map(format!("cannot read template {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    fn into_board(self) -> GeneratedBoard {
        GeneratedBoard {
            theme: self.theme,
            hills_pct: self.hills_pct,
            water_pct: self.water_pct,
            forest_pct: self.forest_pct,
            seed: self.seed.unwrap_or_else(rand::random),
        }
    }
}

/// Both axes must exceed one hex and the map must be named
pub fn validate_dimensions(spec: &MapSpec) -> Result<()> {
    if spec.width <= 1 || spec.height <= 1 {
        return Err(SortieError::Map(format!(
            "board {}x{} is too small",
            spec.width, spec.height
        )));
    }
    if spec.identifier().trim().is_empty() {
        return Err(SortieError::Map("board has no map identifier".into()));
    }
    Ok(())
}

/// Build the settings the engine expects for one of the three board sources
pub fn resolve_map_settings(spec: &MapSpec, template_dir: &Path) -> Result<MapSettings> {
    validate_dimensions(spec)?;

    let settings = match &spec.source {
        BoardSource::Space => MapSettings {
            kind: BoardKind::Space,
            width: spec.width,
            height: spec.height,
            boards: Vec::new(),
            generated: None,
        },
        BoardSource::Fixed { name } => MapSettings {
            kind: BoardKind::Ground,
            width: spec.width,
            height: spec.height,
            boards: vec![name.clone()],
            generated: None,
        },
        BoardSource::Generated { template } => {
            let template = MapTemplate::load(&template_dir.join(template))?;
            MapSettings {
                kind: BoardKind::Ground,
                width: spec.width,
                height: spec.height,
                boards: Vec::new(),
                generated: Some(template.into_board()),
            }
        }
    };

    Ok(settings)
}

/// Check scenario conditions and fold in what the atmosphere implies
///
/// Weather and wind need air: in a vacuum both are forced calm.
pub fn prepare_conditions(conditions: &PlanetaryConditions) -> Result<PlanetaryConditions> {
    if !(conditions.gravity > 0.0 && conditions.gravity <= 10.0) {
        return Err(SortieError::Conditions(format!(
            "gravity {:.2}g is out of range",
            conditions.gravity
        )));
    }

    let mut prepared = conditions.clone();
    if prepared.atmosphere == Atmosphere::Vacuum {
        prepared.weather = Weather::Clear;
        prepared.wind = Wind::Calm;
        prepared.blowing_sand = false;
    }
    Ok(prepared)
}
