//! Lessons - the built-in catalog and YAML lesson files

pub mod heat_flux;

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::expr::ExprError;
use crate::core::graph::{AxisRange, BoundConstraint, GraphDescription, Series};
use crate::core::rule::UpdateRule;
use crate::core::variable::VariableDescription;

pub use heat_flux::{heat_flux_initial_values, heat_flux_lesson, HeatFluxParams};

#[derive(Debug, Error)]
pub enum LessonError {
    #[error("Unknown lesson '{0}' (see `heatlab sim list`)")]
    Unknown(String),

    #[error("Failed to read lesson {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid lesson {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Lesson {path}: a sampling grid needs an expression rule")]
    GridNeedsExpr { path: String },

    #[error("Lesson {path}: grid needs at least 2 points, got {points}")]
    GridTooSmall { path: String, points: usize },

    #[error(transparent)]
    Formula(#[from] ExprError),
}

/// A lesson that ships with heatlab
pub struct CatalogEntry {
    pub name: &'static str,
    pub summary: &'static str,
    build: fn() -> Result<GraphDescription, ExprError>,
}

impl CatalogEntry {
    pub fn description(&self) -> Result<GraphDescription, LessonError> {
        Ok((self.build)()?)
    }
}

const CATALOG: &[CatalogEntry] = &[CatalogEntry {
    name: heat_flux::LESSON_NAME,
    summary: "Net radiative exchange between two grey surfaces versus outer emissivity",
    build: heat_flux_lesson,
}];

pub fn catalog() -> &'static [CatalogEntry] {
    CATALOG
}

/// Resolve a built-in lesson name or a path to a YAML lesson file
pub fn resolve(name_or_path: &str) -> Result<GraphDescription, LessonError> {
    if let Some(entry) = CATALOG.iter().find(|e| e.name == name_or_path) {
        return entry.description();
    }

    let path = Path::new(name_or_path);
    if path.is_file() {
        return load_file(path);
    }

    Err(LessonError::Unknown(name_or_path.to_string()))
}

/// Where the curve's starting data comes from in a lesson file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InitialData {
    Values(Series),
    Grid { grid: Grid },
}

/// Evenly spaced abscissas, inclusive of both ends
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Grid {
    pub start: f64,
    pub end: f64,
    pub points: usize,
}

/// On-disk shape of a lesson
#[derive(Debug, Clone, Deserialize)]
pub struct LessonFile {
    pub title: String,
    pub variables: Vec<VariableDescription>,
    pub rule: UpdateRule,
    pub initial: InitialData,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default)]
    pub constraints: Vec<BoundConstraint>,
}

fn default_height() -> u32 {
    400
}

fn default_width() -> u32 {
    600
}

impl LessonFile {
    /// Turn into a description, sampling the grid through the rule if needed
    pub fn into_description(self, origin: &str) -> Result<GraphDescription, LessonError> {
        let initial = match self.initial {
            InitialData::Values(series) => series,
            InitialData::Grid { grid } => {
                let UpdateRule::Expr(formula) = &self.rule else {
                    return Err(LessonError::GridNeedsExpr {
                        path: origin.to_string(),
                    });
                };
                if grid.points < 2 {
                    return Err(LessonError::GridTooSmall {
                        path: origin.to_string(),
                        points: grid.points,
                    });
                }
                let params: std::collections::BTreeMap<String, f64> = self
                    .variables
                    .iter()
                    .map(|v| (v.name.clone(), v.init))
                    .collect();
                let step = (grid.end - grid.start) / (grid.points - 1) as f64;
                let x: Vec<f64> = (0..grid.points)
                    .map(|i| grid.start + step * i as f64)
                    .collect();
                let y = x.iter().map(|x| formula.expr().eval(*x, &params)).collect();
                Series::new(x, y)
            }
        };

        Ok(GraphDescription {
            title: self.title,
            variables: self.variables,
            rule: self.rule,
            initial,
            x_range: self.x_range,
            y_range: self.y_range,
            x_label: self.x_label,
            y_label: self.y_label,
            height: self.height,
            width: self.width,
            constraints: self.constraints,
        })
    }
}

/// Parse lesson YAML
pub fn parse_lesson(content: &str, origin: &str) -> Result<GraphDescription, LessonError> {
    let file: LessonFile = serde_yml::from_str(content).map_err(|e| LessonError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;
    file.into_description(origin)
}

/// Read and parse a lesson file
pub fn load_file(path: &Path) -> Result<GraphDescription, LessonError> {
    let origin = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| LessonError::Io {
        path: origin.clone(),
        message: e.to_string(),
    })?;
    debug!(path = %origin, "Loading lesson");
    parse_lesson(&content, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_LESSON: &str = r#"
title: Straight line
variables:
  - name: k
    label: Slope
    min: 0
    max: 1
    step: 0.1
    init: 0.5
rule:
  expr: "k * x"
initial:
  grid: { start: 0, end: 2, points: 3 }
x_range: [0, 2]
y_range: [0, 2]
"#;

    #[test]
    fn test_catalog_resolves_heat_flux() {
        let gd = resolve("heat-flux").unwrap();
        assert_eq!(gd.variables.len(), 5);
        assert_eq!(gd.initial.len(), 500);
    }

    #[test]
    fn test_every_catalog_entry_builds() {
        for entry in catalog() {
            let gd = entry.description().unwrap();
            assert!(gd.validate().is_ok(), "{} is invalid", entry.name);
        }
    }

    #[test]
    fn test_unknown_lesson() {
        assert!(matches!(resolve("no-such-lesson"), Err(LessonError::Unknown(_))));
    }

    #[test]
    fn test_grid_is_sampled_through_rule() {
        let gd = parse_lesson(LINE_LESSON, "line.yaml").unwrap();
        assert_eq!(gd.initial.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(gd.initial.y, vec![0.0, 0.5, 1.0]);
        assert_eq!((gd.width, gd.height), (600, 400));
    }

    #[test]
    fn test_explicit_values() {
        let yaml = LINE_LESSON.replace(
            "  grid: { start: 0, end: 2, points: 3 }",
            "  x: [0, 1]\n  y: [3, 4]",
        );
        let gd = parse_lesson(&yaml, "line.yaml").unwrap();
        assert_eq!(gd.initial.y, vec![3.0, 4.0]);
    }

    #[test]
    fn test_grid_with_script_rejected() {
        let yaml = LINE_LESSON.replace("  expr: \"k * x\"", "  script: \"source.change.emit();\"");
        assert!(matches!(
            parse_lesson(&yaml, "line.yaml"),
            Err(LessonError::GridNeedsExpr { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.yaml");
        std::fs::write(&path, LINE_LESSON).unwrap();

        let gd = resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(gd.title, "Straight line");
    }
}
