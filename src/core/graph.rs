//! Graph descriptions - declarative configuration of one interactive plot

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::core::rule::UpdateRule;
use crate::core::variable::{VariableDescription, SOURCE_IDENT};

/// Errors raised when a description breaks its invariants
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    #[error("'{0}' is not a valid identifier (use letters, digits and '_', not starting with a digit)")]
    InvalidIdentifier(String),

    #[error("'{0}' is reserved and cannot be used as a variable name")]
    ReservedIdentifier(String),

    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    #[error("Initial data has {x} x-values but {y} y-values")]
    LengthMismatch { x: usize, y: usize },

    #[error("Update rule references undeclared identifier '{0}'")]
    UndeclaredIdentifier(String),

    #[error("Constraint refers to unknown variable '{0}'")]
    UnknownConstraintVariable(String),

    #[error("Invalid {axis} range: {reason}")]
    InvalidRange { axis: &'static str, reason: String },

    #[error("Plot size must be non-zero, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// The (x, y) arrays backing a curve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Smallest and largest finite y-value
    pub fn y_extent(&self) -> Option<(f64, f64)> {
        self.y
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Visible range of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct AxisRange {
    pub start: f64,
    pub end: f64,
}

impl AxisRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    fn validate(&self, axis: &'static str) -> Result<(), GraphError> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(GraphError::InvalidRange {
                axis,
                reason: "bounds must be finite".to_string(),
            });
        }
        if self.start == self.end {
            return Err(GraphError::InvalidRange {
                axis,
                reason: format!("start and end are both {}", self.start),
            });
        }
        Ok(())
    }
}

impl From<[f64; 2]> for AxisRange {
    fn from([start, end]: [f64; 2]) -> Self {
        Self { start, end }
    }
}

impl From<AxisRange> for [f64; 2] {
    fn from(range: AxisRange) -> Self {
        [range.start, range.end]
    }
}

/// Keeps one slider strictly below another.
///
/// On every update the upper end of `control` is moved to
/// `below.value - below.step`, and `control` is pulled down when it reaches
/// `below`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundConstraint {
    pub control: String,
    pub below: String,
}

impl BoundConstraint {
    pub fn new(control: impl Into<String>, below: impl Into<String>) -> Self {
        Self {
            control: control.into(),
            below: below.into(),
        }
    }
}

/// Everything needed to build one interactive plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    /// Plot title
    pub title: String,

    /// Parameters, in display order
    pub variables: Vec<VariableDescription>,

    pub rule: UpdateRule,

    /// Data the curve shows before any slider moves
    pub initial: Series,

    pub x_range: AxisRange,
    pub y_range: AxisRange,

    #[serde(default)]
    pub x_label: String,
    #[serde(default)]
    pub y_label: String,

    /// Plot height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Plot width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<BoundConstraint>,
}

fn default_height() -> u32 {
    400
}

fn default_width() -> u32 {
    600
}

impl GraphDescription {
    /// Check every invariant, returning non-fatal warnings on success
    pub fn validate(&self) -> Result<Vec<String>, GraphError> {
        let mut warnings = Vec::new();
        let mut names = BTreeSet::new();

        for var in &self.variables {
            var.validate()?;
            if !names.insert(var.name.as_str()) {
                return Err(GraphError::DuplicateVariable(var.name.clone()));
            }
        }

        if self.initial.x.len() != self.initial.y.len() {
            return Err(GraphError::LengthMismatch {
                x: self.initial.x.len(),
                y: self.initial.y.len(),
            });
        }

        self.x_range.validate("x")?;
        self.y_range.validate("y")?;
        if self.width == 0 || self.height == 0 {
            return Err(GraphError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }

        for constraint in &self.constraints {
            for name in [&constraint.control, &constraint.below] {
                if !names.contains(name.as_str()) {
                    return Err(GraphError::UnknownConstraintVariable(name.clone()));
                }
            }
        }

        let declared: Vec<&str> = names.iter().copied().collect();
        let referenced = self.rule.referenced(&declared);

        if let UpdateRule::Expr(_) = &self.rule {
            if let Some(unknown) = referenced.iter().find(|r| !names.contains(*r)) {
                return Err(GraphError::UndeclaredIdentifier(unknown.to_string()));
            }
        } else if !self.rule.uses_source() {
            warnings.push(format!(
                "script rule never mentions '{}', the curve will not change",
                SOURCE_IDENT
            ));
        }

        for name in &declared {
            if !referenced.contains(name) {
                warnings.push(format!("variable '{}' is not used by the update rule", name));
            }
        }

        Ok(warnings)
    }

    /// Names of the declared variables, in display order
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDescription> {
        self.variables.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn slope_graph() -> GraphDescription {
        GraphDescription {
            title: "Slope".to_string(),
            variables: vec![VariableDescription::new("k", "Slope", 0.0, 1.0, 0.1, 0.5)],
            rule: UpdateRule::expr("k * x").unwrap(),
            initial: Series::new(vec![0.0, 1.0, 2.0], vec![0.0, 0.5, 1.0]),
            x_range: AxisRange::new(0.0, 2.0),
            y_range: AxisRange::new(0.0, 2.0),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            height: 400,
            width: 600,
            constraints: Vec::new(),
        }
    }

    #[test]
    fn test_valid_graph_has_no_warnings() {
        assert!(slope_graph().validate().unwrap().is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut gd = slope_graph();
        gd.initial.y.pop();
        assert!(matches!(
            gd.validate(),
            Err(GraphError::LengthMismatch { x: 3, y: 2 })
        ));
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let mut gd = slope_graph();
        gd.variables.push(gd.variables[0].clone());
        assert!(matches!(gd.validate(), Err(GraphError::DuplicateVariable(_))));
    }

    #[test]
    fn test_undeclared_identifier_rejected() {
        let mut gd = slope_graph();
        gd.rule = UpdateRule::expr("k * x + offset").unwrap();
        let err = gd.validate().unwrap_err();
        assert!(err.to_string().contains("offset"));
    }

    #[test]
    fn test_unused_variable_warns() {
        let mut gd = slope_graph();
        gd.variables
            .push(VariableDescription::new("unused", "Unused", 0.0, 1.0, 0.1, 0.0));
        let warnings = gd.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unused"));
    }

    #[test]
    fn test_script_without_source_warns() {
        let mut gd = slope_graph();
        gd.rule = UpdateRule::script("console.log(k.value);");
        let warnings = gd.validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("source")));
    }

    #[test]
    fn test_unknown_constraint_variable_rejected() {
        let mut gd = slope_graph();
        gd.constraints.push(BoundConstraint::new("k", "missing"));
        assert!(matches!(
            gd.validate(),
            Err(GraphError::UnknownConstraintVariable(_))
        ));
    }

    #[test]
    fn test_degenerate_range_rejected() {
        let mut gd = slope_graph();
        gd.y_range = AxisRange::new(1.0, 1.0);
        assert!(matches!(gd.validate(), Err(GraphError::InvalidRange { axis: "y", .. })));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let gd = slope_graph();
        let yaml = serde_yml::to_string(&gd).unwrap();
        let parsed: GraphDescription = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(gd, parsed);
    }

    #[test]
    fn test_y_extent_skips_non_finite() {
        let series = Series::new(vec![0.0, 1.0, 2.0], vec![f64::NAN, -3.0, 2.0]);
        assert_eq!(series.y_extent(), Some((-3.0, 2.0)));
    }
}
