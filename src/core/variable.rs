//! Slider parameter descriptions

use serde::{Deserialize, Serialize};

use crate::core::expr::SAMPLE_IDENT;
use crate::core::graph::GraphError;

/// Binding name reserved for the plot's data buffer
pub const SOURCE_IDENT: &str = "source";

/// Prefix of the locals declared by compiled page rules
pub const JS_LOCAL_PREFIX: &str = "__hl_";

/// Globals and keywords a slider binding would shadow or fail to declare
const JS_RESERVED: &[&str] = &[
    "Math", "arguments", "eval", "undefined", "NaN", "Infinity", "await", "break", "case",
    "catch", "class", "const", "continue", "debugger", "default", "delete", "do", "else",
    "enum", "export", "extends", "false", "finally", "for", "function", "if", "implements",
    "import", "in", "instanceof", "interface", "let", "new", "null", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with", "yield",
];

/// A named numeric parameter that a slider control is generated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescription {
    /// Identifier used as the binding key in update rules
    pub name: String,

    /// Slider title shown to the user
    pub label: String,

    pub min: f64,
    pub max: f64,
    pub step: f64,

    /// Initial slider value
    pub init: f64,
}

impl VariableDescription {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
        init: f64,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            min,
            max,
            step,
            init,
        }
    }

    /// Check `min <= init <= max`, `step > 0` and the identifier rules
    pub fn validate(&self) -> Result<(), GraphError> {
        if !is_identifier(&self.name) {
            return Err(GraphError::InvalidIdentifier(self.name.clone()));
        }
        if is_reserved(&self.name) {
            return Err(GraphError::ReservedIdentifier(self.name.clone()));
        }

        let finite = [self.min, self.max, self.step, self.init]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(GraphError::InvalidVariable {
                name: self.name.clone(),
                reason: "bounds, step and initial value must be finite".to_string(),
            });
        }
        if self.step <= 0.0 {
            return Err(GraphError::InvalidVariable {
                name: self.name.clone(),
                reason: format!("step must be positive, got {}", self.step),
            });
        }
        if self.min > self.max {
            return Err(GraphError::InvalidVariable {
                name: self.name.clone(),
                reason: format!("min {} is greater than max {}", self.min, self.max),
            });
        }
        if self.init < self.min || self.init > self.max {
            return Err(GraphError::InvalidVariable {
                name: self.name.clone(),
                reason: format!(
                    "initial value {} is outside [{}, {}]",
                    self.init, self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

/// Names taken by formulas, the data buffer or the page's JavaScript
pub fn is_reserved(name: &str) -> bool {
    name == SAMPLE_IDENT
        || name == SOURCE_IDENT
        || name.starts_with(JS_LOCAL_PREFIX)
        || JS_RESERVED.contains(&name)
}

/// ASCII identifier usable both in formulas and as a JavaScript binding
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_variable() {
        let v = VariableDescription::new("emissivity1", "Inner ε", 0.0, 1.0, 0.002, 0.4);
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_init_outside_bounds_rejected() {
        let v = VariableDescription::new("k", "k", 0.0, 1.0, 0.1, 1.5);
        let err = v.validate().unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let v = VariableDescription::new("k", "k", 0.0, 1.0, 0.0, 0.5);
        assert!(matches!(v.validate(), Err(GraphError::InvalidVariable { .. })));
    }

    #[test]
    fn test_reserved_and_invalid_names() {
        let v = VariableDescription::new("x", "x", 0.0, 1.0, 0.1, 0.5);
        assert!(matches!(v.validate(), Err(GraphError::ReservedIdentifier(_))));

        let v = VariableDescription::new("source", "s", 0.0, 1.0, 0.1, 0.5);
        assert!(matches!(v.validate(), Err(GraphError::ReservedIdentifier(_))));

        let v = VariableDescription::new("1abc", "bad", 0.0, 1.0, 0.1, 0.5);
        assert!(matches!(v.validate(), Err(GraphError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_page_script_names_rejected() {
        for name in ["Math", "new", "var", "class", "arguments", "__hl_x"] {
            let v = VariableDescription::new(name, name, 0.0, 1.0, 0.1, 0.5);
            assert!(
                matches!(v.validate(), Err(GraphError::ReservedIdentifier(_))),
                "{} should be reserved",
                name
            );
        }

        for name in ["y", "i", "math", "newton", "__x"] {
            let v = VariableDescription::new(name, name, 0.0, 1.0, 0.1, 0.5);
            assert!(v.validate().is_ok(), "{} should be allowed", name);
        }
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("area_1"));
        assert!(is_identifier("_tmp"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
