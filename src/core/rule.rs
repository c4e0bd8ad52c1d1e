//! Update rules - how a curve is recomputed when a slider moves

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::expr::{Expr, ExprError};
use crate::core::variable::SOURCE_IDENT;

/// A parsed formula that keeps its source text for display and round-trips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Formula {
    text: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(text: impl Into<String>) -> Result<Self, ExprError> {
        let text = text.into();
        let expr = Expr::parse(&text)?;
        Ok(Self { text, expr })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl TryFrom<String> for Formula {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Formula::parse(text).map_err(|e| e.message().to_string())
    }
}

impl From<Formula> for String {
    fn from(formula: Formula) -> Self {
        formula.text
    }
}

/// The rule bound to every slider of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateRule {
    /// `y[i] = formula(x[i], sliders)`, evaluated natively and compiled to JS
    Expr(Formula),

    /// Opaque page script, handed to the page unchanged and never run here.
    /// It sees every slider by identifier and the buffer as `source`.
    Script(String),
}

impl UpdateRule {
    /// Build an expression rule from formula text
    pub fn expr(text: impl Into<String>) -> Result<Self, ExprError> {
        Ok(UpdateRule::Expr(Formula::parse(text)?))
    }

    pub fn script(code: impl Into<String>) -> Self {
        UpdateRule::Script(code.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UpdateRule::Expr(_) => "expr",
            UpdateRule::Script(_) => "script",
        }
    }

    /// Identifiers the rule refers to.
    ///
    /// For scripts this is a lexical scan of word tokens, restricted to the
    /// `candidates` of interest.
    pub fn referenced<'a>(&'a self, candidates: &[&'a str]) -> BTreeSet<&'a str> {
        match self {
            UpdateRule::Expr(formula) => formula.expr().params(),
            UpdateRule::Script(code) => {
                let words: BTreeSet<&str> = code
                    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .filter(|w| !w.is_empty())
                    .collect();
                candidates
                    .iter()
                    .copied()
                    .filter(|c| words.contains(*c))
                    .collect()
            }
        }
    }

    /// Whether the rule reaches the data buffer
    pub fn uses_source(&self) -> bool {
        match self {
            UpdateRule::Expr(_) => true,
            UpdateRule::Script(_) => !self.referenced(&[SOURCE_IDENT]).is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_rule_roundtrip_yaml() {
        let rule = UpdateRule::expr("k * x").unwrap();
        let yaml = serde_yml::to_string(&rule).unwrap();
        assert!(yaml.contains("expr"));
        let parsed: UpdateRule = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(rule, parsed);
    }

    #[test]
    fn test_bad_formula_fails_deserialization() {
        let result: Result<UpdateRule, _> = serde_yml::from_str("expr: \"k * (x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_script_references() {
        let rule = UpdateRule::script("var d = source.data; var k = slope.value;");
        let refs = rule.referenced(&["slope", "offset"]);
        assert_eq!(refs.into_iter().collect::<Vec<_>>(), vec!["slope"]);
        assert!(rule.uses_source());

        let rule = UpdateRule::script("console.log(resource)");
        assert!(!rule.uses_source());
    }
}
