//! Heat flux between two grey surfaces as a function of the outer emissivity
//!
//! For an inner surface (area A1, emissivity e1, temperature T1) enclosed by
//! an outer one (A2, e2, T2) the net exchange is
//!
//! ```text
//! q = A1 σ (T1⁴ - T2⁴) / (1/e1 + A1/A2 (1/e2 - 1))
//! ```
//!
//! The curve sweeps e2 over (0, 1]. The seeding function and the slider
//! formula describe the same physics; the tests keep them in agreement.

use crate::core::expr::ExprError;
use crate::core::graph::{AxisRange, BoundConstraint, GraphDescription, Series};
use crate::core::rule::UpdateRule;
use crate::core::variable::VariableDescription;

/// Stefan-Boltzmann constant [W m⁻² K⁻⁴]
pub const SIGMA: f64 = 5.6704e-8;

/// Samples taken across the emissivity axis
pub const EMISSIVITY_STEPS: usize = 500;

pub const LESSON_NAME: &str = "heat-flux";

const FORMULA: &str = "if(area1 < area2, \
     area1 * 5.6704e-8 * (temperature1^4 - temperature2^4) \
     / (1/emissivity1 + area1/area2 * (1/x - 1)), -1)";

/// Physical inputs of the heat flux curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatFluxParams {
    /// Inner area [m²]
    pub a1: f64,
    /// Outer area [m²]
    pub a2: f64,
    /// Inner emissivity
    pub e1: f64,
    /// Outer temperature [K]
    pub t1: f64,
    /// Inner temperature [K]
    pub t2: f64,
}

impl Default for HeatFluxParams {
    fn default() -> Self {
        Self {
            a1: 1.0,
            a2: 10.0,
            e1: 0.4,
            t1: 275.0,
            t2: 280.0,
        }
    }
}

/// Heat flux sampled at `e2 = (i + 1) / steps` for `i in 0..steps`.
///
/// When the inner area is not smaller than the outer one every value is -1.
pub fn heat_flux_initial_values(params: &HeatFluxParams, steps: usize) -> Series {
    let mut x = Vec::with_capacity(steps);
    let mut y = Vec::with_capacity(steps);
    let HeatFluxParams { a1, a2, e1, t1, t2 } = *params;

    for i in 0..steps {
        let e2 = (i + 1) as f64 / steps as f64;
        x.push(e2);
        if a1 < a2 {
            y.push((a1 * SIGMA * (t1.powi(4) - t2.powi(4))) / (1.0 / e1 + (a1 / a2 * (1.0 / e2 - 1.0))));
        } else {
            y.push(-1.0);
        }
    }

    Series::new(x, y)
}

/// The heat flux lesson: five sliders and the curve they drive
pub fn heat_flux_lesson() -> Result<GraphDescription, ExprError> {
    let defaults = HeatFluxParams::default();

    let variables = vec![
        VariableDescription::new("temperature1", "Outer temperature [K]", 275.0, 350.0, 0.1, defaults.t1),
        VariableDescription::new("temperature2", "Inner temperature [K]", 275.0, 350.0, 0.1, defaults.t2),
        VariableDescription::new("emissivity1", "Inner ε", 0.0, 1.0, 0.002, defaults.e1),
        VariableDescription::new("area1", "Inner area1 [m²]", 1.0, 10.0, 0.1, defaults.a1),
        VariableDescription::new("area2", "Outer area [m²]", 1.0, 10.0, 0.1, defaults.a2),
    ];

    Ok(GraphDescription {
        title: "Heat flux value graph".to_string(),
        variables,
        rule: UpdateRule::expr(FORMULA)?,
        initial: heat_flux_initial_values(&defaults, EMISSIVITY_STEPS),
        x_range: AxisRange::new(0.0, 1.0),
        y_range: AxisRange::new(-10.0, 0.0),
        x_label: "Outer ε".to_string(),
        y_label: "Heat flux value []".to_string(),
        height: 400,
        width: 600,
        constraints: vec![BoundConstraint::new("area1", "area2")],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::{build_simulation, Redraw};
    use std::collections::BTreeMap;

    #[test]
    fn test_seeding_defaults() {
        let series = heat_flux_initial_values(&HeatFluxParams::default(), 500);
        assert_eq!(series.x.len(), 500);
        assert_eq!(series.y.len(), 500);
        assert_eq!(series.x[0], 1.0 / 500.0);
        assert_eq!(series.x[499], 1.0);
        assert!(series.y.iter().all(|v| v.is_finite() && *v < 0.0));
    }

    #[test]
    fn test_equal_areas_give_sentinel() {
        let params = HeatFluxParams {
            a1: 5.0,
            a2: 5.0,
            ..HeatFluxParams::default()
        };
        let series = heat_flux_initial_values(&params, 10);
        assert!(series.y.iter().all(|v| *v == -1.0));
    }

    #[test]
    fn test_formula_matches_seeding() {
        let lesson = heat_flux_lesson().unwrap();
        let UpdateRule::Expr(formula) = &lesson.rule else {
            panic!("heat flux lesson should use an expression rule");
        };
        let params: BTreeMap<String, f64> = lesson
            .variables
            .iter()
            .map(|v| (v.name.clone(), v.init))
            .collect();

        for (x, y) in lesson.initial.x.iter().zip(&lesson.initial.y) {
            let computed = formula.expr().eval(*x, &params);
            assert!((computed - y).abs() <= 1e-12 * y.abs().max(1.0), "x={} {} != {}", x, computed, y);
        }
    }

    #[test]
    fn test_lesson_builds() {
        let lesson = heat_flux_lesson().unwrap();
        assert!(lesson.validate().unwrap().is_empty());

        let sim = build_simulation(&lesson).unwrap();
        assert_eq!(sim.controls().len(), 5);
        assert_eq!(sim.plot().title, "Heat flux value graph");
    }

    #[test]
    fn test_sliders_reproduce_seeding() {
        let mut sim = build_simulation(&heat_flux_lesson().unwrap()).unwrap();
        let redraw = sim.set_by_name("temperature1", 300.0).unwrap();
        assert!(matches!(redraw, Redraw::Recomputed { .. }));

        let params = HeatFluxParams {
            t1: 300.0,
            ..HeatFluxParams::default()
        };
        let expected = heat_flux_initial_values(&params, EMISSIVITY_STEPS);
        for (got, want) in sim.source().data().y.iter().zip(&expected.y) {
            assert!((got - want).abs() <= 1e-9 * want.abs().max(1.0));
        }
        // T1 > T2 now, so heat flows outward
        assert!(sim.source().data().y.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_inner_area_stays_below_outer() {
        let mut sim = build_simulation(&heat_flux_lesson().unwrap()).unwrap();
        sim.set_by_name("area1", 8.0).unwrap();
        sim.set_by_name("area2", 5.0).unwrap();

        let values = sim.values();
        assert!(values["area1"] < values["area2"]);
        assert!((values["area1"] - 4.9).abs() < 1e-9);
        assert!(sim.source().data().y.iter().all(|v| *v != -1.0));
    }
}
