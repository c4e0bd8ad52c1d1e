//! Simulation builder - turns a graph description into live, wired widgets
//!
//! The builder creates one slider per variable, a plot whose line trace reads
//! from a shared data buffer, and a single reactive rule registered as the
//! change listener of every slider. Rendering the result is left to a
//! presentation layer: the page renderer hands the rule to the browser, while
//! [`Simulation::set_value`] drives the same wiring in-process.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::graph::{AxisRange, BoundConstraint, GraphDescription, GraphError, Series};
use crate::core::rule::UpdateRule;
use crate::core::variable::SOURCE_IDENT;

/// Interaction tools enabled on every plot
pub const PLOT_TOOLS: &str = "pan,wheel_zoom";

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("No control named '{0}'")]
    UnknownControl(String),

    #[error("Control handle {0} does not belong to this simulation")]
    InvalidHandle(usize),

    #[error("Slider values must be finite, got {0}")]
    NonFiniteValue(f64),
}

/// Reference to a slider owned by a [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ControlHandle(usize);

impl ControlHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference to a reactive rule owned by a [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleId(usize);

/// A bounded-range input control
#[derive(Debug, Clone, Serialize)]
pub struct Slider {
    pub handle: ControlHandle,
    /// Binding identifier
    pub name: String,
    pub title: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub value: f64,
    /// Rules run on every value change
    pub listeners: Vec<RuleId>,
}

impl Slider {
    /// Snap `value` onto the step grid and clamp it into `[start, end]`
    pub fn snap(&self, value: f64) -> f64 {
        let steps = ((value - self.start) / self.step).round();
        let snapped = self.start + steps * self.step;
        snapped.clamp(self.start, self.end.max(self.start))
    }
}

/// The shared (x, y) buffer behind the rendered curve
#[derive(Debug, Clone, Serialize)]
pub struct DataBuffer {
    data: Series,
    revision: u64,
}

impl DataBuffer {
    fn new(data: Series) -> Self {
        Self { data, revision: 0 }
    }

    pub fn data(&self) -> &Series {
        &self.data
    }

    /// Incremented every time the plot is told to redraw
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn emit_change(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Styling of the single line trace
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LineTrace {
    pub line_width: f64,
    pub line_alpha: f64,
}

impl Default for LineTrace {
    fn default() -> Self {
        Self {
            line_width: 3.0,
            line_alpha: 0.6,
        }
    }
}

/// A plot sized, titled and labelled from the description
#[derive(Debug, Clone, Serialize)]
pub struct PlotSurface {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub x_label: String,
    pub y_label: String,
    pub tools: &'static str,
    pub line: LineTrace,
}

/// What a rule argument is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    Control(ControlHandle),
    Source,
}

/// The update rule together with every argument it is parameterized by
#[derive(Debug, Clone, Serialize)]
pub struct ReactiveRule {
    pub args: BTreeMap<String, Binding>,
    pub body: UpdateRule,
    pub constraints: Vec<BoundConstraint>,
}

/// Arrangement of the composed widgets
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Row(Vec<Layout>),
    Column(Vec<Layout>),
    Plot,
    Control(ControlHandle),
}

impl Layout {
    pub fn control_count(&self) -> usize {
        match self {
            Layout::Row(children) | Layout::Column(children) => {
                children.iter().map(Layout::control_count).sum()
            }
            Layout::Plot => 0,
            Layout::Control(_) => 1,
        }
    }

    pub fn plot_count(&self) -> usize {
        match self {
            Layout::Row(children) | Layout::Column(children) => {
                children.iter().map(Layout::plot_count).sum()
            }
            Layout::Plot => 1,
            Layout::Control(_) => 0,
        }
    }
}

/// What happened to the plot after a value change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// The buffer was recomputed; carries the new buffer revision
    Recomputed { revision: u64 },
    /// The rule is page script and only runs where the page is displayed
    Deferred,
    /// Nothing listens on this control
    Unbound,
}

/// A built, wired simulation
#[derive(Debug, Clone)]
pub struct Simulation {
    controls: Vec<Slider>,
    handles: BTreeMap<String, ControlHandle>,
    plot: PlotSurface,
    source: DataBuffer,
    rules: Vec<ReactiveRule>,
    layout: Layout,
}

/// Build the widgets described by `gd` and wire the update rule to every slider.
///
/// Descriptions that break their invariants are rejected, never clamped.
pub fn build_simulation(gd: &GraphDescription) -> Result<Simulation, GraphError> {
    for warning in gd.validate()? {
        warn!(graph = %gd.title, "{}", warning);
    }

    let mut controls = Vec::with_capacity(gd.variables.len());
    let mut handles = BTreeMap::new();
    let mut args = BTreeMap::new();

    for (index, var) in gd.variables.iter().enumerate() {
        let handle = ControlHandle(index);
        controls.push(Slider {
            handle,
            name: var.name.clone(),
            title: var.label.clone(),
            start: var.min,
            end: var.max,
            step: var.step,
            value: var.init,
            listeners: Vec::new(),
        });
        handles.insert(var.name.clone(), handle);
        args.insert(var.name.clone(), Binding::Control(handle));
    }

    let source = DataBuffer::new(gd.initial.clone());
    args.insert(SOURCE_IDENT.to_string(), Binding::Source);

    let plot = PlotSurface {
        title: gd.title.clone(),
        width: gd.width,
        height: gd.height,
        x_range: gd.x_range,
        y_range: gd.y_range,
        x_label: gd.x_label.clone(),
        y_label: gd.y_label.clone(),
        tools: PLOT_TOOLS,
        line: LineTrace::default(),
    };

    let rule_id = RuleId(0);
    let rules = vec![ReactiveRule {
        args,
        body: gd.rule.clone(),
        constraints: gd.constraints.clone(),
    }];

    for slider in &mut controls {
        slider.listeners.push(rule_id);
    }

    let inputs = Layout::Column(controls.iter().map(|s| Layout::Control(s.handle)).collect());
    let layout = Layout::Row(vec![Layout::Plot, inputs]);

    debug!(
        graph = %gd.title,
        controls = controls.len(),
        points = gd.initial.len(),
        rule = gd.rule.kind(),
        "Built simulation"
    );

    Ok(Simulation {
        controls,
        handles,
        plot,
        source,
        rules,
        layout,
    })
}

impl Simulation {
    pub fn controls(&self) -> &[Slider] {
        &self.controls
    }

    pub fn control(&self, handle: ControlHandle) -> Option<&Slider> {
        self.controls.get(handle.0)
    }

    /// Mapping from variable identifier to its control
    pub fn handles(&self) -> &BTreeMap<String, ControlHandle> {
        &self.handles
    }

    pub fn handle(&self, name: &str) -> Option<ControlHandle> {
        self.handles.get(name).copied()
    }

    pub fn plot(&self) -> &PlotSurface {
        &self.plot
    }

    pub fn source(&self) -> &DataBuffer {
        &self.source
    }

    pub fn rules(&self) -> &[ReactiveRule] {
        &self.rules
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Current slider values by identifier
    pub fn values(&self) -> BTreeMap<String, f64> {
        self.controls
            .iter()
            .map(|s| (s.name.clone(), s.value))
            .collect()
    }

    /// Deliver a value change to a slider and run its listeners
    pub fn set_value(&mut self, handle: ControlHandle, value: f64) -> Result<Redraw, SimulationError> {
        if !value.is_finite() {
            return Err(SimulationError::NonFiniteValue(value));
        }
        let slider = self
            .controls
            .get_mut(handle.0)
            .ok_or(SimulationError::InvalidHandle(handle.0))?;

        let snapped = slider.snap(value);
        debug!(control = %slider.name, requested = value, value = snapped, "Value changed");
        slider.value = snapped;

        let listeners = slider.listeners.clone();
        let mut redraw = Redraw::Unbound;
        for rule in listeners {
            redraw = self.run_rule(rule);
        }
        Ok(redraw)
    }

    /// [`Simulation::set_value`] by variable identifier
    pub fn set_by_name(&mut self, name: &str, value: f64) -> Result<Redraw, SimulationError> {
        let handle = self
            .handle(name)
            .ok_or_else(|| SimulationError::UnknownControl(name.to_string()))?;
        self.set_value(handle, value)
    }

    fn run_rule(&mut self, id: RuleId) -> Redraw {
        let Simulation {
            controls,
            rules,
            source,
            ..
        } = self;
        let rule = &rules[id.0];

        apply_constraints(controls, &rule.args, &rule.constraints);

        match &rule.body {
            UpdateRule::Expr(formula) => {
                let params: BTreeMap<String, f64> = rule
                    .args
                    .iter()
                    .filter_map(|(name, binding)| match binding {
                        Binding::Control(h) => Some((name.clone(), controls[h.0].value)),
                        Binding::Source => None,
                    })
                    .collect();

                let data = &mut source.data;
                for (x, y) in data.x.iter().zip(data.y.iter_mut()) {
                    *y = formula.expr().eval(*x, &params);
                }
                let revision = source.emit_change();
                debug!(revision, "Curve recomputed");
                Redraw::Recomputed { revision }
            }
            UpdateRule::Script(_) => {
                debug!("Script rule left to the page");
                Redraw::Deferred
            }
        }
    }
}

fn apply_constraints(
    controls: &mut [Slider],
    args: &BTreeMap<String, Binding>,
    constraints: &[BoundConstraint],
) {
    let lookup = |name: &str| match args.get(name) {
        Some(Binding::Control(h)) => Some(h.0),
        _ => None,
    };

    for constraint in constraints {
        let (Some(ctl), Some(bound)) = (lookup(&constraint.control), lookup(&constraint.below)) else {
            continue;
        };
        let limit = controls[bound].value - controls[bound].step;
        let slider = &mut controls[ctl];
        slider.end = limit;
        // within a hundredth of a step counts as sitting on the limit
        if slider.value > limit + slider.step * 1e-2 {
            debug!(control = %slider.name, value = limit, "Pulled below bound");
            slider.value = limit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::tests::slope_graph;
    use crate::core::variable::VariableDescription;

    #[test]
    fn test_one_control_one_plot() {
        let sim = build_simulation(&slope_graph()).unwrap();
        assert_eq!(sim.layout().control_count(), 1);
        assert_eq!(sim.layout().plot_count(), 1);
        assert_eq!(sim.controls().len(), 1);

        let slider = &sim.controls()[0];
        assert_eq!(slider.value, 0.5);
        assert_eq!(slider.start, 0.0);
        assert_eq!(slider.end, 1.0);
        assert_eq!(slider.step, 0.1);
        assert_eq!(slider.title, "Slope");
    }

    #[test]
    fn test_handle_map_and_bindings() {
        let sim = build_simulation(&slope_graph()).unwrap();
        let handle = sim.handle("k").unwrap();
        assert_eq!(sim.control(handle).unwrap().name, "k");

        let rule = &sim.rules()[0];
        assert_eq!(rule.args.get("k"), Some(&Binding::Control(handle)));
        assert_eq!(rule.args.get("source"), Some(&Binding::Source));
    }

    #[test]
    fn test_every_control_listens_on_the_same_rule() {
        let mut gd = slope_graph();
        gd.variables
            .push(VariableDescription::new("offset", "Offset", -1.0, 1.0, 0.1, 0.0));
        gd.rule = UpdateRule::expr("k * x + offset").unwrap();
        let sim = build_simulation(&gd).unwrap();

        assert_eq!(sim.rules().len(), 1);
        for slider in sim.controls() {
            assert_eq!(slider.listeners, vec![RuleId(0)]);
        }
    }

    #[test]
    fn test_plot_from_description() {
        let sim = build_simulation(&slope_graph()).unwrap();
        let plot = sim.plot();
        assert_eq!(plot.title, "Slope");
        assert_eq!((plot.width, plot.height), (600, 400));
        assert_eq!(plot.tools, "pan,wheel_zoom");
        assert_eq!(plot.line.line_width, 3.0);
        assert_eq!(sim.source().data(), &slope_graph().initial);
        assert_eq!(sim.source().revision(), 0);
    }

    #[test]
    fn test_curve_updates_on_value_change() {
        let mut sim = build_simulation(&slope_graph()).unwrap();
        let handle = sim.handle("k").unwrap();

        let redraw = sim.set_value(handle, 0.8).unwrap();
        assert_eq!(redraw, Redraw::Recomputed { revision: 1 });

        let y = &sim.source().data().y;
        assert!((y[1] - 0.8).abs() < 1e-12);
        assert!((y[2] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_values_snap_and_clamp() {
        let mut sim = build_simulation(&slope_graph()).unwrap();
        sim.set_by_name("k", 0.73).unwrap();
        assert!((sim.values()["k"] - 0.7).abs() < 1e-12);

        sim.set_by_name("k", 7.0).unwrap();
        assert_eq!(sim.values()["k"], 1.0);

        sim.set_by_name("k", -3.0).unwrap();
        assert_eq!(sim.values()["k"], 0.0);
    }

    #[test]
    fn test_invalid_changes_rejected() {
        let mut sim = build_simulation(&slope_graph()).unwrap();
        assert!(matches!(
            sim.set_by_name("nope", 0.5),
            Err(SimulationError::UnknownControl(_))
        ));
        assert!(matches!(
            sim.set_by_name("k", f64::NAN),
            Err(SimulationError::NonFiniteValue(_))
        ));
        assert!(matches!(
            sim.set_value(ControlHandle(9), 0.5),
            Err(SimulationError::InvalidHandle(9))
        ));
    }

    #[test]
    fn test_script_rule_is_deferred() {
        let mut gd = slope_graph();
        gd.rule = UpdateRule::script("var y = source.data['y']; y[0] = k.value; source.change.emit();");
        let mut sim = build_simulation(&gd).unwrap();

        let redraw = sim.set_by_name("k", 0.2).unwrap();
        assert_eq!(redraw, Redraw::Deferred);
        assert_eq!(sim.source().data(), &gd.initial);
    }

    #[test]
    fn test_invalid_description_rejected() {
        let mut gd = slope_graph();
        gd.variables[0].init = 2.0;
        assert!(build_simulation(&gd).is_err());
    }

    #[test]
    fn test_bound_constraint_pulls_control_down() {
        let mut gd = slope_graph();
        gd.variables = vec![
            VariableDescription::new("a", "A", 1.0, 10.0, 0.1, 1.0),
            VariableDescription::new("b", "B", 1.0, 10.0, 0.1, 10.0),
        ];
        gd.rule = UpdateRule::expr("a * b * x").unwrap();
        gd.constraints.push(BoundConstraint::new("a", "b"));
        let mut sim = build_simulation(&gd).unwrap();

        sim.set_by_name("a", 6.0).unwrap();
        sim.set_by_name("b", 4.0).unwrap();

        let a = sim.control(sim.handle("a").unwrap()).unwrap();
        assert!((a.value - 3.9).abs() < 1e-9);
        assert!((a.end - 3.9).abs() < 1e-9);
    }
}
