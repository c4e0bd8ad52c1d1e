//! Page rendering - standalone HTML for simulations and quiz fragments

use rust_embed::Embed;
use serde::Serialize;
use std::collections::BTreeMap;
use tera::{Context, Tera};
use thiserror::Error;

use crate::core::graph::{BoundConstraint, Series};
use crate::core::quiz::{QuizWidget, CORRECT_FEEDBACK, INCORRECT_FEEDBACK};
use crate::core::rule::UpdateRule;
use crate::core::simulation::{Binding, PlotSurface, ReactiveRule, Simulation};
use crate::core::variable::{JS_LOCAL_PREFIX, SOURCE_IDENT};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const SIMULATION_TEMPLATE: &str = "simulation.html.tera";
const QUIZ_TEMPLATE: &str = "quiz.html.tera";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

/// Renders simulations and quizzes through the embedded templates
pub struct PageRenderer {
    tera: Tera,
}

/// Slider state as the page script sees it
#[derive(Serialize)]
struct SliderModel<'a> {
    name: &'a str,
    title: &'a str,
    start: f64,
    end: f64,
    step: f64,
    value: f64,
}

/// Everything the simulation page script needs, serialized into the page
#[derive(Serialize)]
struct PageModel<'a> {
    sliders: Vec<SliderModel<'a>>,
    source: &'a Series,
    plot: &'a PlotSurface,
    /// Argument names in the order the compiled rule takes them
    args: Vec<&'a str>,
    code: String,
}

impl PageRenderer {
    /// Create a renderer with the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| TemplateError::RenderError(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    /// A self-contained page: the plot, one range input per slider and the
    /// rule wired to every input
    pub fn render_simulation(&self, sim: &Simulation) -> Result<String, TemplateError> {
        let rule = sim.rules().first();
        let args = rule
            .map(|r| r.args.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let code = rule.map(compile_rule_js).unwrap_or_default();

        let model = PageModel {
            sliders: sim
                .controls()
                .iter()
                .map(|s| SliderModel {
                    name: &s.name,
                    title: &s.title,
                    start: s.start,
                    end: s.end,
                    step: s.step,
                    value: s.value,
                })
                .collect(),
            source: sim.source().data(),
            plot: sim.plot(),
            args,
            code,
        };

        let mut context = Context::new();
        context.insert("title", &sim.plot().title);
        context.insert("width", &sim.plot().width);
        context.insert("height", &sim.plot().height);
        context.insert("model", &script_json(&model)?);

        self.render(SIMULATION_TEMPLATE, &context)
    }

    /// An HTML fragment: the question heading and its buttons in display order.
    /// The first click removes both and shows the feedback.
    pub fn render_quiz(&self, widget: &QuizWidget, id: &str) -> Result<String, TemplateError> {
        let correct_index = widget.buttons().iter().position(|b| b == widget.correct());

        let mut context = Context::new();
        context.insert("id", &dom_id(id));
        context.insert("question", widget.question());
        context.insert("buttons", widget.buttons());
        context.insert("correct_index", &correct_index);
        context.insert(
            "feedback",
            &script_json(&[CORRECT_FEEDBACK, INCORRECT_FEEDBACK])?,
        );

        self.render(QUIZ_TEMPLATE, &context)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}

/// JavaScript body of the reactive rule.
///
/// Expression rules become a loop over the buffer followed by the change
/// emit; script rules are passed through untouched. Bound constraints run
/// first in both cases.
pub fn compile_rule_js(rule: &ReactiveRule) -> String {
    let mut code = String::new();

    for constraint in &rule.constraints {
        if is_bound(rule, constraint) {
            code.push_str(&constraint_js(constraint));
        }
    }

    match &rule.body {
        UpdateRule::Expr(formula) => {
            let p = JS_LOCAL_PREFIX;
            code.push_str(&format!(
                "var {p}x = {src}.data['x'];\n\
                 var {p}y = {src}.data['y'];\n\
                 for (var {p}i = 0; {p}i < {p}x.length; {p}i++) {{\n    \
                 {p}y[{p}i] = {expr};\n\
                 }}\n\
                 {src}.change.emit();\n",
                src = SOURCE_IDENT,
                expr = formula.expr().to_js(&format!("{p}x[{p}i]")),
            ));
        }
        UpdateRule::Script(script) => code.push_str(script),
    }

    code
}

fn is_bound(rule: &ReactiveRule, constraint: &BoundConstraint) -> bool {
    let is_control = |name: &str| matches!(rule.args.get(name), Some(Binding::Control(_)));
    is_control(&constraint.control) && is_control(&constraint.below)
}

fn constraint_js(c: &BoundConstraint) -> String {
    format!(
        "{ctl}.end = {below}.value - {below}.step;\n\
         if ({ctl}.value > {ctl}.end + {ctl}.step * 1e-2) {{ {ctl}.value = {ctl}.end; }}\n",
        ctl = c.control,
        below = c.below,
    )
}

/// JSON that can sit inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> Result<String, TemplateError> {
    let json = serde_json::to_string(value).map_err(|e| TemplateError::RenderError(e.to_string()))?;
    Ok(json.replace("</", "<\\/"))
}

/// Question ids may hold characters that are awkward in element ids
fn dom_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("heatlab-quiz-{}", cleaned)
}

/// Argument name to binding kind, for the page listing
pub fn binding_summary(rule: &ReactiveRule) -> BTreeMap<&str, &'static str> {
    rule.args
        .iter()
        .map(|(name, binding)| {
            let kind = match binding {
                Binding::Control(_) => "slider",
                Binding::Source => "data",
            };
            (name.as_str(), kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::tests::slope_graph;
    use crate::core::quiz::{KeepOrder, QuestionRecord};
    use crate::core::simulation::build_simulation;
    use crate::core::surface::RecordingSurface;
    use crate::core::variable::VariableDescription;
    use crate::lessons::heat_flux_lesson;

    #[test]
    fn test_renderer_loads_templates() {
        let renderer = PageRenderer::new().unwrap();
        let names: Vec<_> = renderer.tera.get_template_names().collect();
        assert!(names.contains(&SIMULATION_TEMPLATE));
        assert!(names.contains(&QUIZ_TEMPLATE));
    }

    #[test]
    fn test_expression_rule_compiles_to_loop() {
        let sim = build_simulation(&slope_graph()).unwrap();
        let code = compile_rule_js(&sim.rules()[0]);
        assert!(code.contains("for (var __hl_i = 0; __hl_i < __hl_x.length; __hl_i++)"));
        assert!(code.contains("__hl_y[__hl_i] = (k.value * __hl_x[__hl_i]);"));
        assert!(code.trim_end().ends_with("source.change.emit();"));
    }

    #[test]
    fn test_slider_named_like_loop_locals() {
        let mut gd = slope_graph();
        gd.variables = vec![
            VariableDescription::new("y", "Slope", 0.0, 1.0, 0.1, 0.5),
            VariableDescription::new("i", "Offset", 0.0, 1.0, 0.1, 0.0),
        ];
        gd.rule = UpdateRule::expr("y * x + i").unwrap();
        assert!(gd.validate().unwrap().is_empty());

        let mut sim = build_simulation(&gd).unwrap();
        sim.set_by_name("y", 0.8).unwrap();
        let native = &sim.source().data().y;
        assert!((native[1] - 0.8).abs() < 1e-12);
        assert!((native[2] - 1.6).abs() < 1e-12);

        let code = compile_rule_js(&sim.rules()[0]);
        assert!(code.contains("__hl_y[__hl_i] = ((y.value * __hl_x[__hl_i]) + i.value);"));
        for line in code.lines() {
            assert!(!line.contains("var y ") && !line.contains("var i "), "{}", line);
            assert!(!line.contains("var x "), "{}", line);
        }
    }

    #[test]
    fn test_script_rule_passes_through() {
        let mut gd = slope_graph();
        let script = "var y = source.data['y']; y[0] = k.value; source.change.emit();";
        gd.rule = UpdateRule::script(script);
        let sim = build_simulation(&gd).unwrap();
        assert_eq!(compile_rule_js(&sim.rules()[0]), script);
    }

    #[test]
    fn test_constraint_precedes_update() {
        let sim = build_simulation(&heat_flux_lesson().unwrap()).unwrap();
        let code = compile_rule_js(&sim.rules()[0]);
        let constraint = code.find("area1.end = area2.value - area2.step;").unwrap();
        let update = code.find("for (var __hl_i").unwrap();
        assert!(constraint < update);
    }

    #[test]
    fn test_simulation_page() {
        let renderer = PageRenderer::new().unwrap();
        let sim = build_simulation(&heat_flux_lesson().unwrap()).unwrap();
        let html = renderer.render_simulation(&sim).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Heat flux value graph</title>"));
        assert!(html.contains("\"name\":\"temperature1\""));
        assert!(html.contains("\"args\":[\"area1\",\"area2\",\"emissivity1\",\"source\",\"temperature1\",\"temperature2\"]"));
        assert!(html.contains("new Function"));
    }

    #[test]
    fn test_page_escapes_markup_in_title() {
        let renderer = PageRenderer::new().unwrap();
        let mut gd = slope_graph();
        gd.title = "</script><b>x</b>".to_string();
        let sim = build_simulation(&gd).unwrap();
        let html = renderer.render_simulation(&sim).unwrap();

        assert!(!html.contains("</script><b>"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_quiz_fragment() {
        let renderer = PageRenderer::new().unwrap();
        let record = QuestionRecord::new("view-factor-12", "F12?", &["0.5", "1", "<2>"], "1");
        let widget = QuizWidget::ask(&record, &mut KeepOrder, &mut RecordingSurface::new());
        let html = renderer.render_quiz(&widget, &record.id).unwrap();

        assert!(html.contains("id=\"heatlab-quiz-view-factor-12\""));
        assert!(html.contains("F12?"));
        assert!(html.contains("&lt;2&gt;"));
        assert!(html.contains("data-correct=\"1\""));
        assert!(html.contains(CORRECT_FEEDBACK));
        assert!(html.contains(INCORRECT_FEEDBACK));
    }

    #[test]
    fn test_binding_summary() {
        let sim = build_simulation(&slope_graph()).unwrap();
        let summary = binding_summary(&sim.rules()[0]);
        assert_eq!(summary.get("k"), Some(&"slider"));
        assert_eq!(summary.get("source"), Some(&"data"));
    }

    #[test]
    fn test_dom_id() {
        assert_eq!(dom_id("a b/c"), "heatlab-quiz-a-b-c");
    }
}
