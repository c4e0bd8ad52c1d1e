//! Core module - plot descriptions, simulations, quizzes and answer checks

pub mod bank;
pub mod checker;
pub mod config;
pub mod expr;
pub mod graph;
pub mod quiz;
pub mod rule;
pub mod simulation;
pub mod surface;
pub mod variable;

pub use bank::{BankError, QuestionBank};
pub use checker::{check_answer, Exercise, Verdict};
pub use config::Config;
pub use expr::{Expr, ExprError};
pub use graph::{AxisRange, BoundConstraint, GraphDescription, GraphError, Series};
pub use quiz::{Outcome, QuestionRecord, QuizWidget, Shuffler};
pub use rule::{Formula, UpdateRule};
pub use simulation::{build_simulation, ControlHandle, Redraw, Simulation, SimulationError};
pub use surface::{RecordingSurface, Surface, SurfaceEvent, TerminalSurface};
pub use variable::VariableDescription;
