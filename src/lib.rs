//! heatlab: interactive heat transfer lessons
//!
//! Declarative plot descriptions become slider-driven simulations, rendered
//! as standalone HTML pages or driven headlessly. Multiple-choice quizzes and
//! numeric answer checks complete the lesson toolkit.

pub mod cli;
pub mod core;
pub mod lessons;
pub mod schema;
