//! Numeric answer checking

use serde::Serialize;

use crate::core::surface::Surface;

pub const PASS_MESSAGE: &str = "Hooray, you got it right!";
pub const FAIL_MESSAGE: &str = "Your solution is a bit too far from the right one, try again!";

/// Pass/fail result of a tolerance check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub expected: f64,
    pub got: f64,
    pub tolerance: f64,
    pub passed: bool,
}

impl Verdict {
    pub fn message(&self) -> &'static str {
        if self.passed {
            PASS_MESSAGE
        } else {
            FAIL_MESSAGE
        }
    }

    pub fn delta(&self) -> f64 {
        (self.got - self.expected).abs()
    }

    /// Print the verdict message
    pub fn report(&self, surface: &mut impl Surface) {
        surface.print(self.message());
    }
}

/// Pass iff `|got - expected| <= tolerance`. NaN never passes.
pub fn check_answer(expected: f64, got: f64, tolerance: f64) -> Verdict {
    Verdict {
        expected,
        got,
        tolerance,
        passed: (got - expected).abs() <= tolerance,
    }
}

/// A numeric exercise with its answer key
#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: &'static str,
    pub title: &'static str,
    pub expected: f64,
    pub tolerance: f64,
}

impl Exercise {
    pub fn check(&self, got: f64) -> Verdict {
        check_answer(self.expected, got, self.tolerance)
    }
}

const EXERCISES: &[Exercise] = &[
    Exercise {
        id: "q1",
        title: "Net radiative exchange from surface 1 to surface 2 [W]",
        expected: 184.6891736,
        tolerance: 0.001,
    },
    Exercise {
        id: "q2",
        title: "Net radiative exchange from surface 2 to surface 1 [W]",
        expected: -184.6891736,
        tolerance: 0.001,
    },
];

/// Every built-in exercise
pub fn exercises() -> &'static [Exercise] {
    EXERCISES
}

pub fn exercise(id: &str) -> Option<&'static Exercise> {
    EXERCISES.iter().find(|e| e.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::RecordingSurface;

    #[test]
    fn test_within_tolerance_passes() {
        let verdict = check_answer(184.6891736, 184.69, 0.001);
        assert!(verdict.passed);
        assert_eq!(verdict.message(), PASS_MESSAGE);
    }

    #[test]
    fn test_outside_tolerance_fails() {
        let verdict = check_answer(184.6891736, 184.0, 0.001);
        assert!(!verdict.passed);
        assert_eq!(verdict.message(), FAIL_MESSAGE);
    }

    #[test]
    fn test_nan_fails() {
        assert!(!check_answer(1.0, f64::NAN, 0.1).passed);
    }

    #[test]
    fn test_report_prints_once() {
        let mut surface = RecordingSurface::new();
        check_answer(1.0, 1.0, 0.0).report(&mut surface);
        assert_eq!(surface.texts(), vec![PASS_MESSAGE]);
    }

    #[test]
    fn test_exercise_registry() {
        let q1 = exercise("q1").unwrap();
        assert!(q1.check(184.689).passed);
        assert!(!q1.check(-184.689).passed);

        let q2 = exercise("Q2").unwrap();
        assert!(q2.check(-184.6895).passed);
        assert!(exercise("q3").is_none());
        assert_eq!(exercises().len(), 2);
    }
}
