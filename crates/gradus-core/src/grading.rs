//! Deterministic score aggregation and grade mapping.
//!
//! The LLM's self-reported aggregate numbers are empirically unreliable, so
//! the pipeline never uses them: [`aggregate`] recomputes the overall score
//! as the arithmetic mean of the per-criterion scores and remaps it onto the
//! configured grade scale. Applying it twice yields the same numbers.

use crate::types::EvaluationResult;

/// Piecewise-linear mapping from a 0–100 score to a bounded grade scale.
///
/// Two segments: `(0, min_grade) → (pass_score, pass_grade)` below the pass
/// threshold, `(pass_score, pass_grade) → (100, max_grade)` at or above it.
/// Output is clamped to `[min_grade, max_grade]` and rounded to one decimal.
///
/// # Examples
///
/// ```
/// use gradus_core::GradingScale;
///
/// let scale = GradingScale::default();
/// assert_eq!(scale.grade_for(0.0), 1.0);
/// assert_eq!(scale.grade_for(60.0), 4.0);
/// assert_eq!(scale.grade_for(100.0), 7.0);
/// assert_eq!(scale.grade_for(80.0), 5.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingScale {
    /// Score at which `pass_grade` is reached.
    pub pass_score: f64,
    /// Grade at score 0.
    pub min_grade: f64,
    /// Grade at `pass_score`.
    pub pass_grade: f64,
    /// Grade at score 100.
    pub max_grade: f64,
}

impl Default for GradingScale {
    fn default() -> Self {
        Self {
            pass_score: 60.0,
            min_grade: 1.0,
            pass_grade: 4.0,
            max_grade: 7.0,
        }
    }
}

impl GradingScale {
    /// Map a 0–100 score onto this scale.
    ///
    /// Monotonically non-decreasing in `score`; the result always lies in
    /// `[min_grade, max_grade]`.
    pub fn grade_for(&self, score: f64) -> f64 {
        let score = score.clamp(0.0, 100.0);

        let grade = if score < self.pass_score {
            let slope = (self.pass_grade - self.min_grade) / self.pass_score;
            self.min_grade + slope * score
        } else {
            let slope = (self.max_grade - self.pass_grade) / (100.0 - self.pass_score);
            self.pass_grade + slope * (score - self.pass_score)
        };

        let clamped = grade.clamp(self.min_grade, self.max_grade);
        round_one_decimal(clamped)
    }
}

/// Recompute the derived fields of an evaluation result.
///
/// Sets `overall_score` to the arithmetic mean of `report[].score` (0.0 for
/// an empty report) and `final_grade` to the scale mapping of that mean,
/// discarding whatever values the LLM returned for either field.
///
/// # Examples
///
/// ```
/// use gradus_core::{aggregate, EvaluationItem, EvaluationResult, GradingScale};
///
/// let mut result = EvaluationResult {
///     overall_score: 99.0, // bogus model-reported value
///     summary: String::new(),
///     professionalism_summary: String::new(),
///     report: vec![
///         EvaluationItem { criterion: "a".into(), score: 100.0, feedback: String::new() },
///         EvaluationItem { criterion: "b".into(), score: 60.0, feedback: String::new() },
///         EvaluationItem { criterion: "c".into(), score: 80.0, feedback: String::new() },
///     ],
///     final_grade: 7.0, // bogus model-reported value
/// };
/// aggregate(&mut result, &GradingScale::default());
/// assert_eq!(result.overall_score, 80.0);
/// assert_eq!(result.final_grade, 5.5);
/// ```
pub fn aggregate(result: &mut EvaluationResult, scale: &GradingScale) {
    let overall = if result.report.is_empty() {
        0.0
    } else {
        let sum: f64 = result.report.iter().map(|item| item.score).sum();
        sum / result.report.len() as f64
    };

    result.overall_score = round_one_decimal(overall.clamp(0.0, 100.0));
    result.final_grade = scale.grade_for(result.overall_score);
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvaluationItem;

    fn report_with_scores(scores: &[f64]) -> EvaluationResult {
        EvaluationResult {
            overall_score: 0.0,
            summary: String::new(),
            professionalism_summary: String::new(),
            report: scores
                .iter()
                .enumerate()
                .map(|(i, &score)| EvaluationItem {
                    criterion: format!("criterion {i}"),
                    score,
                    feedback: String::new(),
                })
                .collect(),
            final_grade: 0.0,
        }
    }

    #[test]
    fn overall_is_mean_of_report_scores() {
        let mut result = report_with_scores(&[100.0, 60.0, 80.0]);
        aggregate(&mut result, &GradingScale::default());
        assert_eq!(result.overall_score, 80.0);
        assert_eq!(result.final_grade, 5.5);
    }

    #[test]
    fn aggregate_ignores_model_reported_values() {
        let mut result = report_with_scores(&[50.0, 50.0]);
        result.overall_score = 95.0;
        result.final_grade = 6.9;
        aggregate(&mut result, &GradingScale::default());
        assert_eq!(result.overall_score, 50.0);
        // 1.0 + (3.0 / 60.0) * 50.0 = 3.5
        assert_eq!(result.final_grade, 3.5);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let mut result = report_with_scores(&[73.0, 88.5, 42.0, 91.0]);
        let scale = GradingScale::default();
        aggregate(&mut result, &scale);
        let once = (result.overall_score, result.final_grade);
        aggregate(&mut result, &scale);
        assert_eq!((result.overall_score, result.final_grade), once);
    }

    #[test]
    fn grade_is_monotone_and_bounded() {
        let scale = GradingScale::default();
        let mut previous = scale.grade_for(0.0);
        for score in 0..=100 {
            let grade = scale.grade_for(score as f64);
            assert!(grade >= previous, "grade decreased at score {score}");
            assert!((scale.min_grade..=scale.max_grade).contains(&grade));
            previous = grade;
        }
    }

    #[test]
    fn grade_at_segment_boundaries() {
        let scale = GradingScale::default();
        assert_eq!(scale.grade_for(0.0), 1.0);
        assert_eq!(scale.grade_for(60.0), 4.0);
        assert_eq!(scale.grade_for(100.0), 7.0);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let scale = GradingScale::default();
        assert_eq!(scale.grade_for(-10.0), 1.0);
        assert_eq!(scale.grade_for(250.0), 7.0);
    }

    #[test]
    fn custom_scale_maps_pass_threshold() {
        let scale = GradingScale {
            pass_score: 50.0,
            min_grade: 1.0,
            pass_grade: 4.0,
            max_grade: 7.0,
        };
        assert_eq!(scale.grade_for(50.0), 4.0);
        // 4.0 + (3.0 / 50.0) * 25.0 = 5.5
        assert_eq!(scale.grade_for(75.0), 5.5);
    }

    #[test]
    fn empty_report_scores_zero() {
        let mut result = report_with_scores(&[]);
        aggregate(&mut result, &GradingScale::default());
        assert_eq!(result.overall_score, 0.0);
        assert_eq!(result.final_grade, 1.0);
    }
}
