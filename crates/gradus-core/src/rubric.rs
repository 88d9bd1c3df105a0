//! Rubric validation and the built-in default rubric.
//!
//! The rubric is opaque to the pipeline: it is forwarded verbatim to the
//! LLM. The only thing checked here is the structural invariant that it
//! contains at least one top-level criterion heading (a markdown H2).

use std::sync::OnceLock;

use regex::Regex;

use crate::error::GradusError;

/// The rubric shipped with the CLI, used when no rubric file is supplied.
///
/// Targets a third-year machine-learning project built with the Kedro
/// framework; ten criteria, each worth 10% of the total grade.
pub const DEFAULT_RUBRIC: &str = r#"You will evaluate a student's Machine Learning project built with the Kedro framework.
The evaluation has 10 criteria, each worth 10% of the total grade.
For each criterion, provide a percentage score and detailed feedback.

## 1. Project Structure and Kedro Configuration (10%)
*   100%: Perfectly structured Kedro project, complete configuration in `conf/`, detailed README, clear modular structure.
*   80%: Well-structured project, functional configuration, adequate documentation.
*   60%: Basic functional structure, minimal operative configuration.
*   40%: Errors in structure, incomplete configuration.
*   20%: Does not use Kedro or has an incorrect structure.

## 2. Data Catalog Implementation (10%)
*   100%: 3+ datasets correctly configured, multiple formats (CSV, Excel, Parquet), parametrization, versioning.
*   80%: 3 datasets well-configured in appropriate formats.
*   60%: 3 basic functional datasets.
*   40%: Fewer than 3 datasets or significant errors.
*   20%: No catalog or misconfigured.

## 3. Node and Function Development (10%)
*   100%: Highly modular nodes, pure functions, complete docstrings, error handling, SOLID principles.
*   80%: Well-structured nodes, good documentation.
*   60%: Functional nodes with basic modularity.
*   40%: Low modularity, coupled functions.
*   20%: No nodes or poorly structured.

## 4. Pipeline Construction (10%)
*   100%: Pipelines organized by CRISP-DM phase, use of namespaces, clear dependencies, composable.
*   80%: Functional, well-connected pipelines.
*   60%: Basic operative pipelines.
*   40%: Problems in dependencies or structure.
*   20%: No pipelines or incorrect.

## 5. Exploratory Data Analysis (10%)
*   100%: Exhaustive EDA (univariate, bivariate, multivariate), interactive visualizations, pattern analysis on 3+ datasets.
*   80%: Complete EDA with good analysis and visualizations.
*   60%: Basic EDA with descriptive statistics.
*   40%: Superficial or incomplete EDA.
*   20%: No EDA or extremely basic.

## 6. Data Cleaning and Processing (10%)
*   100%: Differentiated strategies by variable type, sophisticated handling of outliers and missing values, integrity validation.
*   80%: Good treatment with justified strategies.
*   60%: Basic cleaning implemented.
*   40%: Superficial cleaning or with errors.
*   20%: No cleaning or poorly implemented.

## 7. Transformation and Feature Engineering (10%)
*   100%: Advanced, justified transformations, creative feature engineering, parametrizable pipelines.
*   80%: Good transformations (scaling, encoding), derived features.
*   60%: Basic transformations (normalization/standardization).
*   40%: Limited or misapplied transformations.
*   20%: No necessary transformations performed.

## 8. ML Target Identification (10%)
*   100%: Multiple correct targets for regression and classification, solid business-based justification, viability analysis.
*   80%: Main targets correct with good justification.
*   60%: Basic targets correct.
*   40%: Confused or partially incorrect identification.
*   20%: No identification or completely misdefined.

## 9. Documentation and Notebooks (10%)
*   100%: Exceptional documentation, notebooks structured by CRISP-DM, detailed markdown, docstrings, complete README.
*   80%: Good documentation, clear notebooks, commented code.
*   60%: Basic documentation, functional notebooks.
*   40%: Scarce or confusing documentation.
*   20%: No documentation.

## 10. Reproducibility and Best Practices (10%)
*   100%: Completely reproducible, `requirements.txt`, `parameters.yml`, logging, tests, PEP8, `.env` for credentials kept out of version control.
*   80%: Reproducible with good practices implemented.
*   60%: Basically reproducible, some good practices.
*   40%: Reproducibility problems.
*   20%: Not reproducible.
"#;

fn criterion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^##\s+(.+?)\s*$").expect("criterion heading regex"))
}

/// Extract the criterion titles from a markdown rubric.
///
/// Criteria are H2 headings; the leading `## ` is stripped.
///
/// # Examples
///
/// ```
/// use gradus_core::rubric::criteria;
///
/// let rubric = "## 1. Structure (50%)\ndetails\n## 2. Tests (50%)\n";
/// assert_eq!(criteria(rubric), vec!["1. Structure (50%)", "2. Tests (50%)"]);
/// ```
pub fn criteria(rubric: &str) -> Vec<String> {
    criterion_re()
        .captures_iter(rubric)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Check the rubric's structural invariant.
///
/// # Errors
///
/// Returns [`GradusError::Rubric`] when no criterion heading is found.
///
/// # Examples
///
/// ```
/// use gradus_core::rubric::validate;
///
/// assert!(validate("## 1. Correctness (100%)").is_ok());
/// assert!(validate("just prose, no headings").is_err());
/// ```
pub fn validate(rubric: &str) -> Result<(), GradusError> {
    if criteria(rubric).is_empty() {
        return Err(GradusError::Rubric(
            "no criterion headings found; each criterion must start with '## ' (e.g. '## 1. Correctness (25%)')"
                .into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rubric_passes_its_own_validation() {
        validate(DEFAULT_RUBRIC).unwrap();
        assert_eq!(criteria(DEFAULT_RUBRIC).len(), 10);
    }

    #[test]
    fn criteria_strips_heading_marker() {
        let found = criteria("## 1. Project Structure (10%)\nbody\n");
        assert_eq!(found, vec!["1. Project Structure (10%)"]);
    }

    #[test]
    fn deeper_headings_are_not_criteria() {
        let rubric = "### not a criterion\n#### nor this\n";
        assert!(criteria(rubric).is_empty());
        assert!(validate(rubric).is_err());
    }

    #[test]
    fn empty_rubric_is_rejected() {
        let err = validate("").unwrap_err();
        assert!(err.to_string().contains("criterion"));
    }
}
