//! Resolution problems, collected rather than raised.

use std::fmt;

use depot_core::module::ModuleId;
use depot_core::version::VersionRange;
use depot_util::errors::{DepotError, DepotResult};

/// A dependency the resolver could not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProblem {
    pub module_id: ModuleId,
    pub requested: VersionRange,
    pub reason: String,
}

impl ModuleProblem {
    pub fn new(module_id: ModuleId, requested: VersionRange, reason: impl Into<String>) -> Self {
        Self {
            module_id,
            requested,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModuleProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.module_id, self.requested, self.reason)
    }
}

/// Every problem met during one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    problems: Vec<ModuleProblem>,
    has_errors: bool,
}

impl ErrorReport {
    pub fn all_fine() -> Self {
        Self::default()
    }

    pub fn of(problems: Vec<ModuleProblem>) -> Self {
        let has_errors = !problems.is_empty();
        Self {
            problems,
            has_errors,
        }
    }

    pub fn add(&mut self, problem: ModuleProblem) {
        if !self.problems.contains(&problem) {
            self.problems.push(problem);
        }
        self.has_errors = true;
    }

    pub fn problems(&self) -> &[ModuleProblem] {
        &self.problems
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Problems of both reports; a coordinate reported twice is kept once.
    pub fn merge(&self, other: &ErrorReport) -> Self {
        let mut result = self.clone();
        for problem in &other.problems {
            result.add(problem.clone());
        }
        result.has_errors = self.has_errors || other.has_errors;
        result
    }

    /// Fails with a resolution error naming every missing coordinate.
    pub fn assert_no_error(&self) -> DepotResult<()> {
        if !self.has_errors {
            return Ok(());
        }
        Err(DepotError::Resolution {
            message: self.to_string(),
        }
        .into())
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_errors {
            return write!(f, "No error.");
        }
        write!(f, "Error with dependencies ({}):", self.problems.len())?;
        for problem in &self.problems {
            write!(f, "\n  {problem}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(module: &str, range: &str) -> ModuleProblem {
        ModuleProblem::new(
            ModuleId::parse(module).unwrap(),
            VersionRange::of(range).unwrap(),
            "not found",
        )
    }

    #[test]
    fn empty_report() {
        let report = ErrorReport::all_fine();
        assert!(!report.has_errors());
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No error.");
        assert!(report.assert_no_error().is_ok());
    }

    #[test]
    fn report_lists_every_problem() {
        let report = ErrorReport::of(vec![problem("org.example:lib", "1.0"), problem("org.other:x", "[1.0,2.0)")]);
        assert!(report.has_errors());
        assert_eq!(report.len(), 2);
        let s = report.to_string();
        assert!(s.starts_with("Error with dependencies (2):"));
        assert!(s.contains("org.example:lib:1.0 (not found)"));
        assert!(s.contains("org.other:x:[1.0,2.0)"));
    }

    #[test]
    fn merge_dedups() {
        let a = ErrorReport::of(vec![problem("g:a", "1.0")]);
        let b = ErrorReport::of(vec![problem("g:a", "1.0"), problem("g:b", "2.0")]);
        let merged = a.merge(&b);
        assert_eq!(merged.len(), 2);
        assert!(merged.has_errors());
        assert!(!ErrorReport::all_fine().merge(&ErrorReport::all_fine()).has_errors());
    }

    #[test]
    fn assert_names_missing_coordinates() {
        let err = ErrorReport::of(vec![problem("g:a", "1.0")]).assert_no_error().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Dependency resolution failed"));
        assert!(message.contains("g:a:1.0"));
    }
}
