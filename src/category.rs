//! The closed set of specialist categories
//!
//! Every routing decision targets a subset of these three. Adding a category
//! is a deliberate code change: the variant, its keywords, its role
//! instructions, and the orchestrator wiring all live in source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Specialist domains, in fixed priority order
///
/// The declaration order doubles as the tie-break priority: Program beats
/// Admissions beats Financial whenever confidences are equal, and synthesis
/// segments always render in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Programs, courses, curriculum
    Program,

    /// Applications, enrollment, requirements
    Admissions,

    /// Tuition, aid, scholarships
    Financial,
}

impl Category {
    /// All categories in priority order
    pub const ALL: [Category; 3] = [Category::Program, Category::Admissions, Category::Financial];

    /// Tie-break priority (lower wins)
    pub fn priority(&self) -> usize {
        match self {
            Category::Program => 0,
            Category::Admissions => 1,
            Category::Financial => 2,
        }
    }

    /// Short identifier used in classifier output and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Program => "program",
            Category::Admissions => "admissions",
            Category::Financial => "financial",
        }
    }

    /// Display label used in synthesized multi-segment answers
    pub fn label(&self) -> &'static str {
        match self {
            Category::Program => "Program Advisor",
            Category::Admissions => "Admissions Advisor",
            Category::Financial => "Financial Aid Advisor",
        }
    }

    /// Parse a classifier-emitted identifier
    pub fn parse(s: &str) -> Option<Category> {
        match s.trim().to_lowercase().as_str() {
            "program" => Some(Category::Program),
            "admissions" => Some(Category::Admissions),
            "financial" => Some(Category::Financial),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
