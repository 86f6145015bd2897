//! Deterministic keyword heuristics for routing
//!
//! Fallback path when the classifier output cannot be parsed or the
//! generation backend is down, and the detector for small-talk queries that
//! need no specialist at all. Static lists keep the fallback fully
//! deterministic and testable.

use crate::category::Category;
use std::collections::HashMap;

/// Expertise keywords per category
pub fn category_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Program => &[
            "course", "courses", "class", "classes", "curriculum", "degree",
            "certificate", "prerequisite", "prerequisites", "credits",
            "training", "pathway", "program", "programs", "major",
        ],
        Category::Admissions => &[
            "admission", "admissions", "apply", "application", "enroll",
            "enrollment", "requirements", "deadline", "placement test",
            "acceptance", "registration", "qualify", "eligibility",
        ],
        Category::Financial => &[
            "cost", "costs", "tuition", "fees", "price", "financial aid",
            "scholarship", "scholarships", "grant", "loan", "fafsa",
            "payment", "afford", "expensive", "funding", "money",
        ],
    }
}

/// Phrases that mark a query as small talk rather than a domain question
const SMALLTALK_PHRASES: &[&str] = &[
    "hello", "hi ", "hey", "greetings", "thank", "thanks",
    "who are you", "what are you", "what can you do", "can you help",
    "help me", "assist",
];

/// Score each category by keyword hits
///
/// Any hit clears the default 0.5 selection threshold; additional hits rank
/// the category higher. Scores are deterministic for identical input.
pub fn keyword_scores(query: &str) -> HashMap<Category, f64> {
    let query_lower = query.to_lowercase();
    let mut scores = HashMap::new();

    for category in Category::ALL {
        let hits = category_keywords(category)
            .iter()
            .filter(|kw| query_lower.contains(*kw))
            .count();

        let score = if hits == 0 {
            0.0
        } else {
            (0.4 + 0.2 * hits as f64).min(1.0)
        };
        scores.insert(category, score);
    }

    scores
}

/// True when the query is a greeting or generic help request with no
/// domain-keyword hits
pub fn is_smalltalk(query: &str) -> bool {
    let query_lower = query.to_lowercase();

    let has_domain_hit = Category::ALL.iter().any(|cat| {
        category_keywords(*cat)
            .iter()
            .any(|kw| query_lower.contains(kw))
    });
    if has_domain_hit {
        return false;
    }

    SMALLTALK_PHRASES
        .iter()
        .any(|phrase| query_lower.contains(phrase))
}
