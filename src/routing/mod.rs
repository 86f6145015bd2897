//! Query router
//!
//! Classifies a student question into target specialist categories,
//! consulting the decision cache first. Classification is delegated to the
//! generation port; a malformed or failed classification falls back to the
//! deterministic keyword heuristic, so no query is ever left unrouted and
//! no routing error ever surfaces to the turn.

pub mod cache;
pub mod keywords;

pub use cache::RoutingCache;

use crate::category::Category;
use crate::errors::{AdvisorError, Result};
use crate::generation::GenerationPort;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Token budget for a classification call
const CLASSIFY_MAX_TOKENS: u32 = 128;

/// A routing decision, immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The normalized query this decision was computed for
    pub normalized_query: String,
    /// Target categories, non-empty, ordered by fixed priority
    pub targets: Vec<Category>,
    /// Per-category confidence scores
    pub confidences: HashMap<Category, f64>,
    /// Dispatch targets concurrently when set
    pub parallel: bool,
}

/// A routing decision plus where it came from
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    pub cache_hit: bool,
}

/// Normalize a query for cache keying: case-fold, trim, collapse whitespace
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Intent router over the fixed category set
pub struct Router {
    generator: Arc<dyn GenerationPort>,
    cache: RoutingCache,
    confidence_threshold: f64,
}

impl Router {
    /// Create a router
    pub fn new(
        generator: Arc<dyn GenerationPort>,
        confidence_threshold: f64,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            generator,
            cache: RoutingCache::new(cache_ttl, cache_capacity),
            confidence_threshold,
        }
    }

    /// Route a query to one or more target categories
    ///
    /// Never fails: classification errors fall back to keyword scores.
    pub async fn route(&self, query: &str, session_context: &str) -> RouteOutcome {
        let normalized = normalize_query(query);

        if let Some(decision) = self.cache.get(&normalized) {
            return RouteOutcome {
                decision,
                cache_hit: true,
            };
        }

        let confidences = match self.classify(query, session_context).await {
            Ok(scores) => scores,
            Err(_) => keywords::keyword_scores(query),
        };

        let targets = select_targets(&confidences, self.confidence_threshold);
        let parallel = targets.len() > 1;

        let decision = RoutingDecision {
            normalized_query: normalized.clone(),
            targets,
            confidences,
            parallel,
        };

        self.cache.insert(normalized, decision.clone());

        RouteOutcome {
            decision,
            cache_hit: false,
        }
    }

    /// Classify via the generation port
    async fn classify(&self, query: &str, session_context: &str) -> Result<HashMap<Category, f64>> {
        let prompt = classification_prompt(query, session_context);
        let output = self.generator.generate(&prompt, CLASSIFY_MAX_TOKENS).await?;
        parse_confidences(&output)
    }

    /// Access the cache (tests and diagnostics)
    pub fn cache(&self) -> &RoutingCache {
        &self.cache
    }
}

/// Build the classification prompt: query + fixed category set + few-shot
/// examples, requesting one confidence line per category
fn classification_prompt(query: &str, session_context: &str) -> String {
    format!(
        "You route student questions to specialist advisors.\n\
         Advisors:\n\
         - program: courses, programs, curriculum, degrees, certificates\n\
         - admissions: applications, enrollment, requirements, deadlines\n\
         - financial: tuition, costs, financial aid, scholarships, payments\n\n\
         Rate how relevant each advisor is to the question, 0.0 to 1.0.\n\
         Respond with exactly three lines, one per advisor:\n\
         program: <score>\n\
         admissions: <score>\n\
         financial: <score>\n\n\
         Examples:\n\
         Q: What courses are in the nursing program?\n\
         program: 0.9\n\
         admissions: 0.1\n\
         financial: 0.0\n\n\
         Q: How do I apply to the welding program and how much does it cost?\n\
         program: 0.3\n\
         admissions: 0.8\n\
         financial: 0.8\n\n\
         Q: What are the admission requirements for dental hygiene?\n\
         program: 0.2\n\
         admissions: 0.9\n\
         financial: 0.0\n\n\
         Student context: {}\n\
         Q: {}\n",
        session_context, query
    )
}

/// Parse classifier output into per-category confidences
///
/// Expects `category: score` lines; anything else is a parse failure the
/// caller recovers from with the keyword heuristic.
pub fn parse_confidences(output: &str) -> Result<HashMap<Category, f64>> {
    let mut confidences = HashMap::new();

    for line in output.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let Some(category) = Category::parse(name) else {
            continue;
        };
        let Ok(score) = value.trim().parse::<f64>() else {
            continue;
        };
        confidences.insert(category, score.clamp(0.0, 1.0));
    }

    if confidences.is_empty() {
        return Err(AdvisorError::ClassificationParse(format!(
            "no category scores in output: {:?}",
            output.chars().take(120).collect::<String>()
        )));
    }

    Ok(confidences)
}

/// Select target categories from confidences
///
/// All categories above the threshold, in fixed priority order; if none
/// clear it, the single highest-confidence category. Equal confidences
/// break ties by priority order, so the result is never empty and always
/// deterministic.
pub fn select_targets(confidences: &HashMap<Category, f64>, threshold: f64) -> Vec<Category> {
    let above: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|cat| confidences.get(cat).copied().unwrap_or(0.0) > threshold)
        .collect();

    if !above.is_empty() {
        return above;
    }

    let mut best = Category::Program;
    let mut best_score = confidences.get(&best).copied().unwrap_or(0.0);
    for cat in [Category::Admissions, Category::Financial] {
        let score = confidences.get(&cat).copied().unwrap_or(0.0);
        if score > best_score {
            best = cat;
            best_score = score;
        }
    }

    vec![best]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedGenerator {
        output: String,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(output: &str) -> Self {
            Self {
                output: output.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationPort for ScriptedGenerator {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl GenerationPort for FailingGenerator {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
            Err(AdvisorError::GenerationError("backend down".to_string()))
        }
    }

    fn router(generator: Arc<dyn GenerationPort>) -> Router {
        Router::new(generator, 0.5, Duration::from_secs(60), 100)
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(
            normalize_query("  What   Courses\tARE there? "),
            "what courses are there?"
        );
    }

    #[test]
    fn test_parse_confidences_valid() {
        let scores =
            parse_confidences("program: 0.9\nadmissions: 0.2\nfinancial: 0.0").unwrap();
        assert_eq!(scores[&Category::Program], 0.9);
        assert_eq!(scores[&Category::Financial], 0.0);
    }

    #[test]
    fn test_parse_confidences_tolerates_noise() {
        let scores = parse_confidences(
            "Here are my scores:\nprogram: 0.7\nunknown: 0.3\nfinancial: 1.5",
        )
        .unwrap();
        assert_eq!(scores[&Category::Program], 0.7);
        // Out-of-range scores clamp
        assert_eq!(scores[&Category::Financial], 1.0);
        assert!(!scores.contains_key(&Category::Admissions));
    }

    #[test]
    fn test_parse_confidences_rejects_garbage() {
        let err = parse_confidences("I think the program advisor should take this").unwrap_err();
        assert!(matches!(err, AdvisorError::ClassificationParse(_)));
    }

    #[test]
    fn test_select_above_threshold_in_priority_order() {
        let mut confidences = HashMap::new();
        confidences.insert(Category::Financial, 0.8);
        confidences.insert(Category::Program, 0.7);
        confidences.insert(Category::Admissions, 0.1);

        let targets = select_targets(&confidences, 0.5);
        assert_eq!(targets, vec![Category::Program, Category::Financial]);
    }

    #[test]
    fn test_select_falls_back_to_highest() {
        let mut confidences = HashMap::new();
        confidences.insert(Category::Admissions, 0.4);
        confidences.insert(Category::Program, 0.2);

        let targets = select_targets(&confidences, 0.5);
        assert_eq!(targets, vec![Category::Admissions]);
    }

    #[test]
    fn test_select_tie_break_by_priority() {
        let mut confidences = HashMap::new();
        confidences.insert(Category::Financial, 0.3);
        confidences.insert(Category::Admissions, 0.3);
        confidences.insert(Category::Program, 0.3);

        let targets = select_targets(&confidences, 0.5);
        assert_eq!(targets, vec![Category::Program]);
    }

    #[test]
    fn test_select_never_empty() {
        let targets = select_targets(&HashMap::new(), 0.5);
        assert_eq!(targets.len(), 1);
    }

    #[tokio::test]
    async fn test_route_caches_decision() {
        let generator = Arc::new(ScriptedGenerator::new(
            "program: 0.9\nadmissions: 0.0\nfinancial: 0.0",
        ));
        let router = router(generator.clone());

        let first = router.route("What courses exist?", "No prior context").await;
        assert!(!first.cache_hit);
        assert_eq!(generator.call_count(), 1);

        let second = router.route("what   COURSES exist?", "No prior context").await;
        assert!(second.cache_hit);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(second.decision.targets, first.decision.targets);
    }

    #[tokio::test]
    async fn test_route_falls_back_on_garbage_output() {
        let generator = Arc::new(ScriptedGenerator::new("I cannot classify this"));
        let router = router(generator);

        let outcome = router.route("how much is tuition?", "").await;
        assert_eq!(outcome.decision.targets, vec![Category::Financial]);
    }

    #[tokio::test]
    async fn test_route_falls_back_on_generator_failure() {
        let router = router(Arc::new(FailingGenerator));

        let outcome = router
            .route("How do I apply and what does it cost?", "")
            .await;
        assert_eq!(
            outcome.decision.targets,
            vec![Category::Admissions, Category::Financial]
        );
        assert!(outcome.decision.parallel);
    }

    #[tokio::test]
    async fn test_route_targets_never_empty() {
        let router = router(Arc::new(FailingGenerator));

        // No keyword hits either: falls through to highest-score tie-break
        let outcome = router.route("zzzz qqqq", "").await;
        assert!(!outcome.decision.targets.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_flag_set_for_multi_target() {
        let generator = Arc::new(ScriptedGenerator::new(
            "program: 0.8\nadmissions: 0.1\nfinancial: 0.9",
        ));
        let router = router(generator);

        let outcome = router
            .route("How much does the Welding program cost?", "")
            .await;
        assert_eq!(
            outcome.decision.targets,
            vec![Category::Program, Category::Financial]
        );
        assert!(outcome.decision.parallel);
    }
}
