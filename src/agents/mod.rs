//! Specialist agents
//!
//! One agent per category, identical execution shape: retrieve passages,
//! optionally call the category's lookup tool, generate an answer, extract
//! any new student context. Every failure mode degrades or retries; an
//! agent never raises out of `respond`, it returns an unsuccessful result
//! so the orchestrator can keep the turn alive.

use crate::category::Category;
use crate::generation::GenerationPort;
use crate::retrieval::{format_passages, Passage, RetrievalPort};
use crate::tools::{course_code_pattern, format_records, CourseRecord, ToolPort};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Answer text used when both generation attempts fail
pub const UNAVAILABLE_ANSWER: &str =
    "I'm sorry, this advisor is temporarily unavailable. Please try again in a moment.";

/// Program keywords that trigger a field lookup and imply a stated major
const PROGRAM_FIELDS: &[&str] = &[
    "nursing", "carpentry", "welding", "dental", "healthcare", "medical",
    "construction", "automotive", "culinary",
];

/// Academic standing keywords
const STANDING_TERMS: &[&str] = &[
    "freshman", "sophomore", "junior", "senior", "first year", "second year",
];

/// Per-category prompt persona
#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    pub category: Category,
    pub role_instructions: &'static str,
}

/// Fixed profile for each category
pub fn profile_for(category: Category) -> AgentProfile {
    let role_instructions = match category {
        Category::Program => {
            "You are the Program Advisor for the college, specializing in programs, \
             courses, and curriculum planning. Answer using the catalog passages \
             provided: course codes, credits, prerequisites, and program pathways. \
             Never mention internal tools or retrieval systems."
        }
        Category::Admissions => {
            "You are the Admissions Advisor for the college, specializing in \
             applications, enrollment steps, requirements, and deadlines. Answer \
             using the catalog passages provided, step by step where helpful. \
             Never mention internal tools or retrieval systems."
        }
        Category::Financial => {
            "You are the Financial Aid Advisor for the college, specializing in \
             tuition, fees, financial aid, scholarships, and payment plans. Answer \
             using the catalog passages provided and be sensitive about financial \
             concerns. Never mention internal tools or retrieval systems."
        }
    };

    AgentProfile {
        category,
        role_instructions,
    }
}

/// Read-only session snapshot handed to each agent for one turn
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub context_summary: String,
    pub recent_history: String,
}

/// Result of one specialist invocation for one turn
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub category: Category,
    pub answer: String,
    /// Passage source locators that backed the answer
    pub sources: Vec<String>,
    pub success: bool,
    pub timed_out: bool,
    pub latency_ms: u64,
    /// New context attributes this turn implied
    pub extracted_context: BTreeMap<String, String>,
}

impl AgentResult {
    /// Result for an agent whose task exceeded its deadline
    pub fn timed_out(category: Category, latency_ms: u64) -> Self {
        Self {
            category,
            answer: UNAVAILABLE_ANSWER.to_string(),
            sources: Vec::new(),
            success: false,
            timed_out: true,
            latency_ms,
            extracted_context: BTreeMap::new(),
        }
    }

    /// Result for an agent that failed outright (double generation
    /// failure, or a panicked dispatch task)
    pub fn failed(category: Category, latency_ms: u64) -> Self {
        Self {
            category,
            answer: UNAVAILABLE_ANSWER.to_string(),
            sources: Vec::new(),
            success: false,
            timed_out: false,
            latency_ms,
            extracted_context: BTreeMap::new(),
        }
    }
}

/// Execution settings shared by all agents
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Passages retrieved per query
    pub passage_budget: usize,
    /// Passages kept for the reduced-context retry
    pub reduced_passage_budget: usize,
    /// Token budget per generation call
    pub max_tokens: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            passage_budget: 4,
            reduced_passage_budget: 2,
            max_tokens: 1024,
        }
    }
}

/// A domain specialist: retrieval + optional tool call + generation
pub struct SpecialistAgent {
    profile: AgentProfile,
    retriever: Arc<dyn RetrievalPort>,
    generator: Arc<dyn GenerationPort>,
    tools: Arc<dyn ToolPort>,
    settings: AgentSettings,
}

impl SpecialistAgent {
    /// Create an agent for a category
    pub fn new(
        category: Category,
        retriever: Arc<dyn RetrievalPort>,
        generator: Arc<dyn GenerationPort>,
        tools: Arc<dyn ToolPort>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            profile: profile_for(category),
            retriever,
            generator,
            tools,
            settings,
        }
    }

    /// The agent's category
    pub fn category(&self) -> Category {
        self.profile.category
    }

    /// Answer a query for this category
    ///
    /// Never returns an error: retrieval and tool failures degrade the
    /// context, generation failures retry once with reduced context and
    /// then yield an unsuccessful result.
    pub async fn respond(&self, query: &str, view: &SessionView) -> AgentResult {
        let start = Instant::now();

        // Retrieval failure is a degraded context, not a failed turn
        let passages = self
            .retriever
            .search(query, self.settings.passage_budget)
            .await
            .unwrap_or_default();

        let tool_records = self.maybe_lookup(query).await;

        let prompt = self.build_prompt(query, view, &passages, &tool_records);
        let answer = match self.generator.generate(&prompt, self.settings.max_tokens).await {
            Ok(text) => text,
            Err(_) => {
                // Retry once with tool results dropped and fewer passages
                let reduced: Vec<Passage> = passages
                    .iter()
                    .take(self.settings.reduced_passage_budget)
                    .cloned()
                    .collect();
                let reduced_prompt = self.build_prompt(query, view, &reduced, &[]);
                match self
                    .generator
                    .generate(&reduced_prompt, self.settings.max_tokens)
                    .await
                {
                    Ok(text) => text,
                    Err(_) => {
                        return AgentResult::failed(
                            self.profile.category,
                            start.elapsed().as_millis() as u64,
                        );
                    }
                }
            }
        };

        let extracted_context = extract_context(query, &answer);
        let sources = passages.iter().map(|p| p.source.clone()).collect();

        AgentResult {
            category: self.profile.category,
            answer,
            sources,
            success: true,
            timed_out: false,
            latency_ms: start.elapsed().as_millis() as u64,
            extracted_context,
        }
    }

    /// Invoke the category's tool when the query matches a lookup pattern
    ///
    /// A course code triggers a code lookup for any category; a program
    /// field keyword additionally triggers a field lookup for the Program
    /// agent. Tool unavailability degrades to no records.
    async fn maybe_lookup(&self, query: &str) -> Vec<CourseRecord> {
        let mut records = Vec::new();

        let upper = query.to_uppercase();
        if let Some(caps) = course_code_pattern().captures(&upper) {
            let code = format!("{} {}", &caps[1], &caps[2]);
            if let Ok(Some(record)) = self.tools.lookup_by_code(&code).await {
                records.push(record);
            }
        }

        if self.profile.category == Category::Program {
            let query_lower = query.to_lowercase();
            if let Some(field) = PROGRAM_FIELDS
                .iter()
                .find(|f| query_lower.contains(*f))
            {
                if let Ok(found) = self.tools.lookup_by_field(field).await {
                    records.extend(found);
                }
            }
        }

        records
    }

    fn build_prompt(
        &self,
        query: &str,
        view: &SessionView,
        passages: &[Passage],
        tool_records: &[CourseRecord],
    ) -> String {
        let mut parts = vec![self.profile.role_instructions.to_string()];

        if !view.context_summary.is_empty() {
            parts.push(format!("Student Context:\n{}", view.context_summary));
        }
        if !view.recent_history.is_empty() {
            parts.push(format!("Recent Conversation:\n{}", view.recent_history));
        }

        parts.push(format!(
            "Relevant Information from the Catalog:\n{}",
            format_passages(passages)
        ));

        let tool_block = format_records(tool_records);
        if !tool_block.is_empty() {
            parts.push(tool_block);
        }

        parts.push(format!("Student Question: {}", query));
        parts.push("Provide a helpful, accurate answer based on the information above:".to_string());

        parts.join("\n\n")
    }
}

/// Extract context attributes implied by a query/answer pair
///
/// Program keyword -> `major`, standing keyword -> `year`,
/// "interested in <field>" -> `interests`. Deterministic: first match in
/// the static lists wins.
pub fn extract_context(query: &str, answer: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let combined = format!("{} {}", query.to_lowercase(), answer.to_lowercase());

    if let Some(field) = PROGRAM_FIELDS.iter().find(|f| combined.contains(*f)) {
        attrs.insert("major".to_string(), title_case(field));
    }

    if let Some(term) = STANDING_TERMS.iter().find(|t| combined.contains(*t)) {
        attrs.insert("year".to_string(), title_case(term));
    }

    if let Some(idx) = combined.find("interested in ") {
        let rest = &combined[idx + "interested in ".len()..];
        let interest: String = rest
            .split(|c: char| c == '.' || c == ',' || c == '?' || c == '!')
            .next()
            .unwrap_or("")
            .trim()
            .chars()
            .take(60)
            .collect();
        if !interest.is_empty() {
            attrs.insert("interests".to_string(), interest);
        }
    }

    attrs
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
