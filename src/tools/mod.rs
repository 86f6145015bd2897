//! Tool ports
//!
//! Two capability-specific lookups over the ingested catalog: by course
//! code and by field keyword. Pure reads with no side effects; the only
//! failure mode is an unreachable backend (`ToolUnavailable`), which the
//! calling agent degrades around.

use crate::errors::{AdvisorError, Result};
use crate::retrieval::RetrievalPort;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A structured catalog record returned by tool lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course code, e.g. "WELD 101"
    pub code: String,
    /// Course or program title
    pub title: String,
    /// Surrounding catalog text
    pub description: String,
    /// Source locator
    pub source: String,
}

/// Tool port: structured catalog lookups
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// Look up a single course by its code
    async fn lookup_by_code(&self, code: &str) -> Result<Option<CourseRecord>>;

    /// Find programs/courses in a field of study
    async fn lookup_by_field(&self, keyword: &str) -> Result<Vec<CourseRecord>>;
}

/// Matches "WELD 101" style course codes inside free text
pub fn course_code_pattern() -> Regex {
    Regex::new(r"([A-Z]{3,5})\s*(\d{3})").expect("static pattern compiles")
}

/// Matches "CODE NNN - Title" catalog entries
fn course_entry_pattern() -> Regex {
    Regex::new(r"([A-Z]{3,5})\s*(\d{3})\s*-\s*([^(\n]+)").expect("static pattern compiles")
}

/// Catalog lookups backed by the retrieval port
///
/// Searches the same passage store the agents retrieve from, then extracts
/// structured records from the raw catalog text.
pub struct CatalogLookup {
    retriever: Arc<dyn RetrievalPort>,
    result_limit: usize,
}

impl CatalogLookup {
    /// Create a lookup over the given retriever
    pub fn new(retriever: Arc<dyn RetrievalPort>) -> Self {
        Self {
            retriever,
            result_limit: 5,
        }
    }

    fn extract_records(&self, text: &str, source: &str) -> Vec<CourseRecord> {
        let entry = course_entry_pattern();
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for caps in entry.captures_iter(text) {
            let code = format!("{} {}", &caps[1], &caps[2]);
            if !seen.insert(code.clone()) {
                continue;
            }

            let title = caps[3].trim().to_string();
            let entry_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let description: String = text[entry_start..]
                .chars()
                .take(200)
                .collect::<String>()
                .trim()
                .to_string();

            records.push(CourseRecord {
                code,
                title,
                description,
                source: source.to_string(),
            });
        }

        records
    }
}

#[async_trait]
impl ToolPort for CatalogLookup {
    async fn lookup_by_code(&self, code: &str) -> Result<Option<CourseRecord>> {
        let normalized = code.trim().to_uppercase();
        let passages = self
            .retriever
            .search(&normalized, self.result_limit * 2)
            .await
            .map_err(|e| AdvisorError::ToolUnavailable(format!("code lookup: {}", e)))?;

        for passage in &passages {
            for record in self.extract_records(&passage.text, &passage.source) {
                if record.code == normalized {
                    return Ok(Some(record));
                }
            }
        }

        Ok(None)
    }

    async fn lookup_by_field(&self, keyword: &str) -> Result<Vec<CourseRecord>> {
        let query = format!("{} program degree certificate training", keyword);
        let passages = self
            .retriever
            .search(&query, self.result_limit * 2)
            .await
            .map_err(|e| AdvisorError::ToolUnavailable(format!("field lookup: {}", e)))?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for passage in &passages {
            for record in self.extract_records(&passage.text, &passage.source) {
                if seen.insert(record.code.clone()) {
                    records.push(record);
                    if records.len() >= self.result_limit {
                        return Ok(records);
                    }
                }
            }
        }

        Ok(records)
    }
}

/// Format tool records for inclusion in a generation prompt
pub fn format_records(records: &[CourseRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut lines = vec!["Catalog lookup results:".to_string()];
    for record in records {
        lines.push(format!(
            "- {} - {} ({}): {}",
            record.code, record.title, record.source, record.description
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::Passage;

    struct FixedRetriever {
        passages: Vec<Passage>,
    }

    #[async_trait]
    impl RetrievalPort for FixedRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>> {
            Ok(self.passages.clone())
        }
    }

    struct DownRetriever;

    #[async_trait]
    impl RetrievalPort for DownRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>> {
            Err(AdvisorError::RetrievalUnavailable("connection refused".to_string()))
        }
    }

    fn catalog_passage() -> Passage {
        Passage {
            text: "WELD 101 - Welding Fundamentals (5)\nIntroduction to arc welding \
                   safety and technique.\nWELD 201 - Advanced Fabrication (5)\nBlueprint \
                   reading and structural work."
                .to_string(),
            score: 0.92,
            source: "catalog p.33".to_string(),
        }
    }

    #[test]
    fn test_course_code_pattern() {
        let pattern = course_code_pattern();
        assert!(pattern.is_match("Tell me about WELD 101"));
        assert!(pattern.is_match("NURS101 prerequisites"));
        assert!(!pattern.is_match("how much does welding cost"));
    }

    #[tokio::test]
    async fn test_lookup_by_code_finds_match() {
        let lookup = CatalogLookup::new(Arc::new(FixedRetriever {
            passages: vec![catalog_passage()],
        }));

        let record = lookup.lookup_by_code("weld 101").await.unwrap().unwrap();
        assert_eq!(record.code, "WELD 101");
        assert_eq!(record.title, "Welding Fundamentals");
        assert_eq!(record.source, "catalog p.33");
    }

    #[tokio::test]
    async fn test_lookup_by_code_missing() {
        let lookup = CatalogLookup::new(Arc::new(FixedRetriever {
            passages: vec![catalog_passage()],
        }));

        let record = lookup.lookup_by_code("NURS 301").await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_field_dedupes() {
        let lookup = CatalogLookup::new(Arc::new(FixedRetriever {
            passages: vec![catalog_passage(), catalog_passage()],
        }));

        let records = lookup.lookup_by_field("welding").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "WELD 101");
        assert_eq!(records[1].code, "WELD 201");
    }

    #[tokio::test]
    async fn test_backend_down_is_tool_unavailable() {
        let lookup = CatalogLookup::new(Arc::new(DownRetriever));

        let err = lookup.lookup_by_code("WELD 101").await.unwrap_err();
        assert!(matches!(err, AdvisorError::ToolUnavailable(_)));
    }

    #[test]
    fn test_format_records_empty() {
        assert_eq!(format_records(&[]), "");
    }

    #[test]
    fn test_format_records_lists_codes() {
        let records = vec![CourseRecord {
            code: "WELD 101".to_string(),
            title: "Welding Fundamentals".to_string(),
            description: "Intro".to_string(),
            source: "catalog p.33".to_string(),
        }];

        let formatted = format_records(&records);
        assert!(formatted.contains("WELD 101"));
        assert!(formatted.contains("Catalog lookup results:"));
    }
}
