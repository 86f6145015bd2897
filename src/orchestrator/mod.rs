//! Multi-agent orchestrator - main coordinator
//!
//! Top-level entry point for one turn: route the query, dispatch specialist
//! agents (concurrently when the decision targets more than one category),
//! synthesize a single answer in fixed category order, merge extracted
//! context into the session, persist, and emit trace events. No single
//! agent failure aborts a turn; only a session save failure is a hard
//! error.

pub mod state;

pub use state::{TurnEvent, TurnPhase};

use crate::agents::{self, AgentResult, AgentSettings, SessionView, SpecialistAgent};
use crate::category::Category;
use crate::config::Config;
use crate::errors::Result;
use crate::generation::OllamaGenerator;
use crate::retrieval::{OllamaEmbedder, QdrantRetriever};
use crate::routing::{keywords, RouteOutcome, Router, RoutingDecision};
use crate::session::{FileSessionStore, Session, SessionStore, TurnRecord};
use crate::telemetry::{TelemetryCollector, TraceEvent};
use crate::tools::CatalogLookup;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Answer returned when every dispatched agent fails
pub const FALLBACK_ANSWER: &str =
    "I'm sorry, I wasn't able to find an answer right now. Please try again in a \
     moment, or contact the college directly for help.";

/// Canned reply for greetings and generic help requests
pub const GREETING_ANSWER: &str =
    "Hello! I'm the student advisor. I can help you with:\n\n\
     * Programs & Courses - certificates, degrees, and training programs\n\
     * Admissions - applications, requirements, and enrollment steps\n\
     * Financial Aid - tuition costs, FAFSA, scholarships, and payment options\n\n\
     What would you like to know?";

/// The final response for one turn
#[derive(Debug, Clone)]
pub struct SynthesizedResponse {
    /// Final answer text
    pub answer: String,
    /// Contributing categories, in fixed priority order
    pub categories: Vec<Category>,
    /// Categories that failed or timed out this turn
    pub partial_failures: Vec<Category>,
    /// Deduplicated passage source locators backing the answer
    pub sources: Vec<String>,
    /// Every dispatched agent failed; `answer` is the fallback text
    pub failed: bool,
}

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Independent deadline per dispatched agent
    pub agent_timeout: Duration,
    /// Turns of history carried into agent prompts
    pub history_turns: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(45),
            history_turns: 5,
        }
    }
}

/// Top-level coordinator over the closed category set
pub struct Orchestrator {
    router: Router,
    program: Arc<SpecialistAgent>,
    admissions: Arc<SpecialistAgent>,
    financial: Arc<SpecialistAgent>,
    store: Arc<dyn SessionStore>,
    telemetry: TelemetryCollector,
    settings: OrchestratorSettings,
    // One guard per session id; a handle call holds it for the whole turn
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    /// Create an orchestrator from pre-built components
    pub fn new(
        router: Router,
        program: Arc<SpecialistAgent>,
        admissions: Arc<SpecialistAgent>,
        financial: Arc<SpecialistAgent>,
        store: Arc<dyn SessionStore>,
        telemetry: TelemetryCollector,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            router,
            program,
            admissions,
            financial,
            store,
            telemetry,
            settings,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wire up the production stack from configuration
    pub fn from_config(config: &Config, telemetry: TelemetryCollector) -> Result<Self> {
        let generator = Arc::new(OllamaGenerator::with_config(
            &config.generation.base_url,
            &config.generation.model,
            Duration::from_secs(config.generation.timeout_secs),
        )?);

        let embedder = OllamaEmbedder::new(
            &config.generation.base_url,
            &config.retrieval.embedding_model,
        )?;
        let retriever: Arc<QdrantRetriever> = Arc::new(QdrantRetriever::new(
            &config.retrieval.qdrant_url,
            embedder,
            &config.retrieval.collection,
        )?);
        let tools = Arc::new(CatalogLookup::new(retriever.clone()));

        let agent_settings = AgentSettings {
            passage_budget: config.retrieval.passage_budget,
            max_tokens: config.generation.max_tokens,
            ..AgentSettings::default()
        };

        let agent = |category| {
            Arc::new(SpecialistAgent::new(
                category,
                retriever.clone(),
                generator.clone(),
                tools.clone(),
                agent_settings.clone(),
            ))
        };

        let router = Router::new(
            generator.clone(),
            config.routing.confidence_threshold,
            Duration::from_secs(config.routing.cache_ttl_secs),
            config.routing.cache_capacity,
        );

        let store = Arc::new(FileSessionStore::new(config.session_storage_dir())?);

        Ok(Self::new(
            router,
            agent(Category::Program),
            agent(Category::Admissions),
            agent(Category::Financial),
            store,
            telemetry,
            OrchestratorSettings {
                agent_timeout: Duration::from_secs(config.orchestrator.agent_timeout_secs),
                history_turns: config.orchestrator.history_turns,
            },
        ))
    }

    /// Closed dispatch over the fixed category set
    fn agent(&self, category: Category) -> &Arc<SpecialistAgent> {
        match category {
            Category::Program => &self.program,
            Category::Admissions => &self.admissions,
            Category::Financial => &self.financial,
        }
    }

    /// Telemetry handle
    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Process one query for one session
    ///
    /// The process entry contract: everything short of a session save
    /// failure returns a SynthesizedResponse, including the all-agents-
    /// failed fallback.
    pub async fn handle(&self, session_id: &str, query: &str) -> Result<SynthesizedResponse> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let start = Instant::now();
        self.telemetry.record(TraceEvent::QueryReceived {
            session_id: session_id.to_string(),
            query: query.to_string(),
            timestamp: Instant::now(),
        });

        let mut session = self
            .store
            .load(session_id)
            .await?
            .unwrap_or_else(|| Session::new(session_id));

        // Small talk needs no specialist: answer directly, still record the turn
        if keywords::is_smalltalk(query) {
            return self.answer_greeting(&mut session, query).await;
        }

        let mut phase = TurnPhase::Received;

        // The query itself may state facts worth remembering
        let query_attrs = agents::extract_context(query, "");
        session.merge_context(&query_attrs);

        let RouteOutcome { decision, cache_hit } =
            self.router.route(query, &session.context_summary()).await;
        phase = phase.transition(TurnEvent::RoutingComplete)?;
        self.telemetry.record(TraceEvent::RoutingComputed {
            targets: decision.targets.clone(),
            parallel: decision.parallel,
            cache_hit,
            timestamp: Instant::now(),
        });

        let view = SessionView {
            context_summary: session.context_summary(),
            recent_history: session.recent_history(self.settings.history_turns),
        };

        phase = phase.transition(TurnEvent::AgentsDispatched)?;
        let results = self.dispatch(&decision, query, &view).await;

        for result in &results {
            self.telemetry.record(TraceEvent::AgentCompleted {
                category: result.category,
                success: result.success,
                timed_out: result.timed_out,
                latency_ms: result.latency_ms,
                timestamp: Instant::now(),
            });
        }

        let successes: Vec<&AgentResult> = results.iter().filter(|r| r.success).collect();
        let partial_failures: Vec<Category> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.category)
            .collect();

        let (answer, categories, sources, failed) = if successes.is_empty() {
            phase = phase.transition(TurnEvent::AllAgentsFailed)?;
            (FALLBACK_ANSWER.to_string(), Vec::new(), Vec::new(), true)
        } else {
            phase = phase.transition(TurnEvent::SynthesisComplete)?;
            let answer = synthesize(&successes);
            let categories: Vec<Category> = successes.iter().map(|r| r.category).collect();
            let sources = collect_sources(&successes);
            (answer, categories, sources, false)
        };

        // Results arrive in decision order, so later categories overwrite
        // earlier ones per key: the documented last-writer tie-break
        for result in &results {
            if result.success {
                session.merge_context(&result.extracted_context);
            }
        }

        session.append_turn(TurnRecord {
            query: query.to_string(),
            timestamp: Utc::now(),
            categories: if failed {
                decision.targets.clone()
            } else {
                categories.clone()
            },
            answer: answer.clone(),
            failed,
            partial: !failed && !partial_failures.is_empty(),
        });

        self.store.save(&session).await?;
        phase = phase.transition(TurnEvent::SessionSaved)?;
        debug_assert!(phase.is_terminal());

        self.telemetry.record(TraceEvent::TurnSynthesized {
            categories: categories.clone(),
            partial_failures: partial_failures.len(),
            total_failure: failed,
            total_ms: start.elapsed().as_millis() as u64,
            timestamp: Instant::now(),
        });

        Ok(SynthesizedResponse {
            answer,
            categories,
            partial_failures,
            sources,
            failed,
        })
    }

    /// Dispatch all target agents and collect results in decision order
    ///
    /// Parallel decisions spawn one task per agent; every agent shares the
    /// same absolute deadline measured from dispatch, so a slow sibling
    /// never extends another agent's budget. A timed-out task is abandoned
    /// and recorded as such; its late result is discarded.
    async fn dispatch(
        &self,
        decision: &RoutingDecision,
        query: &str,
        view: &SessionView,
    ) -> Vec<AgentResult> {
        if !decision.parallel {
            let category = decision.targets[0];
            let agent = self.agent(category);
            return match tokio::time::timeout(
                self.settings.agent_timeout,
                agent.respond(query, view),
            )
            .await
            {
                Ok(result) => vec![result],
                Err(_) => vec![AgentResult::timed_out(
                    category,
                    self.settings.agent_timeout.as_millis() as u64,
                )],
            };
        }

        let deadline = tokio::time::Instant::now() + self.settings.agent_timeout;
        let timeout_ms = self.settings.agent_timeout.as_millis() as u64;

        let handles: Vec<(Category, JoinHandle<AgentResult>)> = decision
            .targets
            .iter()
            .map(|&category| {
                let agent = self.agent(category).clone();
                let query = query.to_string();
                let view = view.clone();
                (
                    category,
                    tokio::spawn(async move { agent.respond(&query, &view).await }),
                )
            })
            .collect();

        join_all(handles.into_iter().map(|(category, handle)| async move {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(_join_err)) => AgentResult::failed(category, timeout_ms),
                Err(_elapsed) => AgentResult::timed_out(category, timeout_ms),
            }
        }))
        .await
    }

    async fn answer_greeting(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<SynthesizedResponse> {
        session.append_turn(TurnRecord {
            query: query.to_string(),
            timestamp: Utc::now(),
            categories: Vec::new(),
            answer: GREETING_ANSWER.to_string(),
            failed: false,
            partial: false,
        });
        self.store.save(session).await?;

        self.telemetry.record(TraceEvent::GreetingAnswered {
            session_id: session.id.clone(),
            timestamp: Instant::now(),
        });

        Ok(SynthesizedResponse {
            answer: GREETING_ANSWER.to_string(),
            categories: Vec::new(),
            partial_failures: Vec::new(),
            sources: Vec::new(),
            failed: false,
        })
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Combine successful results into one answer
///
/// A single result is returned verbatim; multiple results are labeled
/// segments in the order given, which the caller fixes to the decision's
/// category order.
fn synthesize(successes: &[&AgentResult]) -> String {
    if successes.len() == 1 {
        return successes[0].answer.clone();
    }

    successes
        .iter()
        .map(|r| format!("**{}:**\n{}", r.category.label(), r.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deduplicate source locators across results, first occurrence wins
fn collect_sources(successes: &[&AgentResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut sources = Vec::new();
    for result in successes {
        for source in &result.sources {
            if seen.insert(source.clone()) {
                sources.push(source.clone());
            }
        }
    }
    sources
}
