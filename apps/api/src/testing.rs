//! Scripted collaborators for unit tests. No network, no database.
//!
//! Generators answer with `"draft {index}"` (or `"refined {index}"` when a
//! refinement brief is present) so assertions can tell artifacts apart by
//! their description alone.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::company::{CompanyContext, CompanyContextProvider, CompanyRef};
use crate::errors::CollaboratorError;
use crate::memory::{
    FeedbackRepository, GenerationRecord, GenerationRepository, GoldExampleRepository,
    NewFeedback, OutcomeArchive,
};
use crate::models::job::{JobBody, JobSpec};
use crate::models::records::{FeedbackRow, GenerationRow};
use crate::pipeline::candidates::{Candidate, TextGenerator};
use crate::pipeline::persistence::PersistenceBridge;
use crate::pipeline::prompts::PromptContext;
use crate::pipeline::scorer::Judge;
use crate::pipeline::Collaborators;
use crate::style::retriever::{ChunkRetriever, StyleDimension};
use crate::style::scoring_table::Color;
use crate::style::signals::{Language, SignalTuple};

fn scripted_failure(what: &str) -> CollaboratorError {
    CollaboratorError::Unavailable(format!("scripted {what} failure"))
}

pub fn body(description: &str) -> JobBody {
    JobBody {
        job_description: description.to_string(),
        requirements: vec!["Relevant degree".to_string()],
        benefits: vec!["Flexible hours".to_string()],
        duties: vec!["Care for patients".to_string()],
        summary: None,
    }
}

pub fn job_spec() -> JobSpec {
    JobSpec {
        job_title: "Nurse".to_string(),
        language: Language::En,
        signals: SignalTuple::default(),
        min_years_experience: Some(2),
        max_years_experience: None,
        skills: vec![],
        benefit_keywords: vec![],
    }
}

pub fn prompt_context() -> PromptContext {
    PromptContext {
        candidate_index: 0,
        job: job_spec(),
        style_block: "## Persuasion style".to_string(),
        company_context: None,
        gold_examples: vec![],
        refinement: None,
    }
}

pub fn candidate(index: usize) -> Candidate {
    Candidate {
        index,
        artifact: body(&format!("draft {index}")),
        temperature: 0.35,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Style retrieval
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedRetriever {
    chunks: HashMap<(Color, StyleDimension), Vec<String>>,
    fail: bool,
}

impl ScriptedRetriever {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, color: Color, dimension: StyleDimension, chunks: Vec<String>) -> Self {
        self.chunks.insert((color, dimension), chunks);
        self
    }
}

#[async_trait]
impl ChunkRetriever for ScriptedRetriever {
    async fn query(
        &self,
        color: Color,
        dimension: StyleDimension,
        _language: Language,
    ) -> Result<Vec<String>, CollaboratorError> {
        if self.fail {
            return Err(scripted_failure("retrieval"));
        }
        Ok(self.chunks.get(&(color, dimension)).cloned().unwrap_or_default())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GeneratorLog {
    calls: HashMap<usize, usize>,
    refinements: usize,
    last_context: Option<PromptContext>,
    failures_left: HashMap<usize, usize>,
}

#[derive(Default)]
pub struct ScriptedGenerator {
    delays: HashMap<usize, Duration>,
    always_fail: bool,
    fail_refinement: HashSet<usize>,
    log: Mutex<GeneratorLog>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// The first `times` drafting calls for `index` fail.
    pub fn fail_times(self, index: usize, times: usize) -> Self {
        self.log.lock().unwrap().failures_left.insert(index, times);
        self
    }

    pub fn always_fail(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn fail_refinement(mut self, index: usize) -> Self {
        self.fail_refinement.insert(index);
        self
    }

    pub fn calls_for(&self, index: usize) -> usize {
        self.log.lock().unwrap().calls.get(&index).copied().unwrap_or(0)
    }

    pub fn refinement_calls(&self) -> usize {
        self.log.lock().unwrap().refinements
    }

    pub fn last_context(&self) -> Option<PromptContext> {
        self.log.lock().unwrap().last_context.clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        context: &PromptContext,
        _temperature: f64,
    ) -> Result<JobBody, CollaboratorError> {
        let index = context.candidate_index;
        let refining = context.refinement.is_some();

        let scripted_to_fail = {
            let mut log = self.log.lock().unwrap();
            *log.calls.entry(index).or_default() += 1;
            if refining {
                log.refinements += 1;
            }
            log.last_context = Some(context.clone());

            match log.failures_left.get_mut(&index) {
                Some(left) if *left > 0 && !refining => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };

        if let Some(delay) = self.delays.get(&index) {
            tokio::time::sleep(*delay).await;
        }

        if self.always_fail || scripted_to_fail || (refining && self.fail_refinement.contains(&index))
        {
            return Err(scripted_failure("generation"));
        }

        let label = if refining { "refined" } else { "draft" };
        Ok(body(&format!("{label} {index}")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Judging
// ────────────────────────────────────────────────────────────────────────────

const DEFAULT_SCRIPTED_SCORE: f64 = 0.9;

#[derive(Default)]
pub struct ScriptedJudge {
    scores: HashMap<String, f64>,
    fail_all: bool,
    fail_on: HashSet<String>,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    /// Scores keyed by job description; unknown descriptions score 0.9.
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(d, s)| (d.to_string(), *s)).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, description: &str) -> Self {
        self.fail_on.insert(description.to_string());
        self
    }

    /// Every call after the first `calls` fails.
    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn score_batch(
        &self,
        _job_title: &str,
        artifacts: &[JobBody],
    ) -> Result<Vec<f64>, CollaboratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.fail_after.is_some_and(|limit| call >= limit) {
            return Err(scripted_failure("judge"));
        }

        artifacts
            .iter()
            .map(|artifact| {
                if self.fail_on.contains(&artifact.job_description) {
                    return Err(scripted_failure("judge"));
                }
                Ok(self
                    .scores
                    .get(&artifact.job_description)
                    .copied()
                    .unwrap_or(DEFAULT_SCRIPTED_SCORE))
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Company context
// ────────────────────────────────────────────────────────────────────────────

pub struct StaticCompanyProvider {
    text: String,
    delay: Duration,
}

impl StaticCompanyProvider {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl CompanyContextProvider for StaticCompanyProvider {
    async fn fetch(&self, company: &CompanyRef) -> Option<CompanyContext> {
        tokio::time::sleep(self.delay).await;
        Some(CompanyContext {
            company: company.key().unwrap_or_default(),
            text: self.text.clone(),
            sources: company.urls.clone(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Storage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Stored {
    gold: Vec<(Uuid, String, JobBody)>,
    feedback: Vec<NewFeedback>,
    generations: Vec<GenerationRecord>,
    archived: Vec<String>,
}

/// One in-memory backend for every repository plus the archive.
#[derive(Default)]
pub struct InMemoryStore {
    fail: bool,
    stored: Mutex<Stored>,
}

impl InMemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), CollaboratorError> {
        if self.fail {
            Err(CollaboratorError::Storage("scripted storage failure".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn generation(&self, id: Uuid) -> Option<GenerationRecord> {
        self.stored
            .lock()
            .unwrap()
            .generations
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    pub fn archived_markdown(&self) -> Vec<String> {
        self.stored.lock().unwrap().archived.clone()
    }

    pub fn feedback_entries(&self) -> Vec<NewFeedback> {
        self.stored.lock().unwrap().feedback.clone()
    }

    pub fn gold_titles(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .gold
            .iter()
            .map(|(_, title, _)| title.clone())
            .collect()
    }
}

#[async_trait]
impl GoldExampleRepository for InMemoryStore {
    async fn save_gold_example(
        &self,
        user_id: Uuid,
        job_title: &str,
        body: &JobBody,
    ) -> Result<(), CollaboratorError> {
        self.check()?;
        self.stored
            .lock()
            .unwrap()
            .gold
            .push((user_id, job_title.to_string(), body.clone()));
        Ok(())
    }

    async fn search_gold_examples(
        &self,
        user_id: Uuid,
        job_title: &str,
        limit: usize,
    ) -> Result<Vec<JobBody>, CollaboratorError> {
        self.check()?;
        let stored = self.stored.lock().unwrap();
        let mut mine: Vec<&(Uuid, String, JobBody)> =
            stored.gold.iter().filter(|(u, _, _)| *u == user_id).rev().collect();
        let needle = job_title.trim().to_lowercase();
        mine.sort_by_key(|(_, title, _)| {
            let title = title.to_lowercase();
            (title != needle, !title.contains(&needle))
        });
        Ok(mine.into_iter().take(limit).map(|(_, _, b)| b.clone()).collect())
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryStore {
    async fn record_feedback(&self, entry: &NewFeedback) -> Result<(), CollaboratorError> {
        self.check()?;
        self.stored.lock().unwrap().feedback.push(entry.clone());
        Ok(())
    }

    async fn recent_feedback(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<FeedbackRow>, CollaboratorError> {
        self.check()?;
        let stored = self.stored.lock().unwrap();
        Ok(stored
            .feedback
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id && f.feedback.is_some())
            .take(limit)
            .map(|f| FeedbackRow {
                id: Uuid::new_v4(),
                user_id: f.user_id,
                generation_id: f.generation_id,
                job_title: f.job_title.clone(),
                label: f.label.as_str().to_string(),
                feedback: f.feedback.clone(),
                candidate_index: f.candidate_index.map(|i| i as i32),
                created_at: Utc::now(),
            })
            .collect())
    }
}

#[async_trait]
impl GenerationRepository for InMemoryStore {
    async fn record_generation(&self, record: &GenerationRecord) -> Result<(), CollaboratorError> {
        self.check()?;
        self.stored.lock().unwrap().generations.push(record.clone());
        Ok(())
    }

    async fn get_generation(&self, id: Uuid) -> Result<Option<GenerationRow>, CollaboratorError> {
        self.check()?;
        Ok(self.generation(id).map(|g| GenerationRow {
            id: g.id,
            user_id: g.user_id,
            job_title: g.job_title,
            language: g.language,
            profile: g.profile,
            winner: g.winner,
            winner_index: g.winner_index as i32,
            scores: g.scores,
            refined_indices: g.refined_indices.iter().map(|&i| i as i32).collect(),
            archive_key: g.archive_key,
            created_at: Utc::now(),
        }))
    }
}

#[async_trait]
impl OutcomeArchive for InMemoryStore {
    async fn archive(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        markdown: String,
    ) -> Result<String, CollaboratorError> {
        self.check()?;
        self.stored.lock().unwrap().archived.push(markdown);
        Ok(crate::memory::archive_key(user_id, generation_id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator bundle
// ────────────────────────────────────────────────────────────────────────────

/// Scripted defaults: drafts score 0.9, style index empty, storage in memory.
pub struct CollaboratorsBuilder {
    generator: Arc<dyn TextGenerator>,
    judge: Arc<dyn Judge>,
    retriever: Arc<dyn ChunkRetriever>,
    company: Arc<dyn CompanyContextProvider>,
    store: Arc<InMemoryStore>,
}

impl CollaboratorsBuilder {
    pub fn new() -> Self {
        Self {
            generator: Arc::new(ScriptedGenerator::new()),
            judge: Arc::new(ScriptedJudge::new(&[])),
            retriever: Arc::new(ScriptedRetriever::empty()),
            company: Arc::new(StaticCompanyProvider::new("Acme builds rockets.")),
            store: Arc::new(InMemoryStore::default()),
        }
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn judge(mut self, judge: impl Judge + 'static) -> Self {
        self.judge = Arc::new(judge);
        self
    }

    pub fn retriever(mut self, retriever: impl ChunkRetriever + 'static) -> Self {
        self.retriever = Arc::new(retriever);
        self
    }

    pub fn company(mut self, company: impl CompanyContextProvider + 'static) -> Self {
        self.company = Arc::new(company);
        self
    }

    pub fn store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn build(self) -> Collaborators {
        Collaborators {
            generator: self.generator,
            judge: self.judge,
            retriever: self.retriever,
            company: self.company,
            persistence: PersistenceBridge::new(
                self.store.clone(),
                self.store.clone(),
                self.store,
            ),
        }
    }
}
