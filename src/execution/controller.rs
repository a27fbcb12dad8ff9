//! Organize controller
//!
//! Owns the organize state machine for one window:
//!
//! Idle -> [AwaitingInstruction] -> Scanning -> Analyzing -> Planning -> Executing -> Complete | Failed
//!
//! One run is active at a time. Starting a run supersedes the previous one;
//! every run carries a generation and results from a superseded run never
//! touch the published state. Only the job record is durable.

use super::executor::PlanExecutor;
use super::state::{ExecutionProgress, ExecutionReport, OrganizePhase, OrganizeSnapshot, RunFailure};
use super::tracker::JobTracker;
use crate::ai::{thought_channel, ExpandableDetail, PlanningService, ThoughtReceiver, ThoughtSender};
use crate::config::OrganizerConfig;
use crate::edit::PlanEditor;
use crate::error::OrganizeError;
use crate::fs_ops::{FileOperations, LocalFileOperations};
use crate::ghost::GhostOverlay;
use crate::jobs::{FileJobLedger, InterruptedJobSummary, JobLedger};
use crate::plan::{validate_plan, OrganizePlan};
use crate::utils::IgnorePoison;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Per-run bookkeeping that is not part of the published snapshot
#[derive(Default)]
struct RunContext {
    generation: u64,
    /// Taken by the executor when the plan is accepted
    tracker: Option<JobTracker>,
    thoughts: Option<ThoughtSender>,
    thought_rx: Option<ThoughtReceiver>,
    /// The UI was closed while executing; reset once the run ends
    close_requested: bool,
}

struct ControllerInner {
    config: OrganizerConfig,
    planner: Arc<dyn PlanningService>,
    ledger: Arc<dyn JobLedger>,
    executor: PlanExecutor,
    ghost: GhostOverlay,
    state: watch::Sender<OrganizeSnapshot>,
    run: Mutex<RunContext>,
}

#[derive(Clone)]
pub struct OrganizeController {
    inner: Arc<ControllerInner>,
}

impl OrganizeController {
    pub fn new(
        config: OrganizerConfig,
        planner: Arc<dyn PlanningService>,
        fs: Arc<dyn FileOperations>,
        ledger: Arc<dyn JobLedger>,
    ) -> Self {
        let ghost = GhostOverlay::new(config.ghost_settle_delay);
        let (state, _) = watch::channel(OrganizeSnapshot::default());
        Self {
            inner: Arc::new(ControllerInner {
                executor: PlanExecutor::new(fs, ghost.clone()),
                config,
                planner,
                ledger,
                ghost,
                state,
                run: Mutex::new(RunContext::default()),
            }),
        }
    }

    /// Controller backed by the local disk and the file ledger in `config.job_dir`
    pub fn local(config: OrganizerConfig, planner: Arc<dyn PlanningService>) -> Self {
        let ledger = Arc::new(FileJobLedger::new(config.job_dir.clone()));
        Self::new(config, planner, Arc::new(LocalFileOperations::new()), ledger)
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.inner.config
    }

    /// Watch the published state
    pub fn subscribe(&self) -> watch::Receiver<OrganizeSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> OrganizeSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Ghost overlay for the current run
    pub fn ghost(&self) -> &GhostOverlay {
        &self.inner.ghost
    }

    /// Take the thought stream of the current run. Only the first call per run gets it.
    pub fn take_thoughts(&self) -> Option<ThoughtReceiver> {
        self.inner.run.lock_ignore_poison().thought_rx.take()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.run.lock_ignore_poison().generation == generation
    }

    /// Apply `update` to the published state unless the run was superseded
    fn publish_if_current<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut OrganizeSnapshot),
    {
        let run = self.inner.run.lock_ignore_poison();
        if run.generation != generation {
            return false;
        }
        self.inner.state.send_modify(update);
        true
    }

    fn require_phase(&self, expected: OrganizePhase, action: &str) -> Result<(), OrganizeError> {
        let phase = self.inner.state.borrow().phase;
        if phase != expected {
            return Err(OrganizeError::InvalidState(format!(
                "Cannot {} while {:?}",
                action, phase
            )));
        }
        Ok(())
    }

    /// Start a new run on `target_folder`, superseding any previous run.
    ///
    /// Unless the configuration asks for a user-chosen strategy, scanning and
    /// planning follow immediately and this returns once the plan is previewed.
    pub async fn start_organize(&self, target_folder: &str) -> Result<(), OrganizeError> {
        let generation = {
            let mut run = self.inner.run.lock_ignore_poison();
            run.generation += 1;
            let (tx, rx) = thought_channel(self.inner.config.thought_capacity);
            run.thoughts = Some(tx);
            run.thought_rx = Some(rx);
            run.tracker = None;
            run.close_requested = false;

            self.inner.ghost.reset();
            let target = target_folder.to_string();
            self.inner.state.send_modify(|s| {
                *s = OrganizeSnapshot {
                    phase: OrganizePhase::Scanning,
                    target_folder: Some(target),
                    ..OrganizeSnapshot::default()
                };
            });
            run.generation
        };

        tracing::info!(folder = %target_folder, generation, "Starting organize run");

        let tracker = JobTracker::start(
            Arc::clone(&self.inner.ledger),
            target_folder,
            self.inner.config.job_clear_delay,
        )
        .await;

        let job_id = tracker.job_id().to_string();
        let degraded = !tracker.is_active();
        let awaiting = self.inner.config.require_instruction;
        {
            let mut run = self.inner.run.lock_ignore_poison();
            if run.generation != generation {
                tracing::debug!(job_id = %job_id, "Run superseded while starting");
                return Ok(());
            }
            run.tracker = Some(tracker);
            self.inner.state.send_modify(|s| {
                s.job_id = Some(job_id);
                s.persistence_degraded = degraded;
                if awaiting {
                    s.phase = OrganizePhase::AwaitingInstruction;
                }
            });
        }

        if awaiting {
            return Ok(());
        }
        // Empty intent lets the planning service pick a strategy
        self.generate_plan(generation, "").await
    }

    /// Continue a run that is waiting for the user's strategy
    pub async fn submit_instruction(&self, intent: &str) -> Result<(), OrganizeError> {
        let generation = {
            let run = self.inner.run.lock_ignore_poison();
            self.require_phase(OrganizePhase::AwaitingInstruction, "submit an instruction")?;
            self.inner.state.send_modify(|s| s.phase = OrganizePhase::Scanning);
            run.generation
        };
        self.generate_plan(generation, intent).await
    }

    async fn generate_plan(&self, generation: u64, intent: &str) -> Result<(), OrganizeError> {
        let (target_folder, thoughts) = {
            let run = self.inner.run.lock_ignore_poison();
            if run.generation != generation {
                return Ok(());
            }
            let thoughts = match &run.thoughts {
                Some(thoughts) => thoughts.clone(),
                None => thought_channel(1).0,
            };
            (self.inner.state.borrow().target_folder.clone(), thoughts)
        };
        let target_folder = target_folder.ok_or_else(|| {
            OrganizeError::InvalidState("No target folder for this run".to_string())
        })?;

        thoughts.emit(
            "indexing",
            "Scanning folder structure...",
            Some(vec![ExpandableDetail::new("Path", target_folder.as_str())]),
        );

        if let Err(e) = self.inner.planner.scan(&target_folder, thoughts.clone()).await {
            return self.fail_before_execution(generation, "Scanning", OrganizeError::Planning(e)).await;
        }
        if !self.publish_if_current(generation, |s| s.phase = OrganizePhase::Analyzing) {
            return Ok(());
        }

        let raw = match self.inner.planner.plan(&target_folder, intent, thoughts.clone()).await {
            Ok(raw) => raw,
            Err(e) => {
                return self.fail_before_execution(generation, "Planning", OrganizeError::Planning(e)).await;
            }
        };
        if !self.is_current(generation) {
            tracing::debug!(generation, "Dropping plan from superseded run");
            return Ok(());
        }

        let mut plan = match validate_plan(&raw) {
            Ok(plan) => plan,
            Err(e) => return self.fail_before_execution(generation, "Plan validation", e).await,
        };
        plan.attach_risk_levels();

        let run = self.inner.run.lock_ignore_poison();
        if run.generation != generation {
            return Ok(());
        }
        self.inner.ghost.build_from_plan(&plan);
        tracing::info!(
            plan_id = %plan.plan_id,
            operations = plan.len(),
            simplification_recommended = plan.simplification_recommended.unwrap_or(false),
            "Plan ready for preview"
        );
        let risk_summary = plan.risk_summary();
        self.inner.state.send_modify(|s| {
            s.phase = OrganizePhase::Planning;
            s.risk_summary = Some(risk_summary);
            s.plan = Some(plan);
        });
        Ok(())
    }

    /// Record a failure that happened before anything touched the disk
    async fn fail_before_execution(
        &self,
        generation: u64,
        stage: &str,
        err: OrganizeError,
    ) -> Result<(), OrganizeError> {
        let tracker = {
            let mut run = self.inner.run.lock_ignore_poison();
            if run.generation != generation {
                return Ok(());
            }
            tracing::warn!(stage, error = %err, "Organize run failed before execution");
            let failure = RunFailure {
                op_id: None,
                index: None,
                description: stage.to_string(),
                error: err.to_string(),
            };
            self.inner.state.send_modify(|s| {
                s.phase = OrganizePhase::Failed;
                s.failure = Some(failure);
            });
            run.tracker.take()
        };
        if let Some(mut tracker) = tracker {
            tracker.record_failure(&err.to_string()).await;
        }
        Err(err)
    }

    /// Open an editable copy of the previewed plan
    pub fn open_edit(&self) -> Result<PlanEditor, OrganizeError> {
        self.require_phase(OrganizePhase::Planning, "edit the plan")?;
        let editor = self.inner.state.borrow().plan.as_ref().map(PlanEditor::open);
        editor.ok_or_else(|| OrganizeError::InvalidState("No plan to edit".to_string()))
    }

    /// Execute the previewed plan as-is
    pub async fn accept_plan(&self) -> Result<ExecutionReport, OrganizeError> {
        let plan = self
            .inner
            .state
            .borrow()
            .plan
            .clone()
            .ok_or_else(|| OrganizeError::InvalidState("No plan to accept".to_string()))?;
        self.execute(plan).await
    }

    /// Execute the edited plan: enabled operations only, original order
    pub async fn apply_edits(&self, editor: &PlanEditor) -> Result<ExecutionReport, OrganizeError> {
        let previewed = self.inner.state.borrow().plan.as_ref().map(|p| p.plan_id.clone());
        if previewed.as_deref() != Some(editor.plan_id()) {
            return Err(OrganizeError::InvalidState(
                "Edits belong to a different plan".to_string(),
            ));
        }
        let plan = editor.apply();
        tracing::info!(
            plan_id = %plan.plan_id,
            enabled = plan.len(),
            total = editor.operations().len(),
            "Applying edited plan"
        );
        self.execute(plan).await
    }

    async fn execute(&self, plan: OrganizePlan) -> Result<ExecutionReport, OrganizeError> {
        let (generation, mut tracker) = {
            let mut run = self.inner.run.lock_ignore_poison();
            self.require_phase(OrganizePhase::Planning, "execute")?;
            let tracker = run
                .tracker
                .take()
                .ok_or_else(|| OrganizeError::InvalidState("No job for this run".to_string()))?;

            // The preview shows exactly what is about to run
            self.inner.ghost.build_from_plan(&plan);
            let total = plan.len();
            let risk_summary = plan.risk_summary();
            let executing = plan.clone();
            self.inner.state.send_modify(|s| {
                s.phase = OrganizePhase::Executing;
                s.is_executing = true;
                s.risk_summary = Some(risk_summary);
                s.plan = Some(executing);
                s.failure = None;
                s.progress = Some(ExecutionProgress {
                    total,
                    ..ExecutionProgress::default()
                });
            });
            (run.generation, tracker)
        };

        let result = self
            .inner
            .executor
            .execute(
                &plan,
                &mut tracker,
                |progress| {
                    self.publish_if_current(generation, |s| s.progress = Some(progress));
                },
                || self.is_current(generation),
            )
            .await;
        let persisted = tracker.is_active();

        let mut run = self.inner.run.lock_ignore_poison();
        if run.generation != generation {
            return result;
        }

        let failure = match &result {
            Ok(_) => None,
            Err(OrganizeError::OperationExecution {
                op_id,
                index,
                description,
                message,
            }) => Some(RunFailure {
                op_id: Some(op_id.clone()),
                index: Some(*index),
                description: description.clone(),
                error: message.clone(),
            }),
            Err(other) => Some(RunFailure {
                op_id: None,
                index: None,
                description: "Execution".to_string(),
                error: other.to_string(),
            }),
        };

        if run.close_requested {
            // The organizer was closed mid-run; the ledger already holds the outcome
            tracing::info!(generation, "Run finished after close, resetting organizer");
            run.close_requested = false;
            run.thoughts = None;
            run.thought_rx = None;
            self.inner.ghost.reset();
            self.inner.state.send_modify(|s| *s = OrganizeSnapshot::default());
            return result;
        }

        self.inner.state.send_modify(|s| {
            s.is_executing = false;
            s.persistence_degraded = s.persistence_degraded || !persisted;
            match failure {
                None => s.phase = OrganizePhase::Complete,
                Some(failure) => {
                    s.phase = OrganizePhase::Failed;
                    s.failure = Some(failure);
                }
            }
        });
        result
    }

    /// Discard the previewed plan and its job record
    pub async fn reject_plan(&self) -> Result<(), OrganizeError> {
        let tracker = {
            let mut run = self.inner.run.lock_ignore_poison();
            self.require_phase(OrganizePhase::Planning, "reject the plan")?;
            run.generation += 1;
            run.thoughts = None;
            run.thought_rx = None;
            self.inner.ghost.reset();
            self.inner.state.send_modify(|s| *s = OrganizeSnapshot::default());
            run.tracker.take()
        };
        tracing::info!("Plan rejected");
        if let Some(tracker) = tracker {
            tracker.discard().await;
        }
        Ok(())
    }

    /// Close the organizer UI.
    ///
    /// An executing run keeps going until it resolves; the UI state is reset
    /// when it ends. Otherwise the organizer returns to Idle right away and
    /// any pending run is abandoned.
    pub async fn close_organizer(&self) {
        let tracker = {
            let mut run = self.inner.run.lock_ignore_poison();
            if self.inner.state.borrow().is_executing {
                tracing::debug!("Organizer closed while executing, deferring reset");
                run.close_requested = true;
                return;
            }
            run.generation += 1;
            run.thoughts = None;
            run.thought_rx = None;
            run.close_requested = false;
            self.inner.ghost.reset();
            self.inner.state.send_modify(|s| *s = OrganizeSnapshot::default());
            run.tracker.take()
        };
        if let Some(tracker) = tracker {
            tracker.discard().await;
        }
    }

    fn current_job_id(&self) -> Option<String> {
        self.inner.state.borrow().job_id.clone()
    }

    /// Look for a job abandoned by an unclean exit.
    ///
    /// The job of this controller's own run is never reported.
    pub async fn check_interrupted_job(
        &self,
    ) -> Result<Option<InterruptedJobSummary>, OrganizeError> {
        if let Some(job) = self.inner.ledger.load_job().await? {
            if Some(&job.job_id) == self.current_job_id().as_ref() {
                return Ok(None);
            }
        }

        let job = self.inner.ledger.check_interrupted_job().await?;
        if let Some(job) = &job {
            tracing::info!(
                job_id = %job.job_id,
                completed = job.completed_count(),
                total = job.total_ops,
                "Found interrupted organize job"
            );
        }
        Ok(job.as_ref().map(InterruptedJobSummary::from))
    }

    /// Forget the interrupted job
    pub async fn dismiss_interrupted_job(&self) -> Result<(), OrganizeError> {
        if let Some(summary) = self.check_interrupted_job().await? {
            self.inner.ledger.clear_job_if(&summary.job_id).await?;
            tracing::info!(job_id = %summary.job_id, "Dismissed interrupted job");
        }
        Ok(())
    }

    /// Discard the interrupted job and start a fresh run on the same folder.
    /// The folder is rescanned and replanned; nothing from the old plan is replayed.
    pub async fn resume_interrupted_job(&self) -> Result<(), OrganizeError> {
        let summary = self
            .check_interrupted_job()
            .await?
            .ok_or_else(|| OrganizeError::InvalidState("No interrupted job to resume".to_string()))?;

        self.inner.ledger.clear_job_if(&summary.job_id).await?;
        tracing::info!(
            job_id = %summary.job_id,
            folder = %summary.target_folder,
            "Resuming interrupted job with a fresh plan"
        );
        self.start_organize(&summary.target_folder).await
    }
}
