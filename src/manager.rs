//! Agent registry and scheduler
//!
//! One `AgentManager` per orchestration session: it owns every worker,
//! routes tasks to the best match, queues what it cannot route, and runs
//! workflows step by step. Construct it explicitly and pass it where it is
//! needed; there is no shared global instance.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentHandle, AgentSpec, AgentStatus};
use crate::behavior::{behavior_for, Behavior};
use crate::error::OrchestrationError;
use crate::event::{Event, EventSender};
use crate::ids::TaskId;
use crate::matcher::{KeywordMatchPolicy, MatchPolicy};
use crate::task::{Task, TaskRequirements};
use crate::workflow::{Workflow, WorkflowDefinition, WorkflowStatus};

/// Outcome of a task submission
#[derive(Debug)]
pub enum Assignment {
    /// A worker took the task and ran it to resolution
    Completed(Task),
    /// No capable idle worker was available; the task waits in the queue
    Queued(TaskId),
}

/// Point-in-time counts for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    pub total_agents: usize,
    pub active_agents: usize,
    pub idle_agents: usize,
    pub queued_tasks: usize,
    pub active_workflows: usize,
}

/// The agent registry and task scheduler
pub struct AgentManager {
    /// All agents, keyed by role name
    agents: RwLock<HashMap<String, AgentHandle>>,
    /// Role names in registration order; routing fairness depends on it
    order: RwLock<Vec<String>>,
    /// Tasks waiting for a capable idle worker, FIFO
    task_queue: RwLock<VecDeque<Task>>,
    /// Worker-matching policy
    policy: Box<dyn MatchPolicy>,
    /// Workflows currently executing
    active_workflows: AtomicUsize,
    /// Event sender shared with every registered agent
    event_tx: EventSender,
}

impl AgentManager {
    /// Create a manager with the default keyword-matching policy
    pub fn new(event_tx: EventSender) -> Self {
        Self::with_policy(Box::new(KeywordMatchPolicy), event_tx)
    }

    /// Create a manager with a custom matching policy
    pub fn with_policy(policy: Box<dyn MatchPolicy>, event_tx: EventSender) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            task_queue: RwLock::new(VecDeque::new()),
            policy,
            active_workflows: AtomicUsize::new(0),
            event_tx,
        }
    }

    /// Register a worker, choosing its behavior from the spec
    pub fn register(&self, spec: AgentSpec) -> Result<AgentHandle, OrchestrationError> {
        let behavior = behavior_for(&spec);
        self.register_with_behavior(spec, behavior)
    }

    /// Register a worker with an explicit behavior
    ///
    /// The agent shares this manager's event channel, so its lifecycle
    /// events are relayed to whoever holds the receiver.
    pub fn register_with_behavior(
        &self,
        spec: AgentSpec,
        behavior: Box<dyn Behavior>,
    ) -> Result<AgentHandle, OrchestrationError> {
        let mut agents = self.agents.write();
        if agents.contains_key(&spec.role) {
            return Err(OrchestrationError::DuplicateAgent(spec.role.clone()));
        }

        let role = spec.role.clone();
        let agent = Agent::new(spec, behavior, self.event_tx.clone());
        let agent_id = agent.id;
        let handle = AgentHandle::new(agent);

        agents.insert(role.clone(), handle.clone());
        self.order.write().push(role.clone());
        drop(agents);

        self.emit(Event::AgentRegistered {
            agent_id,
            role: role.clone(),
        });
        info!(role = %role, "Registered agent");
        Ok(handle)
    }

    /// Get an agent by role name
    pub fn get_agent(&self, role: &str) -> Option<AgentHandle> {
        self.agents.read().get(role).cloned()
    }

    /// Role names in registration order
    pub fn roles(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// Number of registered agents
    pub fn agent_count(&self) -> usize {
        self.agents.read().len()
    }

    /// Idle agents in registration order
    fn idle_agents(&self) -> Vec<AgentHandle> {
        let agents = self.agents.read();
        self.order
            .read()
            .iter()
            .filter_map(|role| agents.get(role))
            .filter(|agent| agent.is_idle())
            .cloned()
            .collect()
    }

    /// Ask the matching policy for the best idle worker
    pub fn find_best_agent(&self, requirements: &TaskRequirements) -> Option<AgentHandle> {
        let candidates = self.idle_agents();
        self.policy
            .select(requirements, &candidates)
            .map(|index| candidates[index].clone())
    }

    /// Submit a task
    ///
    /// If a capable idle worker exists the task is delegated synchronously
    /// and the resolved task is returned; otherwise it joins the FIFO queue
    /// and the caller gets the queued sentinel back immediately.
    pub async fn assign_task(&self, task: Task) -> Assignment {
        let Some(agent) = self.find_best_agent(&task.requirements) else {
            return self.enqueue(task);
        };

        debug!(agent = %agent.spec.role, task = %task.id, "Routing task");
        match agent.assign_task(task.clone()).await {
            Ok(resolved) => Assignment::Completed(resolved),
            // The agent went busy between selection and delivery; fall
            // back to the queue rather than failing the submission.
            Err(_) => self.enqueue(task),
        }
    }

    fn enqueue(&self, task: Task) -> Assignment {
        let task_id = task.id;
        self.task_queue.write().push_back(task);
        self.emit(Event::TaskQueued { task_id });
        debug!(task = %task_id, "No capable idle agent; task queued");
        Assignment::Queued(task_id)
    }

    /// Drain the task queue in FIFO order
    ///
    /// Stops at the first task that still cannot be routed; later tasks
    /// are never skipped ahead of the head. Returns the number of tasks
    /// delegated.
    pub async fn process_queue(&self) -> usize {
        let mut drained = 0;
        loop {
            let agent = {
                let queue = self.task_queue.read();
                let Some(head) = queue.front() else { break };
                match self.find_best_agent(&head.requirements) {
                    Some(agent) => agent,
                    None => break,
                }
            };

            let Some(task) = self.task_queue.write().pop_front() else {
                break;
            };
            match agent.assign_task(task.clone()).await {
                Ok(_) => drained += 1,
                Err(_) => {
                    // Lost the agent between lookup and delivery; restore
                    // the head and keep queue order intact.
                    self.task_queue.write().push_front(task);
                    break;
                }
            }
        }
        drained
    }

    /// Tasks currently waiting in the queue
    pub fn queued_tasks(&self) -> usize {
        self.task_queue.read().len()
    }

    /// Run a workflow: strictly sequential, each step bound to a role
    ///
    /// Every step receives the accumulated results of the steps before it
    /// in its task context. The first failure (missing role or a step
    /// error) marks the run failed, keeps the partial results, and skips
    /// the remaining steps. There are no retries at this layer.
    pub async fn run_workflow(&self, definition: WorkflowDefinition) -> Workflow {
        let mut workflow = Workflow::new(definition);
        info!(
            workflow = %workflow.id,
            name = %workflow.name,
            steps = workflow.steps.len(),
            "Starting workflow"
        );
        self.active_workflows.fetch_add(1, Ordering::SeqCst);
        self.emit(Event::WorkflowStarted {
            workflow_id: workflow.id,
            name: workflow.name.clone(),
        });

        let steps = workflow.steps.clone();
        for (index, step) in steps.iter().enumerate() {
            let Some(agent) = self.get_agent(&step.role) else {
                let error = format!("no agent registered for role: {}", step.role);
                warn!(workflow = %workflow.id, step = index, error = %error, "Workflow failed");
                workflow.fail(index, error.clone());
                self.emit(Event::WorkflowFailed {
                    workflow_id: workflow.id,
                    step: index,
                    error,
                });
                break;
            };

            let mut requirements = step.requirements.clone();
            if requirements.role.is_none() {
                requirements.role = Some(step.role.clone());
            }
            let task = Task::new(step.description.clone())
                .with_requirements(requirements)
                .with_context(json!({
                    "workflow": workflow.name,
                    "step": index,
                    "context": workflow.context,
                    "results": workflow.results,
                }));

            match agent.assign_task(task).await {
                Ok(resolved) if resolved.succeeded() => {
                    workflow.results.push(resolved.result.unwrap_or(Value::Null));
                    self.emit(Event::WorkflowStepCompleted {
                        workflow_id: workflow.id,
                        step: index,
                    });
                }
                Ok(resolved) => {
                    let error = resolved
                        .error
                        .unwrap_or_else(|| "step failed without an error".into());
                    warn!(workflow = %workflow.id, step = index, error = %error, "Workflow failed");
                    workflow.fail(index, error.clone());
                    self.emit(Event::WorkflowFailed {
                        workflow_id: workflow.id,
                        step: index,
                        error,
                    });
                    break;
                }
                Err(err) => {
                    let error = err.to_string();
                    warn!(workflow = %workflow.id, step = index, error = %error, "Workflow failed");
                    workflow.fail(index, error.clone());
                    self.emit(Event::WorkflowFailed {
                        workflow_id: workflow.id,
                        step: index,
                        error,
                    });
                    break;
                }
            }
        }

        if workflow.status == WorkflowStatus::Running {
            workflow.complete();
            self.emit(Event::WorkflowCompleted {
                workflow_id: workflow.id,
            });
            info!(
                workflow = %workflow.id,
                results = workflow.results.len(),
                "Workflow completed"
            );
        }
        self.active_workflows.fetch_sub(1, Ordering::SeqCst);
        workflow
    }

    /// Point-in-time system counts; a pure read
    pub fn system_status(&self) -> SystemStatus {
        let agents = self.agents.read();
        let active = agents
            .values()
            .filter(|a| a.status() == AgentStatus::Working)
            .count();
        let idle = agents.values().filter(|a| a.is_idle()).count();
        SystemStatus {
            total_agents: agents.len(),
            active_agents: active,
            idle_agents: idle,
            queued_tasks: self.task_queue.read().len(),
            active_workflows: self.active_workflows.load(Ordering::SeqCst),
        }
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }
}
