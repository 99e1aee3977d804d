//! AI Task Broker
//!
//! Matches urgent world events (a phone ringing, a prop crashing down) to idle
//! AI agents. Agents are served in registration order; there is no distance
//! or priority weighting.
//!
//! Assignment is fire-and-forget: once a task is handed to an agent it stays
//! assigned for the rest of the match. `clear_task` frees the agent for new
//! work but does not reopen the task.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ids::{AgentId, EntityId};

/// What the task was raised by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Urgent interaction (e.g. a ringing MeowPhone).
    Urgent,
    /// Noise from a prop.
    Noise,
}

/// A location an AI agent should investigate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiTask {
    /// Entity that raised it.
    pub source: EntityId,
    /// Where to go.
    pub location: Vec3,
    /// Raised by.
    pub kind: TaskKind,
    /// Agent handling it. Never cleared once set.
    pub assigned_to: Option<AgentId>,
}

/// One assignment made by [`AiTaskBroker::dispatch_pending`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    /// Agent receiving the task.
    pub agent: AgentId,
    /// Source entity.
    pub source: EntityId,
    /// Where to go.
    pub location: Vec3,
}

/// Urgent task pool and agent roster.
#[derive(Debug, Default)]
pub struct AiTaskBroker {
    agents: Vec<AgentId>,
    committed: Vec<AgentId>,
    tasks: Vec<AiTask>,
}

impl AiTaskBroker {
    /// Empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent to the end of the pool. Registering twice is a no-op.
    pub fn register(&mut self, agent: AgentId) {
        if !self.agents.contains(&agent) {
            self.agents.push(agent);
        }
    }

    /// Remove an agent from the pool.
    pub fn unregister(&mut self, agent: AgentId) {
        self.agents.retain(|a| *a != agent);
        self.committed.retain(|a| *a != agent);
    }

    /// Queue an urgent task unless one from `source` is already waiting.
    pub fn submit_urgent_task(&mut self, source: EntityId, location: Vec3) -> bool {
        self.submit(source, location, TaskKind::Urgent)
    }

    /// Queue a noise task unless one from `source` is already waiting.
    pub fn submit_noise(&mut self, source: EntityId, location: Vec3) -> bool {
        self.submit(source, location, TaskKind::Noise)
    }

    fn submit(&mut self, source: EntityId, location: Vec3, kind: TaskKind) -> bool {
        let duplicate = self.tasks
            .iter()
            .any(|t| t.assigned_to.is_none() && t.source == source);
        if duplicate {
            debug!("{:?} task from {} already pending", kind, source);
            return false;
        }

        self.tasks.push(AiTask { source, location, kind, assigned_to: None });
        debug!("{:?} task queued from {}", kind, source);
        true
    }

    /// Hand each waiting task to the first uncommitted agent.
    pub fn dispatch_pending(&mut self) -> Vec<Assignment> {
        let mut assignments = Vec::new();

        for task in self.tasks.iter_mut().filter(|t| t.assigned_to.is_none()) {
            let free = self.agents
                .iter()
                .copied()
                .find(|agent| !self.committed.contains(agent));
            let Some(agent) = free else {
                break;
            };

            task.assigned_to = Some(agent);
            self.committed.push(agent);
            info!("Agent {} investigating {} at {:?}", agent, task.source, task.location);
            assignments.push(Assignment {
                agent,
                source: task.source,
                location: task.location,
            });
        }

        assignments
    }

    /// Free an agent for new tasks. Its task stays assigned.
    pub fn clear_task(&mut self, agent: AgentId) {
        self.committed.retain(|a| *a != agent);
    }

    /// Unassigned tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.assigned_to.is_none()).count()
    }

    /// Every task raised so far.
    pub fn tasks(&self) -> &[AiTask] {
        &self.tasks
    }

    /// Is the agent in the pool?
    pub fn is_registered(&self, agent: AgentId) -> bool {
        self.agents.contains(&agent)
    }

    /// Is the agent working on something?
    pub fn is_committed(&self, agent: AgentId) -> bool {
        self.committed.contains(&agent)
    }
}
