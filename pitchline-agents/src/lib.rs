//! Pitchline Agents - Multi-Agent Pitch Pipeline
//!
//! Coordinates the research, generation, scoring and refinement agents:
//! - Role directory with idempotent get-or-create provisioning
//! - Threaded message log keyed by a per-run correlation id
//! - Execution log wrapper around any capability provider
//! - The orchestrator state machine and its pipeline trace
//! - Single-message dispatch and the run-level retry scheduler

pub mod directory;
pub mod dispatch;
pub mod instrumented;
pub mod jobs;
pub mod message_log;
pub mod orchestrator;

pub use directory::{RoleDirectory, RoleSet, StorageRoleDirectory};
pub use dispatch::MessageDispatcher;
pub use instrumented::InstrumentedCapabilities;
pub use jobs::RunScheduler;
pub use message_log::MessageLog;
pub use orchestrator::{Orchestrator, PipelineResult, PipelineStep};
