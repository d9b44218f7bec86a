//! Pipeline supervisor: one OS thread per stage.
//!
//! There is no scheduler. Once spawned, stages pace each other through their
//! conduits. The supervisor only starts threads, holds the cancellation
//! handle for unbounded stages, and collects each task's outcome when the
//! graph winds down.
//!
//! ```text
//! [Source] ──► [Split] ──► [Print]
//!                     └──► [Print]
//! ```
//!
//! `shutdown` cancels sources and samplers; their outputs close, and every
//! downstream stage finishes as it observes the close.

use crate::pipeline::cancel::{CancelHandle, CancelToken};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::TaskId;
use crate::pipeline::port::fan;
use crate::pipeline::stage::{Stage, StageContext, StageSummary};
use std::any::Any;
use std::thread::{self, JoinHandle};

struct Task {
    id: TaskId,
    name: String,
    fan_in: usize,
    fan_out: usize,
    handle: Option<JoinHandle<PipelineResult<StageSummary>>>,
}

/// A point-in-time view of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub fan_in: usize,
    pub fan_out: usize,
    pub finished: bool,
}

/// How one task ended.
#[derive(Debug)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub name: String,
    pub result: PipelineResult<StageSummary>,
}

/// Every task's outcome, in spawn order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn first_failure(&self) -> Option<&PipelineError> {
        self.outcomes.iter().find_map(|o| o.result.as_ref().err())
    }

    /// Summary of the task with the given name, if it succeeded.
    pub fn summary(&self, name: &str) -> Option<StageSummary> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.result.as_ref().ok().copied())
    }
}

pub struct Pipeline {
    tasks: Vec<Task>,
    cancel: CancelHandle,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Start `stage` on its own thread.
    pub fn spawn<S: Stage + 'static>(&mut self, mut stage: S) -> PipelineResult<TaskId> {
        let id = TaskId(self.tasks.len() as u32);
        let name = stage.name().to_string();
        let (fan_in, fan_out) = fan(&stage.ports());
        let ctx = StageContext::new(id, self.cancel.token());

        let thread_name = format!("df-{}", name);
        let task_name = name.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let result = stage.run(&ctx);
                match &result {
                    Ok(s) => tracing::debug!(
                        "Task {} '{}' finished: {} in, {} out, {} dropped",
                        ctx.task_id,
                        task_name,
                        s.received,
                        s.emitted,
                        s.dropped
                    ),
                    Err(e) if e.is_structural() => {
                        tracing::error!("Task {} '{}' failed: {}", ctx.task_id, task_name, e)
                    }
                    Err(e) => tracing::warn!("Task {} '{}' stopped: {}", ctx.task_id, task_name, e),
                }
                result
            })?;

        tracing::info!(
            "Spawned task {} '{}' ({} in, {} out)",
            id,
            name,
            fan_in,
            fan_out
        );
        self.tasks.push(Task {
            id,
            name,
            fan_in,
            fan_out,
            handle: Some(handle),
        });
        Ok(id)
    }

    /// A token tied to this pipeline's cancellation handle.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.token()
    }

    /// Ask unbounded stages to stop. Does not wait.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
    }

    pub fn topology(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .iter()
            .map(|t| TaskSnapshot {
                id: t.id,
                name: t.name.clone(),
                fan_in: t.fan_in,
                fan_out: t.fan_out,
                finished: t.handle.as_ref().map_or(true, |h| h.is_finished()),
            })
            .collect()
    }

    /// Block until one task finishes. `None` for an unknown or already
    /// collected task.
    pub fn wait(&mut self, id: TaskId) -> Option<TaskOutcome> {
        let task = self.tasks.get_mut(id.index())?;
        let handle = task.handle.take()?;
        Some(collect(task.id, &task.name, handle))
    }

    /// Stop tracking a task without waiting for it. Its thread runs on until
    /// it returns by itself, and its outcome is never collected. Returns
    /// false for an unknown or already collected task.
    pub fn detach(&mut self, id: TaskId) -> bool {
        let Some(task) = self.tasks.get_mut(id.index()) else {
            return false;
        };
        match task.handle.take() {
            Some(_) => {
                tracing::warn!("Detached task {} '{}'", task.id, task.name);
                true
            }
            None => false,
        }
    }

    /// Block until every task has finished on its own.
    pub fn join(mut self) -> PipelineReport {
        let outcomes = self
            .tasks
            .drain(..)
            .filter_map(|mut t| {
                let handle = t.handle.take()?;
                Some(collect(t.id, &t.name, handle))
            })
            .collect();
        let report = PipelineReport { outcomes };
        if report.is_success() {
            tracing::info!("Pipeline finished: {} tasks", report.outcomes.len());
        } else {
            tracing::warn!(
                "Pipeline finished with {} failed tasks",
                report.failures().count()
            );
        }
        report
    }

    /// Cancel unbounded stages, then wait for everything to drain.
    pub fn shutdown(mut self) -> PipelineReport {
        tracing::info!("Shutting down pipeline");
        self.cancel();
        self.join()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn collect(
    id: TaskId,
    name: &str,
    handle: JoinHandle<PipelineResult<StageSummary>>,
) -> TaskOutcome {
    let result = match handle.join() {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Task {} '{}' panicked: {}", id, name, message);
            Err(PipelineError::transform(name, format!("panicked: {}", message)))
        }
    };
    TaskOutcome {
        id,
        name: name.to_string(),
        result,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::conduit::conduit;
    use crate::pipeline::filters;
    use crate::pipeline::nodes::{MapStage, SourceStage, TeeStage};
    use crate::types::{Transform, Value};

    #[test]
    fn test_spawned_chain_drains_on_shutdown() {
        let (src_tx, src_rx) = conduit("raw");
        let (map_tx, map_rx) = conduit("scaled");

        let mut pipeline = Pipeline::new();
        let src = pipeline
            .spawn(SourceStage::new("ones", || 1.0, src_tx))
            .unwrap();
        pipeline
            .spawn(MapStage::new(filters::scale(3.0), src_rx, map_tx))
            .unwrap();

        assert_eq!(map_rx.recv(), Some(3.0));
        assert_eq!(map_rx.recv(), Some(3.0));

        let topo = pipeline.topology();
        assert_eq!(topo.len(), 2);
        assert_eq!(topo[0].id, src);
        assert_eq!((topo[0].fan_in, topo[0].fan_out), (0, 1));
        assert_eq!((topo[1].fan_in, topo[1].fan_out), (1, 1));

        // Keep reading so nothing stays blocked on a send.
        let reader = std::thread::spawn(move || map_rx.iter().count());
        let report = pipeline.shutdown();
        reader.join().unwrap();

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn test_panicking_stage_reported_as_transform_failure() {
        let (mut in_tx, in_rx) = conduit::<Value>("in");
        let (out_tx, out_rx) = conduit::<Value>("out");
        let boom = Transform::new("boom", |_| panic!("bad value"));

        let mut pipeline = Pipeline::new();
        pipeline.spawn(MapStage::new(boom, in_rx, out_tx)).unwrap();

        // The map panics while handling this value and drops its input.
        let _ = in_tx.send(1.0);
        assert_eq!(out_rx.recv(), None);
        in_tx.close().unwrap();

        let report = pipeline.join();
        assert!(!report.is_success());
        match report.first_failure() {
            Some(PipelineError::TransformFailure { stage, message }) => {
                assert_eq!(stage, "map[boom]");
                assert!(message.contains("bad value"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_wait_for_single_task() {
        let (mut tx, rx) = conduit::<Value>("in");
        let (a_tx, a_rx) = conduit("a");

        let mut pipeline = Pipeline::new();
        let tee = pipeline.spawn(TeeStage::new(rx, vec![a_tx])).unwrap();

        let reader = std::thread::spawn(move || a_rx.iter().collect::<Vec<_>>());
        tx.send(5.0).unwrap();
        tx.close().unwrap();

        let outcome = pipeline.wait(tee).unwrap();
        assert_eq!(outcome.result.unwrap().emitted, 1);
        assert!(pipeline.wait(tee).is_none());
        assert_eq!(reader.join().unwrap(), vec![5.0]);
        assert!(pipeline.join().outcomes.is_empty());
    }

    #[test]
    fn test_detached_task_is_not_joined() {
        let (_blocked_tx, blocked_rx) = conduit::<Value>("never");
        let (out_tx, _out_rx) = conduit::<Value>("out");

        let mut pipeline = Pipeline::new();
        let stuck = pipeline
            .spawn(MapStage::identity(blocked_rx, out_tx))
            .unwrap();

        assert!(pipeline.detach(stuck));
        assert!(!pipeline.detach(stuck));
        assert!(!pipeline.detach(TaskId(9)));
        assert!(pipeline.topology()[0].finished);
        // The map would block forever; join returns because it was detached.
        assert!(pipeline.join().outcomes.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
