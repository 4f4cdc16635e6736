//! Runs one client operation against many instances at once.
//!
//! Every instance gets its own worker and its own client, so nothing is
//! shared between workers. Outcomes are returned in input order; a panic in
//! any worker is re-raised in the caller.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::SyncError;
use crate::instance::Instance;

/// Result of running an operation against one instance.
#[derive(Debug)]
pub struct InstanceOutcome<R> {
    pub instance: String,
    pub result: Result<R, SyncError>,
}

impl<R> InstanceOutcome<R> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Build a client for every instance and apply `operation` to each,
/// concurrently.
///
/// Must not be called from inside an async runtime.
pub fn for_each_instance<C, R, M, F>(
    instances: Vec<Instance>,
    client_for: M,
    operation: F,
) -> std::io::Result<Vec<InstanceOutcome<R>>>
where
    M: Fn(Instance) -> Result<C, SyncError> + Send + Sync + 'static,
    F: Fn(&mut C) -> Result<R, SyncError> + Send + Sync + 'static,
    R: Send + 'static,
{
    let client_for = Arc::new(client_for);
    let operation = Arc::new(operation);

    let tasks = instances
        .into_iter()
        .map(|instance| {
            let client_for = Arc::clone(&client_for);
            let operation = Arc::clone(&operation);
            let name = instance.name().to_string();
            let task = move || {
                let mut client = client_for(instance)?;
                operation(&mut client)
            };
            (name, task)
        })
        .collect();

    run_all(tasks)
}

/// Apply `operation` to each already constructed client, concurrently.
pub fn fan_out<C, R, F>(
    clients: Vec<(String, C)>,
    operation: F,
) -> std::io::Result<Vec<InstanceOutcome<R>>>
where
    C: Send + 'static,
    F: Fn(&mut C) -> Result<R, SyncError> + Send + Sync + 'static,
    R: Send + 'static,
{
    let operation = Arc::new(operation);

    let tasks = clients
        .into_iter()
        .map(|(name, mut client)| {
            let operation = Arc::clone(&operation);
            (name, move || operation(&mut client))
        })
        .collect();

    run_all(tasks)
}

fn run_all<R, W>(tasks: Vec<(String, W)>) -> std::io::Result<Vec<InstanceOutcome<R>>>
where
    W: FnOnce() -> Result<R, SyncError> + Send + 'static,
    R: Send + 'static,
{
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let total = tasks.len();
    let mut slots: Vec<Option<InstanceOutcome<R>>> = (0..total).map(|_| None).collect();

    runtime.block_on(async {
        let mut workers = JoinSet::new();
        for (index, (instance, work)) in tasks.into_iter().enumerate() {
            workers.spawn_blocking(move || {
                let result = work();
                (index, InstanceOutcome { instance, result })
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(std::io::Error::other(format!("instance worker aborted: {}", e)));
                }
            }
        }
        Ok(())
    })?;

    Ok(slots.into_iter().flatten().collect())
}
