//! Owns the workers behind one content script.
//!
//! Every spawned actor listens on a shared broadcast channel; shutdown fires
//! it once and then waits for each tracked task to finish.
use anyhow::Result;
use tokio::{sync::broadcast, task::JoinSet};

use crate::actor::{Actor, ActorHandle, Addr, spawn_actor_with_shutdown};

pub struct ActorSystem {
    workers: JoinSet<Result<()>>,
    stop: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (stop, _) = broadcast::channel(8);
        Self {
            workers: JoinSet::new(),
            stop,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Spawn `actor` wired to this system's stop signal and track its task.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use lantern_actors::{Actor, ActorSystem, Context};
    /// # struct Idle;
    /// # #[async_trait]
    /// # impl Actor for Idle {
    /// #     type Msg = ();
    /// #     async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> { Ok(()) }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let mut system = ActorSystem::new();
    ///     let addr = system.spawn(Idle, 4);
    ///     addr.send(()).await.unwrap();
    ///     system.graceful_shutdown().await.unwrap();
    /// });
    /// ```
    pub fn spawn<A: Actor>(&mut self, actor: A, capacity: usize) -> Addr<A> {
        let ActorHandle { addr, task } =
            spawn_actor_with_shutdown(actor, capacity, Some(self.stop.subscribe()));
        self.workers.spawn(async move { task.await? });
        addr
    }

    /// Signal every worker, then surface the first failure among them.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.stop.send(());
        let mut first_err = None;
        while let Some(joined) = self.workers.join_next().await {
            let outcome = joined.map_err(anyhow::Error::from).and_then(|r| r);
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "actor.system.worker_failed");
                first_err.get_or_insert(e);
            }
        }
        tracing::debug!("actor.system.stopped");
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Context;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Actor for Failing {
        type Msg = ();
        async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> {
            anyhow::bail!("worker broke")
        }
    }

    #[tokio::test]
    async fn shutdown_reports_worker_failure() {
        let mut system = ActorSystem::new();
        let addr = system.spawn(Failing, 2);
        assert_eq!(system.len(), 1);
        addr.send(()).await.unwrap();
        // Let the worker fail before the stop signal races the message.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let err = system.graceful_shutdown().await.unwrap_err();
        assert!(err.to_string().contains("worker broke"));
    }
}
