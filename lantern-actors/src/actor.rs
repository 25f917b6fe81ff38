use anyhow::{Result, anyhow};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    pub stop: bool,
}

impl<A: Actor> Context<A> {
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Request a graceful stop after processing the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the receiver is dropped.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Send a message carrying a reply slot and await the answer.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use lantern_actors::actor::{self, Actor, Context};
    /// # use tokio::sync::oneshot;
    /// struct Doubler;
    /// struct Double(u32, oneshot::Sender<u32>);
    ///
    /// #[async_trait]
    /// impl Actor for Doubler {
    ///     type Msg = Double;
    ///     async fn handle(&mut self, Double(n, reply): Double, ctx: &mut Context<Self>) -> Result<()> {
    ///         let _ = reply.send(n * 2);
    ///         ctx.stop();
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Doubler, 4);
    ///     let got = addr.ask(|reply| Double(21, reply)).await.unwrap();
    ///     assert_eq!(got, 42);
    ///     drop(addr);
    ///     task.await.unwrap().unwrap();
    /// });
    /// ```
    pub async fn ask<R, F>(&self, make: F) -> Result<R>
    where
        F: FnOnce(oneshot::Sender<R>) -> A::Msg,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx))
            .await
            .map_err(|_| anyhow!("actor mailbox closed"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("actor dropped the reply without answering"))
    }

    /// Bounded mailbox capacity.
    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - all senders are dropped
/// - `ctx.stop()` is called
///
/// ```
/// # use anyhow::Result;
/// # use async_trait::async_trait;
/// # use lantern_actors::actor::{self, Actor, Context};
/// # struct Accumulator(u8);
/// # #[async_trait]
/// # impl Actor for Accumulator {
/// #     type Msg = u8;
/// #     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
/// #         self.0 += msg;
/// #         if self.0 >= 5 {
/// #             ctx.stop();
/// #         }
/// #         Ok(())
/// #     }
/// # }
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Accumulator(0), 8);
///     assert_eq!(addr.capacity(), 8);
///     addr.send(2).await.unwrap();
///     addr.send(3).await.unwrap();
///     drop(addr);
///     task.await.unwrap().unwrap();
/// });
/// ```
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], but the actor also stops when `shutdown` fires.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    let addr = Addr(tx);
    let ctx = Context {
        addr: addr.clone(),
        stop: false,
    };
    let task = tokio::spawn(run_loop(actor, rx, ctx, shutdown));
    ActorHandle { addr, task }
}

async fn run_loop<A: Actor>(
    mut actor: A,
    mut rx: mpsc::Receiver<A::Msg>,
    mut ctx: Context<A>,
    shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    let actor_type = std::any::type_name::<A>();
    tracing::debug!(actor = actor_type, "actor.started");

    let Some(mut shutdown_rx) = shutdown else {
        while let Some(msg) = rx.recv().await {
            step(&mut actor, msg, &mut ctx, actor_type).await?;
            if ctx.stop {
                break;
            }
        }
        tracing::debug!(actor = actor_type, "actor.stopped");
        return Ok(());
    };

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!(actor = actor_type, "actor.shutdown");
                break;
            }
            maybe_msg = rx.recv() => {
                let Some(msg) = maybe_msg else { break };
                step(&mut actor, msg, &mut ctx, actor_type).await?;
                if ctx.stop {
                    break;
                }
            }
        }
    }
    tracing::debug!(actor = actor_type, "actor.stopped");
    Ok(())
}

async fn step<A: Actor>(
    actor: &mut A,
    msg: A::Msg,
    ctx: &mut Context<A>,
    actor_type: &'static str,
) -> Result<()> {
    if let Err(e) = actor.handle(msg, ctx).await {
        tracing::error!(actor = actor_type, error = ?e, "actor returned error; stopping");
        return Err(e);
    }
    Ok(())
}
