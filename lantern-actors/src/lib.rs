//! Minimal actor runtime: bounded mailboxes, request/reply, cooperative shutdown.
//!
//! Lantern runs its privileged side-channel worker as an actor so the
//! content-script side never touches the network directly; it only ever
//! holds an [`actor::Addr`].
pub mod actor;
pub mod system;

pub use actor::{Actor, ActorHandle, Addr, Context, spawn_actor, spawn_actor_with_shutdown};
pub use system::ActorSystem;
