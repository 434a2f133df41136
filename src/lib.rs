//! # fanring
//!
//! **fanring** is a cooperative update-propagation scheduler for Rust.
//!
//! It fans a sequence of state snapshots out to an ordered set of registered
//! subscribers, guaranteeing each subscriber observes every accepted state
//! transition exactly once, in a stable global order, without redundant work
//! and without one subscriber's failure blocking others. The crate is
//! designed as a building block for binding layers (UI frameworks, caches,
//! reactive views) that need deterministic fan-out over a shared store.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐      ┌─────────────────────────────────────────┐
//!     │    Store     │      │  Scheduler (one instance per fan-out)   │
//!     │ (state +     │─────►│  - pending buffer (coalesces bursts)    │
//!     │  dispatch)   │submit│  - Ring (arena-backed circular queue)   │
//!     └──────▲───────┘      │  - Reentry guard (working flag)         │
//!            │dispatch      │  - Executor (micro + task lanes)        │
//!            │              │  - FaultSink (isolated panics)          │
//!     ┌──────┴───────┐      └──────┬──────────────┬──────────────┬────┘
//!     │  host code   │             ▼              ▼              ▼
//!     └──────────────┘      ┌──────────┐   ┌──────────┐   ┌──────────┐
//!                           │ Observe  │   │ Observe  │   │ Observe  │
//!                           │ (node 1) │   │ (node 2) │   │ (node N) │
//!                           └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! ### One pass
//! ```text
//! submit(snapshot)
//!   ├─► pending buffer (identical snapshot? dropped)
//!   └─► task lane: start_pass
//!         ├─► coalesce: keep latest pending snapshot, discard the rest
//!         ├─► ring.current = snapshot
//!         └─► traverse from cursor.next, one lap:
//!               ├─ revoked node      ─► reap lazily
//!               ├─ already stamped   ─► skip (no redundant work)
//!               ├─ live + behind     ─► invoke under catch_unwind,
//!               │                       stamp on success
//!               └─ nested submit?    ─► pause; micro lane resumes after
//!                                       the nested frame unwinds
//!         after the lap: faults ─► FaultSink (one deferred unit each),
//!                        pending again non-empty ─► next pass
//! ```
//!
//! ## Features
//! | Area              | Description                                                          | Key types / traits                     |
//! |-------------------|----------------------------------------------------------------------|----------------------------------------|
//! | **Subscribers**   | Register callbacks, tear them down, probe staleness.                 | [`Observe`], [`FnObserver`], [`Subscription`] |
//! | **Intake**        | Snapshot submission with identity dedup and burst coalescing.        | [`Scheduler::submit`]                  |
//! | **Dispatch**      | Pass-through to an attached state container.                         | [`Store`], [`CellStore`], [`Scheduler::dispatch`] |
//! | **Reentrancy**    | Nested updates pause the pass and resume deterministically.          | [`Scheduler::begin_update`], [`UpdateScope`] |
//! | **Faults**        | Per-subscriber panic isolation, asynchronous re-raise.               | [`FaultSink`], [`PanicSink`], [`CollectSink`], [`PassFault`] |
//! | **Configuration** | Per-instance settings and assembly.                                  | [`Config`], [`SchedulerBuilder`]       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Scheduling model
//!
//! Single-threaded and cooperative: the scheduler never blocks, never spawns
//! threads, and runs passes only while the host drives
//! [`Scheduler::run_until_idle`]. Deferred work lives on two FIFO lanes —
//! pass continuations on the micro lane, pass starts and fault re-raises on
//! the task lane — and the micro lane drains fully before each task-lane
//! unit, so a paused pass always finishes before the next one starts.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use fanring::{Config, FnObserver, Scheduler};
//!
//! let sched: Scheduler<u32> = Scheduler::new(Config::default());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let sub = sched.subscribe(FnObserver::rc("collector", move |snap: &Rc<u32>| {
//!     log.borrow_mut().push(**snap);
//! }));
//!
//! sched.submit(Rc::new(1));
//! sched.submit(Rc::new(2)); // supersedes 1 before the pass starts
//! sched.run_until_idle();
//!
//! // Bursts coalesce: only the latest snapshot was delivered.
//! assert_eq!(seen.borrow().as_slice(), &[2]);
//! assert!(!sub.is_behind());
//!
//! sub.revoke();
//! ```

mod core;
mod error;
mod exec;
mod observers;
mod ring;
mod store;

// ---- Public re-exports ----

pub use crate::core::{
    CollectSink, Config, FaultSink, PanicSink, PassFault, Scheduler, SchedulerBuilder,
    Subscription, UpdateScope, WeakScheduler,
};
pub use error::SchedulerError;
pub use observers::{FnObserver, Observe};
pub use store::{CellStore, Store};

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
