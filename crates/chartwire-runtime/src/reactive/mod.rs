#![forbid(unsafe_code)]

//! Change-notification primitives for the evaluation scope.
//!
//! - [`Listeners`]: an ordered list of weakly held callbacks.
//! - [`Subscription`]: RAII guard that keeps one callback registered.
//!
//! # Architecture
//!
//! Listeners are stored as `Weak` pointers; the only strong reference lives
//! in the [`Subscription`] returned at registration. Dropping the
//! subscription therefore unregisters the callback, and dead entries are
//! compacted lazily the next time the list is snapshotted.
//!
//! Notification works on a snapshot of strong references taken before any
//! callback runs. A callback may drop its own subscription, register new
//! listeners, or mutate shared state while being notified; none of that
//! disturbs the in-flight delivery.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 3. A listener registered during a notification cycle is first notified
//!    in the following cycle.

pub mod subscription;

pub use subscription::{Listeners, Subscription};
