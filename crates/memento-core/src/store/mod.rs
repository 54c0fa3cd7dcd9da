//! Durable local storage.
//!
//! Holds the cache of server notes, the outbox of notes created offline,
//! and the signed-in session. Survives restarts.

mod repository;

pub use repository::LocalStore;
