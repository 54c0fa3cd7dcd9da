//! # memento-api
//!
//! HTTP client for the Memento notes API.
//!
//! ## Features
//!
//! - **Note CRUD**: list, get, create, partial update and delete over JSON
//! - **Bearer authentication**: every note call takes the session token explicitly
//! - **Email sign-in/sign-up**: obtains the token and user for a new session
//!
//! A `401` response is reported as [`Error::Unauthorized`]; what to do about it
//! (tearing down local session state) is left to the caller.
//!
//! ## Quick Start
//!
//! ```ignore
//! use memento_api::{NoteClient, NoteDraft};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NoteClient::new("https://api.example.com")?;
//!     let auth = client.sign_in_with_email("me@example.com", "secret").await?;
//!
//!     let draft = NoteDraft::new("Groceries", "Milk, eggs");
//!     let note = client.create(&auth.token, &draft, None).await?;
//!     println!("Created {}", note.id);
//!
//!     for note in client.list_mine(&auth.token).await? {
//!         println!("{}: {}", note.created_at, note.title);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod auth;
mod client;
mod error;
mod note;

pub use auth::{AuthResponse, User};
pub use client::{IDEMPOTENCY_HEADER, NoteClient};
pub use error::{Error, Result};
pub use note::{Note, NoteDraft, NoteUpdate};
