//! Shareable Links
//!
//! Persists grid and multi-track configurations under short random ids.
//!
//! ## Components
//!
//! - **hash**: normalized share content and its SHA-256 state hash
//! - **id**: random short id generation
//! - **repository**: [`ShareRepository`] with SQLite and in-memory stores
//! - **service**: find-or-create and resolution
//!
//! ```text
//! state → normalize → hash → lookup(hash, kind) → compare content
//!                                  │ miss
//!                                  └→ random id (bounded retries) → insert
//! ```

mod error;
mod hash;
mod id;
mod repository;
mod service;

pub use error::{ShareError, ShareResult};
pub use hash::{parse_cell_key, CellData, GridState, MultiTrackState, ShareContent, ShareKind};
pub use id::{generate_share_id, is_valid_share_id};
pub use repository::{MemoryShareRepository, ShareRecord, ShareRepository, SqliteShareRepository};
pub use service::{ShareIdPolicy, ShareOutcome, ShareService};
