//! Persistence: the save codec and the key-value backends it is written through.
//!
//! # Invariants
//! - A save holds the player, the held token, the movement mode and the full
//!   override store; nothing else.
//! - Malformed or tampered saves decode to [`PersistError::CorruptSave`],
//!   which callers treat as "no save".
//! - Loading replaces the override store, it never merges into it.

mod codec;
mod store;

pub use codec::{PersistError, deserialize, serialize};
pub use store::{
    FileBackend, IntegrityManifest, ManifestEntry, MemoryBackend, SaveBackend, SaveSlot,
    StoreError,
};
