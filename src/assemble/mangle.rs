//! Identifier mangling for trusted code
//!
//! Trusted fragments share one interpreter namespace with the attempt. Any
//! identifier they spell with [`RESERVED_PREFIX`] is rewritten to a name the
//! attempt cannot guess. Rewrites are memoized per `(salt, name)` so every
//! fragment mangled with the same salt agrees on the same names.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Identifiers starting with this prefix are private to trusted code.
pub const RESERVED_PREFIX: &str = "__rozelle_";

const TOKEN_HEX_LEN: usize = 16;

/// Append-only `(salt, name) -> mangled name` table.
///
/// Construct one per process and share it; entries are never invalidated.
#[derive(Debug, Default)]
pub struct MangleCache {
    entries: Mutex<HashMap<(u64, String), String>>,
}

impl MangleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mangled form of `name` under `salt`, created on first use.
    pub fn mangle(&self, salt: u64, name: &str) -> String {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            // Entries are written whole under the lock; a panic elsewhere
            // cannot leave one half-inserted.
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .entry((salt, name.to_string()))
            .or_insert_with(|| fresh_name(name))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fresh_name(name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("_{}{}", &token[..TOKEN_HEX_LEN], name)
}

pub fn is_reserved(identifier: &str) -> bool {
    identifier.starts_with(RESERVED_PREFIX)
}
