//! Column identifier normalization for BigQuery.
//!
//! BigQuery load jobs with `column_name_character_map=V2` rewrite incoming
//! Parquet column names; mirroring those rules ahead of time keeps the
//! generated export aliases and the inferred schema in agreement with what
//! the destination will actually create.

use std::collections::HashSet;

/// Prefixes BigQuery reserves for pseudo-columns. Matched case-insensitively
/// against the already-lowercased candidate.
const RESERVED_PREFIXES: [&str; 3] = ["_table_", "_file_", "_partition_"];

/// BigQuery column name length limit.
const MAX_NAME_LENGTH: usize = 300;

/// Normalize a raw source column name into a BigQuery-safe identifier.
///
/// Pure and total. Rules, in order: characters outside `[A-Za-z0-9_]` become
/// `_`; the result is lowercased; a leading digit gets a `_` prefix; a
/// reserved prefix gets a `_` suffix. An empty input yields `_`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    if out.is_empty() {
        return "_".to_string();
    }

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }

    if out.len() > MAX_NAME_LENGTH {
        out.truncate(MAX_NAME_LENGTH);
    }

    if RESERVED_PREFIXES.iter().any(|p| out.starts_with(p)) {
        out.push('_');
    }

    out
}

/// Table-scoped destination name allocator.
///
/// Assigns normalized names in source column order; on collision with an
/// already-assigned name it appends `_2`, `_3`, ... until unique, giving a
/// bijection from source names to destination names within one table.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `raw` and reserve a unique destination name for it.
    pub fn assign(&mut self, raw: &str) -> String {
        let base = normalize(raw);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = 2u32;
        loop {
            // a bare underscore base yields `_2`, not `__2`
            let candidate = if base == "_" {
                format!("_{}", n)
            } else {
                format!("{}_{}", base, n)
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
