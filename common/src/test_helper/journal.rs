// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::sync::{Arc, Mutex};

/// An ordered, shareable log of calls made to test doubles.
///
/// Several fakes can write into the same journal so a test can assert the
/// order in which different collaborators were called.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Position of the first entry that starts with `prefix`.
    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }

    /// Position of the last entry that starts with `prefix`.
    pub fn last_position_of(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().rposition(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}
