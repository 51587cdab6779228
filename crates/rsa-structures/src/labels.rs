// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-observation condition and chunk labels

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Label row of a single observation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelEntry {
    /// Experimental category of the observation
    pub condition: String,
    /// Recording session the observation belongs to
    pub chunk: i64,
}

impl LabelEntry {
    pub fn new(condition: impl Into<String>, chunk: i64) -> Self {
        Self {
            condition: condition.into(),
            chunk,
        }
    }
}

/// Ordered label table, one entry per observation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    entries: Vec<LabelEntry>,
}

impl Labels {
    pub fn new(entries: Vec<LabelEntry>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(condition, chunk)| LabelEntry::new(condition, chunk))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LabelEntry] {
        &self.entries
    }

    pub fn conditions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.condition.as_str()).collect()
    }

    pub fn chunks(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.chunk).collect()
    }

    /// Distinct condition names in sorted order
    pub fn unique_conditions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.condition.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Label table restricted to `indices`, in that order.
    /// Callers are responsible for bounds; `Dataset` checks them against the volume.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            entries: indices.iter().map(|&i| self.entries[i].clone()).collect(),
        }
    }
}
