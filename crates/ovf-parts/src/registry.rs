//! Part manifest allocation.

use std::collections::BTreeMap;

use ovf_job::{Part, PartKey};

/// Allocates new parts into a job's part manifest.
///
/// Keys grow monotonically from the largest existing key and are never
/// reused. The registry holds the only mutable borrow of the manifest for
/// the duration of a pass.
#[derive(Debug)]
pub struct PartRegistry<'a> {
    parts: &'a mut BTreeMap<PartKey, Part>,
    name_prefix: &'a str,
    created: usize,
}

impl<'a> PartRegistry<'a> {
    /// Wrap a part manifest. New parts are named `{name_prefix}{key}`.
    pub fn new(parts: &'a mut BTreeMap<PartKey, Part>, name_prefix: &'a str) -> Self {
        Self {
            parts,
            name_prefix,
            created: 0,
        }
    }

    /// Key the next allocation will use: largest existing key + 1, or 1.
    ///
    /// `None` once the largest key is [`PartKey::MAX`].
    pub fn next_key(&self) -> Option<PartKey> {
        match self.parts.keys().next_back() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    /// Register a new part and return its key, or `None` if keys are exhausted.
    pub fn allocate(&mut self) -> Option<PartKey> {
        let key = self.next_key()?;
        self.parts.insert(
            key,
            Part {
                name: format!("{}{key}", self.name_prefix),
            },
        );
        self.created += 1;
        Some(key)
    }

    /// Parts allocated through this registry.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Total parts in the manifest.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Is the manifest empty?
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
