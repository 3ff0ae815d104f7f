//! Operation Registry

use crate::operation::Operation;
use abacus_core::{CalcError, CalcResult};
use std::collections::{HashMap, HashSet};

/// Canonical form of an operation name: trimmed and lower-cased.
pub fn standardize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name → operation mapping consulted by the tokenizer and parser
#[derive(Debug, Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, Operation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operation` under `name`.
    ///
    /// Names are stored as given; lookups fall back to the standardized form.
    /// An existing entry is never replaced.
    pub fn register(&mut self, name: &str, operation: Operation) -> CalcResult<()> {
        if name.trim().is_empty() {
            return Err(CalcError::InvalidOperation(
                "operation name must not be empty".to_string(),
            ));
        }
        if operation.name().trim().is_empty() {
            return Err(CalcError::InvalidOperation(format!(
                "operation registered as '{}' has no name",
                name
            )));
        }
        if self.operations.contains_key(name) {
            return Err(CalcError::DuplicateName(name.to_string()));
        }
        self.operations.insert(name.to_string(), operation);
        Ok(())
    }

    pub fn with_operation(mut self, name: &str, operation: Operation) -> CalcResult<Self> {
        self.register(name, operation)?;
        Ok(self)
    }

    /// Exact match first, then the standardized name.
    pub fn lookup(&self, name: &str) -> Option<&Operation> {
        self.operations
            .get(name)
            .or_else(|| self.operations.get(&standardize_name(name)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every registered name, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a single entry by its exact name.
    pub fn unregister(&mut self, name: &str) -> Option<Operation> {
        self.operations.remove(name)
    }

    /// Remove every entry whose operation is `operation`, returning the names
    /// that were removed.
    pub fn unregister_matching(&mut self, operation: &Operation) -> Vec<String> {
        let names: Vec<String> = self
            .operations
            .iter()
            .filter(|(_, op)| op.same_as(operation))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &names {
            self.operations.remove(name);
        }
        names
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registered names resembling `name`, best match first.
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let query = standardize_name(name);
        if query.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<(String, usize)> = self
            .operations
            .keys()
            .filter_map(|candidate| {
                let score = similarity_score(&query, &standardize_name(candidate));
                (score > 0).then(|| (candidate.clone(), score))
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }
}

fn similarity_score(query: &str, candidate: &str) -> usize {
    let mut score = 0;

    if candidate.starts_with(query) {
        score += 100;
    } else if candidate.contains(query) {
        score += 50;
    } else if query.contains(candidate) {
        score += 30;
    }

    let query_chars: HashSet<char> = query.chars().collect();
    let candidate_chars: HashSet<char> = candidate.chars().collect();
    let common = query_chars.intersection(&candidate_chars).count();
    // Single shared symbol characters are noise
    if common * 2 > candidate_chars.len() {
        score += common * 2;
    }

    let len_diff = query.len().abs_diff(candidate.len());
    if len_diff < 5 && score > 0 {
        score += 5 - len_diff;
    }

    score
}
