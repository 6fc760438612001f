use std::collections::HashMap;

/// Per-location visit counts for one logical fetch.
///
/// The initial request is recorded too, so a budget of 0 lets each location
/// be requested exactly once.
#[derive(Debug, Clone, Default)]
pub struct RedirectTracker {
    visits: HashMap<String, u32>,
    max_per_location: u32,
}

impl RedirectTracker {
    pub fn new(max_per_location: u32) -> Self {
        Self {
            visits: HashMap::new(),
            max_per_location,
        }
    }

    /// Record a visit to `key`. Returns `true` when the budget is already
    /// exceeded, in which case the count is left untouched.
    pub fn visit(&mut self, key: &str) -> bool {
        let count = self.visits.entry(key.to_string()).or_insert(0);
        if *count > self.max_per_location {
            return true;
        }
        *count += 1;
        false
    }

    pub fn visits(&self, key: &str) -> u32 {
        self.visits.get(key).copied().unwrap_or(0)
    }

    pub fn max_per_location(&self) -> u32 {
        self.max_per_location
    }
}
