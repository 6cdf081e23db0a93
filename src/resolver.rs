use log::{debug, warn};
use std::collections::HashMap;

/// Names the backend is known to index under a different code.
const KNOWN_CODES: [(&str, &str); 3] = [
    ("United States of America", "USA"),
    ("U.S.A.", "USA"),
    ("USA", "USA"),
];

/// Maps map labels (full names or abbreviations) to backend country codes.
#[derive(Debug, Clone)]
pub struct CountryResolver {
    codes: HashMap<String, String>,
}

impl Default for CountryResolver {
    fn default() -> Self {
        let codes = KNOWN_CODES
            .iter()
            .map(|(name, code)| (normalize(name), code.to_string()))
            .collect();
        Self { codes }
    }
}

impl CountryResolver {
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut resolver = Self::default();
        for (name, code) in overrides {
            resolver.insert(name, code);
        }
        resolver
    }

    pub fn insert(&mut self, name: &str, code: &str) {
        self.codes.insert(normalize(name), code.trim().to_uppercase());
    }

    /// Never fails: unknown names come back upper-cased.
    pub fn resolve(&self, name: &str) -> String {
        if let Some(code) = self.codes.get(&normalize(name)) {
            debug!("Resolved {:?} to {}", name, code);
            return code.clone();
        }

        let guess = name.trim().to_uppercase();
        warn!("No country code mapping for {:?}, guessing {:?}", name, guess);
        guess
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
