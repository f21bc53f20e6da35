//! Guard against re-surfacing companies the user has already seen.
//!
//! Keys are normalized websites and company names. A candidate is a duplicate
//! when one of its keys matches exactly, or when a variant of its company name
//! contains (or is contained in) any known key. Short keys never match by
//! containment.

use std::collections::HashSet;

use tracing::{info, warn};

use leadscout_common::{name_key, website_key, Lead};

use crate::history::HistoryStore;

#[derive(Debug, Clone)]
pub struct DedupGuard {
    keys: HashSet<String>,
    min_fuzzy_len: usize,
}

/// Spellings of a company name worth comparing: as given, without a
/// trailing ", clause", and without quote characters.
pub fn name_variants(name: &str) -> Vec<String> {
    let Some(key) = name_key(name) else {
        return Vec::new();
    };
    let mut variants = vec![key.clone()];

    if let Some((head, _)) = key.split_once(',') {
        let head = head.trim();
        if !head.is_empty() {
            variants.push(head.to_string());
        }
    }

    let unquoted: String = key
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '“' | '”' | '«' | '»' | '‘' | '’'))
        .collect();
    let unquoted = unquoted.trim().to_string();
    if !unquoted.is_empty() {
        variants.push(unquoted);
    }

    let mut unique: Vec<String> = Vec::with_capacity(variants.len());
    for v in variants {
        if !unique.contains(&v) {
            unique.push(v);
        }
    }
    unique
}

fn lead_keys(lead: &Lead) -> impl Iterator<Item = String> {
    lead.website()
        .and_then(website_key)
        .into_iter()
        .chain(name_key(lead.company_name()))
}

impl DedupGuard {
    pub fn new(min_fuzzy_len: usize) -> Self {
        Self {
            keys: HashSet::new(),
            min_fuzzy_len,
        }
    }

    /// Guard seeded from already-known leads.
    pub fn from_leads<'a>(leads: impl IntoIterator<Item = &'a Lead>, min_fuzzy_len: usize) -> Self {
        let mut guard = Self::new(min_fuzzy_len);
        for lead in leads {
            guard.record(lead);
        }
        guard
    }

    /// Build the guard from the user's most recent history. A failing store
    /// yields an empty guard; the run goes on.
    pub async fn load(
        history: &dyn HistoryStore,
        user_id: &str,
        limit: usize,
        min_fuzzy_len: usize,
    ) -> Self {
        match history.query(user_id, limit).await {
            Ok(leads) => {
                let guard = Self::from_leads(leads.iter().take(limit), min_fuzzy_len);
                info!(user_id, history = leads.len(), keys = guard.len(), "Dedup guard loaded");
                guard
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load history, dedup guard starts empty");
                Self::new(min_fuzzy_len)
            }
        }
    }

    pub fn is_duplicate(&self, lead: &Lead) -> bool {
        if lead_keys(lead).any(|k| self.keys.contains(&k)) {
            return true;
        }
        name_variants(lead.company_name())
            .iter()
            .any(|variant| self.contains_fuzzy(variant))
    }

    fn contains_fuzzy(&self, variant: &str) -> bool {
        if variant.chars().count() < self.min_fuzzy_len {
            return false;
        }
        self.keys.iter().any(|key| {
            key.chars().count() >= self.min_fuzzy_len
                && (key.contains(variant) || variant.contains(key.as_str()))
        })
    }

    /// Remember an accepted lead. Keys are never removed.
    pub fn record(&mut self, lead: &Lead) {
        self.keys.extend(lead_keys(lead));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_common::{Entity, Platform};

    fn lead(name: &str, website: Option<&str>) -> Lead {
        let mut entity = Entity::new(name);
        entity.website = website.map(str::to_string);
        Lead::new(entity, Platform::Maps)
    }

    #[test]
    fn exact_website_and_name_match() {
        let guard = DedupGuard::from_leads([&lead("Acme Gym", Some("https://www.acme.com/"))], 4);
        assert!(guard.is_duplicate(&lead("Other", Some("acme.com"))));
        assert!(guard.is_duplicate(&lead("  ACME GYM ", None)));
        assert!(!guard.is_duplicate(&lead("Blue Yoga", Some("blueyoga.es"))));
    }

    #[test]
    fn fuzzy_containment_works_both_ways() {
        let guard = DedupGuard::from_leads([&lead("Acme Gym Madrid", None)], 4);
        assert!(guard.is_duplicate(&lead("Acme Gym", None)));

        let guard = DedupGuard::from_leads([&lead("Acme", None)], 4);
        assert!(guard.is_duplicate(&lead("Acme Gym Madrid", None)));
    }

    #[test]
    fn short_keys_never_match_fuzzily() {
        let guard = DedupGuard::from_leads([&lead("Gym", None)], 4);
        assert!(!guard.is_duplicate(&lead("Acme Gym", None)));
        assert!(guard.is_duplicate(&lead("gym", None)));
    }

    #[test]
    fn name_variants_strip_clause_and_quotes() {
        assert_eq!(
            name_variants("\"Acme\" Gym, S.L."),
            vec!["\"acme\" gym, s.l.", "\"acme\" gym", "acme gym, s.l."]
        );
        assert_eq!(name_variants("Acme"), vec!["acme"]);
        assert!(name_variants("  ").is_empty());
    }

    #[test]
    fn comma_clause_variant_matches_history() {
        let guard = DedupGuard::from_leads([&lead("Acme Fitness Club", None)], 4);
        assert!(guard.is_duplicate(&lead("Acme Fitness Club, Sucursal Norte", None)));
    }

    #[test]
    fn check_is_idempotent_and_record_only_grows() {
        let mut guard = DedupGuard::new(4);
        let acme = lead("Acme Gym", Some("acme.com"));
        assert!(!guard.is_duplicate(&acme));
        assert!(!guard.is_duplicate(&acme));
        assert!(guard.is_empty());

        guard.record(&acme);
        assert_eq!(guard.len(), 2);
        guard.record(&acme);
        assert_eq!(guard.len(), 2);
        assert!(guard.is_duplicate(&acme));
        assert!(guard.is_duplicate(&acme));
    }
}
