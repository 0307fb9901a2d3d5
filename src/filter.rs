use serde::{Deserialize, Serialize};

use crate::models::Event;

/// Categories offered by the filter sheet before any data has loaded.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Sinema", "Tiyatro", "Konser", "Sergi"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Price {
    Free,
    Paid,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FilterCriteria {
    pub search_text: String,
    pub categories: Vec<String>,
    pub price: Option<Price>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.search_text.trim().is_empty() && self.categories.is_empty() && self.price.is_none()
    }

    /// Adds `label` unless an equal label (after case folding) is selected.
    pub fn select_category(&mut self, label: &str) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        let key = fold_case(label);
        if !self.categories.iter().any(|c| fold_case(c.trim()) == key) {
            self.categories.push(label.to_string());
        }
    }

    /// Adds `label` when it is not selected yet, removes it otherwise.
    pub fn toggle_category(&mut self, label: &str) {
        let key = fold_case(label.trim());
        let before = self.categories.len();
        self.categories.retain(|c| fold_case(c.trim()) != key);
        if self.categories.len() == before {
            self.categories.push(label.trim().to_string());
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        Matcher::new(self).matches(event)
    }
}

/// Criteria with the case folding done once up front.
struct Matcher {
    needle: String,
    categories: Vec<String>,
    price: Option<Price>,
}

impl Matcher {
    fn new(criteria: &FilterCriteria) -> Self {
        Self {
            needle: fold_case(criteria.search_text.trim()),
            categories: criteria
                .categories
                .iter()
                .map(|c| fold_case(c.trim()))
                .collect(),
            price: criteria.price,
        }
    }

    fn matches(&self, event: &Event) -> bool {
        self.matches_text(event) && self.matches_category(event) && self.matches_price(event)
    }

    fn matches_text(&self, event: &Event) -> bool {
        self.needle.is_empty() || fold_case(&event.name).contains(&self.needle)
    }

    fn matches_category(&self, event: &Event) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        match event.category.as_deref() {
            Some(category) => {
                let key = fold_case(category.trim());
                self.categories.iter().any(|c| *c == key)
            }
            None => false,
        }
    }

    fn matches_price(&self, event: &Event) -> bool {
        match self.price {
            None => true,
            Some(Price::Free) => event.is_free,
            Some(Price::Paid) => !event.is_free,
        }
    }
}

/// Returns the events satisfying every active criterion, in input order.
pub fn filter(events: &[Event], criteria: &FilterCriteria) -> Vec<Event> {
    if criteria.is_empty() {
        return events.to_vec();
    }
    let matcher = Matcher::new(criteria);
    events
        .iter()
        .filter(|event| matcher.matches(event))
        .cloned()
        .collect()
}

/// Distinct category labels in first-seen order.
pub fn categories(events: &[Event]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for label in events.iter().filter_map(|e| e.category.as_deref()) {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        let key = fold_case(label);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(label.to_string());
        }
    }
    out
}

/// Lowercases with Turkish dotted/dotless i rules.
pub fn fold_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}
