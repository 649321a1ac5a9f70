use crate::domain::catalog::{CatalogEntry, CatalogEntryId};

pub const NAME_MATCH_CONFIDENCE: f64 = 0.95;
pub const ALIAS_MATCH_CONFIDENCE: f64 = 0.90;

/// In-memory view of a contractor's price book, rebuilt per request from the
/// datastore.
///
/// Entries are evaluated in insertion order and the first name or alias hit
/// wins; when several entries could match the same text, catalog ordering is
/// the precedence contract. This is deliberately not a best-match or fuzzy
/// scan — downstream confidence values are calibrated to first-match.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryMatch {
    pub entry: CatalogEntry,
    pub confidence: f64,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn find(&self, id: &CatalogEntryId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Case-insensitive substring scan: entry name (0.95), then each alias
    /// in order (0.90).
    pub fn match_description(&self, description: &str) -> Option<CategoryMatch> {
        let haystack = description.to_lowercase();

        for entry in &self.entries {
            let name = entry.name.to_lowercase();
            if !name.is_empty() && haystack.contains(&name) {
                return Some(CategoryMatch {
                    entry: entry.clone(),
                    confidence: NAME_MATCH_CONFIDENCE,
                });
            }
            for alias in &entry.aliases {
                let alias = alias.to_lowercase();
                if !alias.is_empty() && haystack.contains(&alias) {
                    return Some(CategoryMatch {
                        entry: entry.clone(),
                        confidence: ALIAS_MATCH_CONFIDENCE,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::{CatalogEntry, CatalogEntryId, Unit};

    use super::{Catalog, ALIAS_MATCH_CONFIDENCE, NAME_MATCH_CONFIDENCE};

    fn entry(id: &str, name: &str, aliases: &[&str]) -> CatalogEntry {
        CatalogEntry {
            id: CatalogEntryId(id.to_string()),
            name: name.to_string(),
            unit: Unit::Sqft,
            default_price: Decimal::new(200, 2),
            aliases: aliases.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn matches_name_as_case_insensitive_substring() {
        let catalog = Catalog::new(vec![entry("cat-1", "Plank Flooring", &["lvp"])]);

        let matched =
            catalog.match_description("new plank flooring in the kitchen").expect("match");
        assert_eq!(matched.entry.id.0, "cat-1");
        assert_eq!(matched.confidence, NAME_MATCH_CONFIDENCE);
    }

    #[test]
    fn matches_alias_with_lower_confidence() {
        let catalog =
            Catalog::new(vec![entry("cat-1", "Plank Flooring", &["lvp", "vinyl plank"])]);

        let matched = catalog.match_description("replacing the lvp in the hall").expect("match");
        assert_eq!(matched.entry.id.0, "cat-1");
        assert_eq!(matched.confidence, ALIAS_MATCH_CONFIDENCE);
    }

    #[test]
    fn first_entry_in_insertion_order_wins_overlap() {
        let catalog = Catalog::new(vec![
            entry("cat-1", "Flooring", &[]),
            entry("cat-2", "Plank Flooring", &[]),
        ]);

        let matched = catalog.match_description("800 sf of plank flooring").expect("match");
        assert_eq!(matched.entry.id.0, "cat-1");
    }

    #[test]
    fn no_hit_returns_none() {
        let catalog = Catalog::new(vec![entry("cat-1", "Plank Flooring", &["lvp"])]);
        assert_eq!(catalog.match_description("paint the living room"), None);
    }
}
