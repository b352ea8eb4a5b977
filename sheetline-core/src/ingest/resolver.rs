//! Store resolution by normalized store number

use std::collections::HashMap;

use super::normalize::normalize_store_token;
use crate::domain::{Cell, Store};

/// Outcome of resolving one store cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// The cell carries no digits at all (blank or separator row)
    NoToken,
    /// Digits present but no store has that number
    Unknown,
    Found(&'a Store),
}

/// Read-only index over the store directory
#[derive(Debug, Default)]
pub struct StoreResolver {
    by_number: HashMap<String, Store>,
}

impl StoreResolver {
    /// Index stores by their normalized number
    ///
    /// Stores without a usable number are left out. If two stores share a
    /// number the later one wins.
    pub fn new(stores: Vec<Store>) -> Self {
        let by_number = stores
            .into_iter()
            .filter_map(|store| {
                let key = normalize_store_token(&Cell::text(store.number.as_str()));
                (!key.is_empty()).then_some((key, store))
            })
            .collect();
        Self { by_number }
    }

    /// Resolve a raw store cell
    pub fn resolve(&self, cell: &Cell) -> Resolution<'_> {
        let token = normalize_store_token(cell);
        if token.is_empty() {
            return Resolution::NoToken;
        }
        match self.by_number.get(&token) {
            Some(store) => Resolution::Found(store),
            None => Resolution::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StoreStatus;
    use uuid::Uuid;

    fn resolver() -> StoreResolver {
        StoreResolver::new(vec![
            Store::new(Uuid::new_v4(), "0042", "Shopping Norte"),
            Store::new(Uuid::new_v4(), "7", "Centro").with_status(StoreStatus::Inactive),
        ])
    }

    #[test]
    fn test_resolves_equivalent_tokens() {
        let resolver = resolver();
        for cell in [Cell::from("42"), Cell::from("Loja 042"), Cell::Number(42.0)] {
            match resolver.resolve(&cell) {
                Resolution::Found(store) => assert_eq!(store.name, "Shopping Norte"),
                other => panic!("expected a store for {:?}, got {:?}", cell, other),
            }
        }
    }

    #[test]
    fn test_inactive_stores_still_resolve() {
        assert!(matches!(resolver().resolve(&Cell::from("007")), Resolution::Found(_)));
    }

    #[test]
    fn test_unknown_and_missing_tokens() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(&Cell::from("99")), Resolution::Unknown);
        assert_eq!(resolver.resolve(&Cell::from("Total")), Resolution::NoToken);
        assert_eq!(resolver.resolve(&Cell::Empty), Resolution::NoToken);
    }

    #[test]
    fn test_names_are_never_used() {
        assert_eq!(resolver().resolve(&Cell::from("Centro")), Resolution::NoToken);
    }
}
