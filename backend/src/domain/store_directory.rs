//! Store master data and the store/district filter.

use shared::StoreInfo;
use std::collections::HashMap;

/// Strip any leading non-digit prefix from a store identifier.
///
/// The upstream feed prefixes store numbers with a brand code in some
/// endpoints and not others. The stripped form is for display and grouping
/// only; API calls always use the identifier exactly as the feed issued it.
pub fn display_store_number(raw: &str) -> &str {
    let digits_at = raw.find(|c: char| c.is_ascii_digit()).unwrap_or(raw.len());
    &raw[digits_at..]
}

/// In-memory index over the store master list.
#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    stores: Vec<StoreInfo>,
    by_number: HashMap<String, usize>,
}

impl StoreDirectory {
    pub fn new(stores: Vec<StoreInfo>) -> Self {
        let by_number = stores
            .iter()
            .enumerate()
            .map(|(idx, s)| (display_store_number(&s.store_nbr).to_string(), idx))
            .collect();
        Self { stores, by_number }
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn stores(&self) -> &[StoreInfo] {
        &self.stores
    }

    /// Look a store up by number, tolerating prefixed or bare forms.
    pub fn get(&self, store_number: &str) -> Option<&StoreInfo> {
        self.by_number
            .get(display_store_number(store_number))
            .map(|&idx| &self.stores[idx])
    }

    pub fn district_of(&self, store_number: &str) -> Option<&str> {
        self.get(store_number).map(|s| s.district.as_str())
    }

    pub fn state_of(&self, store_number: &str) -> Option<&str> {
        self.get(store_number).map(|s| s.state.as_str())
    }

    /// Distinct district names, sorted.
    pub fn districts(&self) -> Vec<String> {
        let mut districts: Vec<String> = self
            .stores
            .iter()
            .map(|s| s.district.clone())
            .filter(|d| !d.is_empty())
            .collect();
        districts.sort();
        districts.dedup();
        districts
    }

    /// Distinct state names, sorted.
    pub fn states(&self) -> Vec<String> {
        let mut states: Vec<String> = self
            .stores
            .iter()
            .map(|s| s.state.clone())
            .filter(|s| !s.is_empty())
            .collect();
        states.sort();
        states.dedup();
        states
    }

    /// Raw store identifiers for every store in a district, as the feed
    /// issued them (prefix intact).
    pub fn raw_numbers_in_district(&self, district: &str) -> Vec<String> {
        self.stores
            .iter()
            .filter(|s| s.district == district)
            .map(|s| s.store_nbr.clone())
            .collect()
    }
}

/// Scope the dashboard is currently viewing. Store and district selections
/// are mutually exclusive; the service enforces that picking one clears the
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreFilter {
    #[default]
    All,
    Store(String),
    District(String),
}

impl StoreFilter {
    pub fn is_all(&self) -> bool {
        matches!(self, StoreFilter::All)
    }

    /// Whether a record with this store number falls inside the filter.
    /// Numbers are compared in stripped form so prefixed and bare
    /// identifiers match each other.
    pub fn matches(&self, store_number: &str, directory: &StoreDirectory) -> bool {
        match self {
            StoreFilter::All => true,
            StoreFilter::Store(wanted) => {
                display_store_number(wanted) == display_store_number(store_number)
            }
            StoreFilter::District(wanted) => {
                directory.district_of(store_number) == Some(wanted.as_str())
            }
        }
    }

    /// The raw store identifiers to send upstream for this filter. Empty
    /// means "no store constraint".
    pub fn raw_store_numbers(&self, directory: &StoreDirectory) -> Vec<String> {
        match self {
            StoreFilter::All => Vec::new(),
            StoreFilter::Store(number) => vec![number.clone()],
            StoreFilter::District(district) => directory.raw_numbers_in_district(district),
        }
    }
}
