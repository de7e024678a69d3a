//! Listing search: independent predicates AND-combined, then an optional price sort.

use crate::models::Listing;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Keep input order
    #[default]
    None,
    PriceAscending,
    PriceDescending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "relevancia" => Ok(SortOrder::None),
            "price-asc" | "price-ascending" | "precoasc" => Ok(SortOrder::PriceAscending),
            "price-desc" | "price-descending" | "precodesc" => Ok(SortOrder::PriceDescending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Search criteria; every absent field is a wildcard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// OR-combined, case-insensitive substrings of the neighborhood
    pub neighborhood_terms: Vec<String>,
    /// Exact property type
    pub property_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_parking_spaces: Option<u32>,
    pub sort: SortOrder,
}

impl Criteria {
    pub fn with_neighborhoods(mut self, raw: &str) -> Self {
        self.neighborhood_terms = parse_terms(raw);
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.terms().next().is_none()
            && self.property_type().is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_bedrooms.is_none()
            && self.min_parking_spaces.is_none()
            && self.sort == SortOrder::None
    }

    fn terms(&self) -> impl Iterator<Item = String> + '_ {
        self.neighborhood_terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }

    fn property_type(&self) -> Option<&str> {
        self.property_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Whether `listing` passes every provided filter dimension
    pub fn matches(&self, listing: &Listing) -> bool {
        let terms: Vec<String> = self.terms().collect();
        self.matches_with_terms(listing, &terms)
    }

    fn matches_with_terms(&self, listing: &Listing, terms: &[String]) -> bool {
        if !terms.is_empty() {
            let neighborhood = listing
                .location
                .neighborhood
                .as_deref()
                .map(str::to_lowercase);
            let hit = neighborhood
                .map(|n| terms.iter().any(|term| n.contains(term.as_str())))
                .unwrap_or(false);
            if !hit {
                return false;
            }
        }

        if let Some(kind) = self.property_type() {
            if listing.property_type.as_deref() != Some(kind) {
                return false;
            }
        }

        // Unset numeric attributes count as zero.
        let price = listing.price.unwrap_or(0.0);
        if self.min_price.map_or(false, |min| price < min) {
            return false;
        }
        if self.max_price.map_or(false, |max| price > max) {
            return false;
        }
        if self
            .min_bedrooms
            .map_or(false, |min| listing.bedrooms.unwrap_or(0) < min)
        {
            return false;
        }
        if self
            .min_parking_spaces
            .map_or(false, |min| listing.parking_spaces.unwrap_or(0) < min)
        {
            return false;
        }

        true
    }
}

/// Split a comma-separated search box into trimmed, non-empty terms
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Listings shown on public pages
pub fn visible(listings: Vec<Listing>) -> Vec<Listing> {
    listings.into_iter().filter(|l| l.available).collect()
}

/// Apply `criteria` to `listings`. Pure; ties in a price sort keep input order.
pub fn filter_listings(listings: &[Listing], criteria: &Criteria) -> Vec<Listing> {
    let terms: Vec<String> = criteria.terms().collect();
    let mut result: Vec<Listing> = listings
        .iter()
        .filter(|listing| criteria.matches_with_terms(listing, &terms))
        .cloned()
        .collect();

    let price = |l: &Listing| l.price.unwrap_or(0.0);
    match criteria.sort {
        SortOrder::None => {}
        SortOrder::PriceAscending => result.sort_by(|a, b| cmp_price(price(a), price(b))),
        SortOrder::PriceDescending => result.sort_by(|a, b| cmp_price(price(b), price(a))),
    }

    result
}

fn cmp_price(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: i64, neighborhood: &str, kind: &str, price: Option<f64>) -> Listing {
        let mut l = Listing::new(id, format!("Imóvel {id}"));
        l.location.neighborhood = Some(neighborhood.to_string());
        l.property_type = Some(kind.to_string());
        l.price = price;
        l
    }

    fn ids(listings: &[Listing]) -> Vec<i64> {
        listings.iter().map(|l| l.id).collect()
    }

    fn sample() -> Vec<Listing> {
        let mut a = listing(1, "Vila Olímpia", "Cobertura", Some(3_500_000.0));
        a.bedrooms = Some(4);
        a.parking_spaces = Some(3);
        let mut b = listing(2, "Brooklin", "Apartamento", Some(1_850_000.0));
        b.bedrooms = Some(3);
        b.parking_spaces = Some(1);
        let c = listing(3, "Alphaville", "Casa", Some(2_200_000.0));
        let d = listing(4, "Brooklin Novo", "Apartamento", Some(1_850_000.0));
        vec![a, b, c, d]
    }

    #[test]
    fn wildcard_criteria_is_identity() {
        let all = sample();
        let criteria = Criteria::default();
        assert!(criteria.is_wildcard());
        assert_eq!(filter_listings(&all, &criteria), all);

        let blank = Criteria {
            neighborhood_terms: vec!["".into(), "  ".into()],
            property_type: Some(String::new()),
            ..Criteria::default()
        };
        assert!(blank.is_wildcard());
        assert_eq!(filter_listings(&all, &blank), all);
    }

    #[test]
    fn empty_collection_stays_empty() {
        let criteria = Criteria {
            min_bedrooms: Some(2),
            sort: SortOrder::PriceDescending,
            ..Criteria::default()
        };
        assert!(filter_listings(&[], &criteria).is_empty());
    }

    #[test]
    fn neighborhood_terms_are_or_combined_and_case_insensitive() {
        let criteria = Criteria::default().with_neighborhoods("moema, ALPHA");
        assert_eq!(criteria.neighborhood_terms, vec!["moema", "ALPHA"]);
        // only the second term matches
        assert_eq!(ids(&filter_listings(&sample(), &criteria)), vec![3]);

        let both = Criteria::default().with_neighborhoods("brook,olímp");
        assert_eq!(ids(&filter_listings(&sample(), &both)), vec![1, 2, 4]);
    }

    #[test]
    fn listing_without_neighborhood_never_matches_terms() {
        let mut bare = Listing::new(9, "Sem bairro");
        bare.location.neighborhood = None;
        let criteria = Criteria::default().with_neighborhoods("centro");
        assert!(filter_listings(&[bare], &criteria).is_empty());
    }

    #[test]
    fn dimensions_are_and_combined() {
        let criteria = Criteria {
            neighborhood_terms: vec!["brooklin".into()],
            property_type: Some("Apartamento".into()),
            min_bedrooms: Some(2),
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &criteria)), vec![2]);
    }

    #[test]
    fn property_type_is_exact() {
        let criteria = Criteria {
            property_type: Some("apartamento".into()),
            ..Criteria::default()
        };
        assert!(filter_listings(&sample(), &criteria).is_empty());
    }

    #[test]
    fn property_type_ignores_surrounding_whitespace() {
        let criteria = Criteria {
            property_type: Some(" Casa ".into()),
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &criteria)), vec![3]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let criteria = Criteria {
            min_price: Some(1_850_000.0),
            max_price: Some(2_200_000.0),
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &criteria)), vec![2, 3, 4]);
    }

    #[test]
    fn missing_bedroom_count_fails_minimum() {
        let mut unset = Listing::new(5, "Sem quartos");
        unset.bedrooms = None;
        let criteria = Criteria {
            min_bedrooms: Some(1),
            ..Criteria::default()
        };
        assert!(filter_listings(&[unset.clone()], &criteria).is_empty());
        assert!(criteria.matches(&{
            let mut one = unset;
            one.bedrooms = Some(1);
            one
        }));
    }

    #[test]
    fn missing_price_counts_as_zero() {
        let free = listing(6, "Centro", "Casa", None);
        let max_only = Criteria {
            max_price: Some(100.0),
            ..Criteria::default()
        };
        let min_only = Criteria {
            min_price: Some(1.0),
            ..Criteria::default()
        };
        assert_eq!(filter_listings(&[free.clone()], &max_only).len(), 1);
        assert!(filter_listings(&[free], &min_only).is_empty());
    }

    #[test]
    fn parking_minimum() {
        let criteria = Criteria {
            min_parking_spaces: Some(2),
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &criteria)), vec![1]);
    }

    #[test]
    fn price_sort_is_stable() {
        let asc = Criteria {
            sort: SortOrder::PriceAscending,
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &asc)), vec![2, 4, 3, 1]);

        let desc = Criteria {
            sort: SortOrder::PriceDescending,
            ..Criteria::default()
        };
        assert_eq!(ids(&filter_listings(&sample(), &desc)), vec![1, 3, 2, 4]);
    }

    #[test]
    fn result_is_a_subset_of_input() {
        let all = sample();
        let criteria = Criteria {
            neighborhood_terms: vec!["a".into()],
            max_price: Some(3_000_000.0),
            sort: SortOrder::PriceDescending,
            ..Criteria::default()
        };
        for found in filter_listings(&all, &criteria) {
            assert!(all.contains(&found));
        }
    }

    #[test]
    fn visible_keeps_only_available() {
        let mut sold = Listing::new(2, "Vendido");
        sold.available = false;
        assert_eq!(ids(&visible(vec![Listing::new(1, "Casa"), sold])), vec![1]);
    }

    #[test]
    fn sort_order_parses_aliases() {
        assert_eq!("precoAsc".parse::<SortOrder>().unwrap(), SortOrder::PriceAscending);
        assert_eq!("price-desc".parse::<SortOrder>().unwrap(), SortOrder::PriceDescending);
        assert_eq!("relevancia".parse::<SortOrder>().unwrap(), SortOrder::None);
        assert!("cheapest".parse::<SortOrder>().is_err());
    }
}
