use crate::models::{Favorite, Listing, ListingId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Home-page carousel size
pub const CAROUSEL_SIZE: usize = 10;
/// Dashboard "most favorited" size
pub const DASHBOARD_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedListing {
    pub listing: Listing,
    pub count: usize,
}

/// Count favorites per listing across all users and keep the `limit` most favorited.
///
/// A (user, listing) pair is counted once even if the store holds duplicates. Ties keep
/// the order in which each listing first appears in `favorites`. Listings with no
/// favorites, and favorites pointing at listings absent from `listings`, never appear.
pub fn ranked_top(favorites: &[Favorite], listings: &[Listing], limit: usize) -> Vec<RankedListing> {
    let mut seen = HashSet::new();
    let mut order: Vec<ListingId> = Vec::new();
    let mut counts: HashMap<ListingId, usize> = HashMap::new();

    for favorite in favorites {
        if !seen.insert((favorite.user_id, favorite.listing_id)) {
            continue;
        }
        let count = counts.entry(favorite.listing_id).or_insert(0);
        if *count == 0 {
            order.push(favorite.listing_id);
        }
        *count += 1;
    }

    let by_id: HashMap<ListingId, &Listing> = listings.iter().map(|l| (l.id, l)).collect();

    let mut ranked: Vec<RankedListing> = order
        .into_iter()
        .filter_map(|id| {
            by_id.get(&id).map(|listing| RankedListing {
                listing: (*listing).clone(),
                count: counts[&id],
            })
        })
        .collect();

    // stable: equal counts keep first-occurrence order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}
