use crate::error::AppResult;
use crate::gateway::{AccountStore, BackOfficeStore, FavoriteStore, ListingStore};
use crate::models::{Broker, Contact, Favorite, Listing, User, UserKind};
use crate::ranking::{ranked_top, RankedListing, DASHBOARD_TOP};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    pub month: &'static str,
    pub signups: usize,
    pub contacts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerContacts {
    pub name: String,
    pub contacts: usize,
}

/// Administrator dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub total_available_listings: usize,
    /// Distinct clients that sent at least one contact
    pub contacting_clients: usize,
    pub monthly: Vec<MonthBucket>,
    pub broker_contacts: Vec<BrokerContacts>,
    pub top_favorites: Vec<RankedListing>,
}

/// Raw rows the dashboard is computed from
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub clients: Vec<User>,
    pub listings: Vec<Listing>,
    pub favorites: Vec<Favorite>,
    pub contacts: Vec<Contact>,
    pub brokers: Vec<Broker>,
}

/// Group timestamps by calendar month. With `year`, other years are ignored;
/// without it every year folds into the same twelve buckets.
fn month_index(ts: Option<DateTime<Utc>>, year: Option<i32>) -> Option<usize> {
    let ts = ts?;
    if year.map_or(false, |y| ts.year() != y) {
        return None;
    }
    Some(ts.month0() as usize)
}

pub fn summarize(inputs: &DashboardInputs, year: Option<i32>) -> DashboardSummary {
    let mut monthly: Vec<MonthBucket> = MONTHS
        .iter()
        .map(|month| MonthBucket {
            month: *month,
            signups: 0,
            contacts: 0,
        })
        .collect();

    for client in &inputs.clients {
        if let Some(idx) = month_index(client.created_at, year) {
            monthly[idx].signups += 1;
        }
    }
    for contact in &inputs.contacts {
        if let Some(idx) = month_index(contact.created_at, year) {
            monthly[idx].contacts += 1;
        }
    }

    let contacting_clients = inputs
        .contacts
        .iter()
        .filter_map(|c| c.client_id)
        .collect::<HashSet<_>>()
        .len();

    let mut per_broker: HashMap<i64, usize> = HashMap::new();
    for broker_id in inputs.contacts.iter().filter_map(|c| c.broker_id) {
        *per_broker.entry(broker_id).or_insert(0) += 1;
    }
    let broker_contacts = inputs
        .brokers
        .iter()
        .map(|broker| BrokerContacts {
            name: broker.name.clone(),
            contacts: per_broker.get(&broker.id).copied().unwrap_or(0),
        })
        .collect();

    DashboardSummary {
        total_clients: inputs
            .clients
            .iter()
            .filter(|u| u.kind == UserKind::Client)
            .count(),
        total_available_listings: inputs.listings.iter().filter(|l| l.available).count(),
        contacting_clients,
        monthly,
        broker_contacts,
        top_favorites: ranked_top(&inputs.favorites, &inputs.listings, DASHBOARD_TOP),
    }
}

/// Fetch every table the dashboard needs, concurrently, and summarize
pub async fn load<G>(gateway: &G, year: Option<i32>) -> AppResult<DashboardSummary>
where
    G: ListingStore + FavoriteStore + AccountStore + BackOfficeStore,
{
    let (clients, listings, favorites, contacts, brokers) = tokio::try_join!(
        gateway.users_of_kind(&UserKind::Client),
        gateway.listings(),
        gateway.all_favorites(),
        gateway.contacts(),
        gateway.brokers(),
    )?;

    info!(
        "Dashboard inputs: {} clients, {} listings, {} favorites, {} contacts",
        clients.len(),
        listings.len(),
        favorites.len(),
        contacts.len()
    );

    Ok(summarize(
        &DashboardInputs {
            clients,
            listings,
            favorites,
            contacts,
            brokers,
        },
        year,
    ))
}
