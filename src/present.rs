//! Plain-text rendering of listings and back-office rows.

use crate::dashboard::DashboardSummary;
use crate::models::{AnalysisRequest, Broker, Listing};
use crate::ranking::RankedListing;
use crate::view::EmptyState;
use std::fmt::Write;

/// Brazilian real with dot thousands separators and no cents, e.g. `R$ 1.850.000`
pub fn format_brl(value: f64) -> String {
    let rounded = value.abs().round() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded > 0 {
        format!("-R$ {grouped}")
    } else {
        format!("R$ {grouped}")
    }
}

fn price_line(price: Option<f64>) -> String {
    price.map(format_brl).unwrap_or_else(|| "price on request".to_string())
}

fn location_line(listing: &Listing) -> String {
    let loc = &listing.location;
    let parts: Vec<&str> = [&loc.neighborhood, &loc.city]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" - ")
    }
}

fn specs_line(listing: &Listing) -> String {
    let mut specs = Vec::new();
    if let Some(n) = listing.bedrooms {
        specs.push(format!("{n} bd"));
    }
    if let Some(n) = listing.bathrooms {
        specs.push(format!("{n} ba"));
    }
    if let Some(n) = listing.parking_spaces {
        specs.push(format!("{n} pk"));
    }
    if let Some(m) = listing.area {
        specs.push(format!("{m} m²"));
    }
    specs.join(" · ")
}

/// Card shown in listing grids. `favorited` is only ever true once the
/// favorite ids have loaded.
pub fn listing_card(listing: &Listing, favorited: bool) -> String {
    let star = if favorited { '★' } else { '☆' };
    let mut card = format!("{star} #{} {}\n", listing.id, listing.title);
    let _ = writeln!(card, "  {}", price_line(listing.price));
    let _ = writeln!(card, "  {}", location_line(listing));
    let specs = specs_line(listing);
    if !specs.is_empty() {
        let _ = writeln!(card, "  {specs}");
    }
    card
}

/// Full detail page of one listing
pub fn listing_detail(listing: &Listing, favorited: bool) -> String {
    let mut out = listing_card(listing, favorited);
    if let Some(kind) = &listing.property_type {
        let deal = listing.transaction.as_deref().unwrap_or("-");
        let _ = writeln!(out, "  {kind} for {deal}");
    }
    let address = listing.address();
    if !address.is_empty() {
        let _ = writeln!(out, "  {address}");
    }
    if let Some(description) = listing.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "\n{description}");
    }
    for (label, items) in [("Features", listing.features()), ("Condominium", listing.amenities())] {
        if !items.is_empty() {
            let _ = writeln!(out, "\n{label}: {}", items.join(", "));
        }
    }
    let media = listing.media_urls();
    if !media.is_empty() {
        let _ = writeln!(out, "\nMedia:");
        for url in media {
            let _ = writeln!(out, "  {url}");
        }
    }
    if let Some(advertiser) = &listing.advertiser {
        let _ = writeln!(out, "\nListed by {advertiser}");
    }
    out
}

/// Cards for a grid, or the empty-state line when there is nothing to show
pub fn listing_grid<F>(listings: &[Listing], empty: EmptyState, is_favorited: F) -> String
where
    F: Fn(&Listing) -> bool,
{
    if listings.is_empty() {
        return format!("{empty}\n");
    }
    listings
        .iter()
        .map(|l| listing_card(l, is_favorited(l)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ranking(ranked: &[RankedListing]) -> String {
    if ranked.is_empty() {
        return format!("{}\n", EmptyState::NoFavorites);
    }
    let mut out = String::new();
    for (pos, entry) in ranked.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {} ({}) - {} favorite(s)",
            pos + 1,
            entry.listing.title,
            price_line(entry.listing.price),
            entry.count
        );
    }
    out
}

pub fn dashboard(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Clients:            {}", summary.total_clients);
    let _ = writeln!(out, "Available listings: {}", summary.total_available_listings);
    let _ = writeln!(out, "Contacting clients: {}", summary.contacting_clients);
    let _ = writeln!(out, "\nMonth  Sign-ups  Contacts");
    for bucket in &summary.monthly {
        let _ = writeln!(out, "{:<5}  {:>8}  {:>8}", bucket.month, bucket.signups, bucket.contacts);
    }
    if !summary.broker_contacts.is_empty() {
        let _ = writeln!(out, "\nContacts per broker");
        for broker in &summary.broker_contacts {
            let _ = writeln!(out, "  {:<24} {}", broker.name, broker.contacts);
        }
    }
    let _ = writeln!(out, "\nMost favorited");
    out.push_str(&ranking(&summary.top_favorites));
    out
}

pub fn broker_row(broker: &Broker) -> String {
    format!(
        "#{} {} <{}> CRECI {} {}",
        broker.id,
        broker.name,
        broker.email,
        broker.license.as_deref().unwrap_or("-"),
        broker.phone.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

pub fn request_row(request: &AnalysisRequest) -> String {
    let price = request
        .price
        .as_deref()
        .and_then(|p| p.parse::<f64>().ok())
        .map(format_brl)
        .or_else(|| request.price.clone())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "#{} [{}] {} - {} ({} media)",
        request.id,
        request.status.as_str(),
        request.title.as_deref().unwrap_or("untitled"),
        price,
        request.media_urls().len()
    )
}
