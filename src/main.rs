use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use estate_desk::backoffice::{
    search_brokers, search_requests, AnalysisQueue, BrokerManager, ListingManager, ListingWizard,
};
use estate_desk::config::Config;
use estate_desk::error::AppResult;
use estate_desk::favorites::{FavoriteController, ToggleOutcome};
use estate_desk::filter::{filter_listings, parse_terms, visible, Criteria, SortOrder};
use estate_desk::gateway::webhook::MediaFile;
use estate_desk::gateway::{FavoriteStore, ListingStore, RestGateway, WebhookClient};
use estate_desk::profile::{ProfileDraft, ProfileEditor};
use estate_desk::ranking::{ranked_top, CAROUSEL_SIZE};
use estate_desk::routes::{gate, GateDecision, Route};
use estate_desk::session::{AppContext, FileSessionStore};
use estate_desk::view::{with_timeout, EmptyState, Notification};
use estate_desk::{dashboard, present};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estate-desk", version, about = "Real-estate listings and back office")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search available listings
    Listings(SearchArgs),
    /// Show one listing
    Show { id: i64 },
    /// Most favorited listings
    Top {
        #[arg(long, default_value_t = CAROUSEL_SIZE)]
        limit: usize,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a client account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Show or update your profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// New profile photo
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Toggle a listing in your favorites
    Favorite { id: i64 },
    /// List your favorite listings
    Favorites,
    /// Administrator dashboard
    Dashboard {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Manage brokers
    Brokers {
        #[arg(long)]
        search: Option<String>,
        /// Broker ids to delete
        #[arg(long, num_args = 1..)]
        delete: Vec<i64>,
    },
    /// Review submitted listings
    Requests {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        show: Option<i64>,
        #[arg(long)]
        mark_sent: Option<i64>,
    },
    /// Manage every listing, including withdrawn ones
    Manage {
        #[arg(long)]
        withdraw: Option<i64>,
        #[arg(long)]
        restore: Option<i64>,
        #[arg(long, num_args = 1..)]
        delete: Vec<i64>,
    },
    /// Upload a new listing through the webhook
    Publish(PublishArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Comma separated neighborhoods
    #[arg(long)]
    neighborhood: Option<String>,
    #[arg(long = "type")]
    property_type: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_bedrooms: Option<u32>,
    #[arg(long)]
    min_parking: Option<u32>,
    /// none, price-asc or price-desc
    #[arg(long, default_value = "none")]
    sort: SortOrder,
}

impl SearchArgs {
    fn criteria(&self) -> Criteria {
        Criteria {
            neighborhood_terms: self.neighborhood.as_deref().map(parse_terms).unwrap_or_default(),
            property_type: self.property_type.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_bedrooms: self.min_bedrooms,
            min_parking_spaces: self.min_parking,
            sort: self.sort,
        }
    }
}

#[derive(Args)]
struct PublishArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    neighborhood: String,
    #[arg(long = "type")]
    property_type: String,
    /// venda or aluguel
    #[arg(long)]
    transaction: String,
    #[arg(long)]
    price: String,
    #[arg(long, default_value = "")]
    street: String,
    #[arg(long, default_value = "")]
    number: String,
    #[arg(long, default_value = "")]
    bedrooms: String,
    #[arg(long, default_value = "")]
    bathrooms: String,
    #[arg(long, default_value = "")]
    area: String,
    #[arg(long, default_value = "")]
    parking: String,
    #[arg(long, default_value = "")]
    description: String,
    /// Photo or video files
    #[arg(long, num_args = 1..)]
    media: Vec<PathBuf>,
}

struct App {
    gateway: Arc<RestGateway>,
    webhook: Option<Arc<WebhookClient>>,
    ctx: AppContext,
    timeout: Duration,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let gateway = RestGateway::new(config).context("Failed to build store client")?;
        let webhook = match &config.webhook_url {
            Some(url) => Some(Arc::new(
                WebhookClient::new(url, config.request_timeout)
                    .context("Failed to build webhook client")?,
            )),
            None => None,
        };
        let store = Arc::new(FileSessionStore::new(&config.session_path));

        Ok(Self {
            gateway: Arc::new(gateway),
            webhook,
            ctx: AppContext::new(store),
            timeout: config.request_timeout,
        })
    }

    /// Resolve the session, then ask the gate whether `route` may render
    async fn admit(&mut self, route: Route) -> bool {
        self.ctx.resolve().await;
        match gate(route, self.ctx.state()) {
            GateDecision::Render => true,
            GateDecision::Redirect(to) => {
                info!("{} is not available to this session, redirected to {}", route, to);
                println!("{route} requires an authorized session. Run `estate-desk login`.");
                false
            }
            GateDecision::Pending => false,
        }
    }

    fn favorites(&self) -> FavoriteController {
        FavoriteController::new(self.gateway.clone(), self.ctx.user().map(|u| u.id))
    }

    async fn run(&mut self, command: Command) -> AppResult<()> {
        match command {
            Command::Listings(args) => {
                if !self.admit(Route::Listings).await {
                    return Ok(());
                }
                let mut favorites = self.favorites();
                let (listings, loaded) = tokio::join!(
                    with_timeout(self.timeout, self.gateway.listings()),
                    favorites.load()
                );
                if let Some(notice) = side_notice("load favorites", loaded) {
                    println!("{notice}");
                }
                let shown = filter_listings(&visible(listings?), &args.criteria());
                debug!("{} listings match", shown.len());
                print!(
                    "{}",
                    present::listing_grid(&shown, EmptyState::NoListings, |l| {
                        favorites.is_favorited(l.id)
                    })
                );
            }
            Command::Show { id } => {
                if !self.admit(Route::ListingDetail(id)).await {
                    return Ok(());
                }
                let mut favorites = self.favorites();
                let (listing, loaded) = tokio::join!(
                    with_timeout(self.timeout, self.gateway.listing(id)),
                    favorites.load()
                );
                if let Some(notice) = side_notice("load favorites", loaded) {
                    println!("{notice}");
                }
                match listing {
                    Ok(listing) if listing.available => {
                        print!("{}", present::listing_detail(&listing, favorites.is_favorited(id)))
                    }
                    Ok(_) => println!("{}", EmptyState::NoListings),
                    Err(e) if e.is_not_found() => println!("{}", EmptyState::NoListings),
                    Err(e) => return Err(e.into()),
                }
            }
            Command::Top { limit } => {
                if !self.admit(Route::Home).await {
                    return Ok(());
                }
                let (listings, all) = tokio::try_join!(
                    with_timeout(self.timeout, self.gateway.listings()),
                    with_timeout(self.timeout, self.gateway.all_favorites())
                )?;
                print!("{}", present::ranking(&ranked_top(&all, &visible(listings), limit)));
            }
            Command::Login { email, password } => {
                let record = self.ctx.login(self.gateway.as_ref(), &email, &password).await?;
                println!("{}", Notification::info(format!("Welcome, {}", record.display_name)));
            }
            Command::Register { name, email, password } => {
                self.ctx
                    .register(self.gateway.as_ref(), &name, &email, &password)
                    .await?;
                println!("{}", Notification::info("Account created. You can sign in now."));
            }
            Command::Logout => {
                self.ctx.logout().await?;
                println!("{}", Notification::info("Signed out"));
            }
            Command::Whoami => {
                if !self.admit(Route::Profile).await {
                    return Ok(());
                }
                if let Some(user) = self.ctx.user() {
                    println!("#{} {} ({})", user.id, user.display_name, user.kind);
                }
            }
            Command::Profile { name, email, phone, photo } => {
                if !self.admit(Route::Profile).await {
                    return Ok(());
                }
                let Some(id) = self.ctx.user().map(|u| u.id) else {
                    return Ok(());
                };
                let editor = ProfileEditor::new(self.gateway.clone(), self.webhook.clone());
                let current = editor.load(id).await?;

                let changed = name.is_some() || email.is_some() || phone.is_some() || photo.is_some();
                if !changed {
                    println!("#{} {} <{}>", current.id, current.name, current.email);
                    println!("phone: {}", current.phone.as_deref().unwrap_or("-"));
                    println!("photo: {}", current.photo_url.as_deref().unwrap_or("-"));
                    return Ok(());
                }

                let mut draft = ProfileDraft::from_user(&current);
                if let Some(name) = name {
                    draft.name = name;
                }
                if let Some(email) = email {
                    draft.email = email;
                }
                if let Some(phone) = phone {
                    draft.phone = phone;
                }
                if let Some(path) = photo {
                    match MediaFile::from_path(&path).await {
                        Ok(file) => draft.photo = Some(file),
                        Err(e) => println!("skipping {}: {}", path.display(), e),
                    }
                }
                editor.save(&draft).await?;
                println!("{}", Notification::info("Profile updated"));
            }
            Command::Favorite { id } => {
                if !self.admit(Route::ListingDetail(id)).await {
                    return Ok(());
                }
                let message = match self.favorites().toggle(id).await? {
                    ToggleOutcome::Favorited => format!("Listing {id} added to favorites"),
                    ToggleOutcome::Unfavorited => format!("Listing {id} removed from favorites"),
                    ToggleOutcome::AuthenticationRequired => {
                        "Sign in to save favorites. Run `estate-desk login`.".to_string()
                    }
                };
                println!("{}", Notification::info(message));
            }
            Command::Favorites => {
                if !self.admit(Route::Favorites).await {
                    return Ok(());
                }
                let listings = self.favorites().favorite_listings(self.gateway.as_ref()).await?;
                print!("{}", present::listing_grid(&listings, EmptyState::NoFavorites, |_| true));
            }
            Command::Dashboard { year } => {
                if !self.admit(Route::Dashboard).await {
                    return Ok(());
                }
                let summary = dashboard::load(self.gateway.as_ref(), year).await?;
                print!("{}", present::dashboard(&summary));
            }
            Command::Brokers { search, delete } => {
                if !self.admit(Route::BrokerManagement).await {
                    return Ok(());
                }
                let manager = BrokerManager::new(self.gateway.clone(), self.webhook.clone());
                manager.delete_selected(&delete).await?;
                let brokers = manager.list().await?;
                let matched = search_brokers(&brokers, search.as_deref().unwrap_or_default());
                if matched.is_empty() {
                    println!("{}", EmptyState::NoBrokers);
                }
                for broker in matched {
                    println!("{}", present::broker_row(broker));
                }
            }
            Command::Requests { search, show, mark_sent } => {
                let route = show.or(mark_sent).map_or(Route::AnalysisQueue, Route::AnalysisDetail);
                if !self.admit(route).await {
                    return Ok(());
                }
                let queue = AnalysisQueue::new(self.gateway.clone());
                if let Some(id) = mark_sent {
                    queue.mark_sent(id).await?;
                    println!("{}", Notification::info(format!("Request {id} marked as sent")));
                }
                if let Some(id) = show {
                    let request = queue.detail(id).await?;
                    println!("{}", present::request_row(&request));
                    for url in request.media_urls() {
                        println!("  {url}");
                    }
                    return Ok(());
                }
                let requests = queue.list().await?;
                let matched = search_requests(&requests, search.as_deref().unwrap_or_default());
                if matched.is_empty() {
                    println!("{}", EmptyState::NoRequests);
                }
                for request in matched {
                    println!("{}", present::request_row(request));
                }
            }
            Command::Manage { withdraw, restore, delete } => {
                if !self.admit(Route::ListingManagement).await {
                    return Ok(());
                }
                let manager = ListingManager::new(self.gateway.clone(), self.webhook.clone());
                if let Some(id) = withdraw {
                    manager.set_availability(id, false).await?;
                }
                if let Some(id) = restore {
                    manager.set_availability(id, true).await?;
                }
                if !delete.is_empty() {
                    manager.delete(&delete).await?;
                }
                let listings = manager.all().await?;
                print!("{}", present::listing_grid(&listings, EmptyState::NoListings, |_| false));
            }
            Command::Publish(args) => {
                if !self.admit(Route::ListingManagement).await {
                    return Ok(());
                }
                let mut wizard = ListingWizard::new();
                let draft = &mut wizard.draft;
                draft.title = args.title;
                draft.city = args.city;
                draft.neighborhood = args.neighborhood;
                draft.property_type = args.property_type;
                draft.transaction = args.transaction;
                draft.price = args.price;
                draft.street = args.street;
                draft.number = args.number;
                draft.bedrooms = args.bedrooms;
                draft.bathrooms = args.bathrooms;
                draft.area = args.area;
                draft.parking_spaces = args.parking;
                draft.description = args.description;
                if let Some(user) = self.ctx.user() {
                    draft.advertiser = user.display_name.clone();
                }
                wizard.next()?;

                for path in &args.media {
                    match MediaFile::from_path(path).await {
                        Ok(file) => wizard.add_media(file),
                        Err(e) => println!("skipping {}: {}", path.display(), e),
                    }
                }
                ListingManager::new(self.gateway.clone(), self.webhook.clone())
                    .create(&mut wizard)
                    .await?;
                println!("{}", Notification::info("Listing sent for upload"));
            }
        }
        Ok(())
    }
}

/// Notice for a secondary fetch that failed; the page still renders without it
fn side_notice(action: &str, result: AppResult<()>) -> Option<Notification> {
    result.err().map(|e| Notification::failure(action, &e))
}

fn action(command: &Command) -> &'static str {
    match command {
        Command::Listings(_) | Command::Show { .. } | Command::Top { .. } => "load listings",
        Command::Login { .. } => "sign in",
        Command::Register { .. } => "create account",
        Command::Logout => "sign out",
        Command::Whoami => "read session",
        Command::Profile { .. } => "update profile",
        Command::Favorite { .. } => "update favorites",
        Command::Favorites => "load favorites",
        Command::Dashboard { .. } => "load dashboard",
        Command::Brokers { .. } => "manage brokers",
        Command::Requests { .. } => "load requests",
        Command::Manage { .. } => "manage listings",
        Command::Publish(_) => "publish listing",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    let mut app = App::new(&config)?;

    let action = action(&cli.command);
    if let Err(e) = app.run(cli.command).await {
        println!("{}", Notification::failure(action, &e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_desk::gateway::MemoryGateway;
    use estate_desk::view::Level;

    #[tokio::test]
    async fn failed_favorites_fetch_yields_error_notice() {
        let gw = Arc::new(MemoryGateway::new());
        gw.fail_reads(true);
        let mut favorites = FavoriteController::new(gw, Some(3));

        let notice = side_notice("load favorites", favorites.load().await).unwrap();
        assert_eq!(notice.level, Level::Error);
        assert!(notice.message.starts_with("could not load favorites"));
        assert!(!favorites.is_favorited(1));
    }

    #[test]
    fn successful_fetch_yields_no_notice() {
        assert!(side_notice("load favorites", Ok(())).is_none());
    }

    #[test]
    fn profile_flags_parse() {
        let cli = Cli::try_parse_from(["estate-desk", "profile", "--phone", "11 5555-0000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Profile { phone: Some(ref p), name: None, .. } if p == "11 5555-0000"
        ));
    }
}
