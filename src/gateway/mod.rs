pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;
pub mod webhook;

pub use memory::MemoryGateway;
pub use rest::RestGateway;
pub use traits::{AccountStore, BackOfficeStore, FavoriteStore, ListingStore};
pub use webhook::WebhookClient;
