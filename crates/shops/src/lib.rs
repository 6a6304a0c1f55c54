//! # Fertilizer Shop Lookup
//!
//! Finds agricultural supply shops near a position through the OpenStreetMap
//! Overpass API.
//!
//! ```rust,no_run
//! use shops::{Coordinates, OverpassClient, OverpassConfig, ShopLookup};
//!
//! # async fn run() -> shops::Result<()> {
//! let client = OverpassClient::new(OverpassConfig::default())?;
//! let coords = Coordinates::parse(Some("28.6139"), Some("77.2090"))?;
//! for shop in client.find_shops(coords).await? {
//!     println!("{} ({}, {})", shop.name, shop.lat, shop.lng);
//! }
//! # Ok(())
//! # }
//! ```

pub mod coords;
pub mod error;
pub mod geo_export;
pub mod overpass;

pub use coords::Coordinates;
pub use error::{Result, ShopError};
pub use geo_export::shops_to_geojson;
pub use overpass::{
    DEFAULT_OVERPASS_ENDPOINT, OverpassClient, OverpassConfig, Shop, ShopLookup, UNNAMED_SHOP, build_query,
    parse_response,
};
