//! Services for facmap
//!
//! - `address_normalizer`: raw address → canonical query
//! - `geocode_cache`: JSON cache of resolved queries
//! - `geocoder` + `*_client`: fallback geocoding over remote backends
//! - `workbook_loader`: facility spreadsheet input
//! - `map_builder` + `marker_palette`: Leaflet page output
//! - `report_emitter`: unresolved-address spreadsheet output

pub mod address_normalizer;
pub mod geocode_cache;
pub mod geocoder;
pub mod http;
pub mod map_builder;
pub mod marker_palette;
pub mod nominatim_client;
pub mod photon_client;
pub mod report_emitter;
pub mod workbook_loader;
pub mod yandex_client;

pub use address_normalizer::AddressNormalizer;
pub use geocode_cache::{CacheWrite, CachedResult, GeocodeCache};
pub use geocoder::{FallbackStrategy, GeocodeOutcome, Geocoder};
pub use map_builder::{MapBuilder, MapSettings};
pub use nominatim_client::NominatimClient;
pub use photon_client::PhotonClient;
pub use report_emitter::MissReport;
pub use workbook_loader::{load_records, SheetSelector};
pub use yandex_client::YandexClient;
