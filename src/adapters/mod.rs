// Adapters layer: concrete implementations for external systems (http, geocoding, geolocation).

pub mod geocoder;
pub mod geolocation;
pub mod http;
