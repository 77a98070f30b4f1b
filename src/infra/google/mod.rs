pub mod bigquery;
pub mod places;

pub use bigquery::BigQueryClient;
pub use places::GooglePlacesClient;
