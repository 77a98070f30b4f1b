//! Aggregate network-throughput measurements.

use anyhow::Result;

/// Half-width of the measurement window around a location, in degrees of
/// latitude (about 5 km).
pub const BOUNDING_BOX_OFFSET: f64 = 0.045;

/// Days of measurements averaged for a bounding box.
pub const BOUNDING_BOX_RECENCY_DAYS: u32 = 7;

/// Days of measurements averaged for a whole country.
pub const COUNTRY_RECENCY_DAYS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box of ±[`BOUNDING_BOX_OFFSET`] around a point. The longitude margin
    /// is scaled by `cos(latitude)` so both margins cover similar distance.
    pub fn around(latitude: f64, longitude: f64) -> Self {
        let lng_offset = BOUNDING_BOX_OFFSET * latitude.to_radians().cos();
        Self {
            min_lat: latitude - BOUNDING_BOX_OFFSET,
            max_lat: latitude + BOUNDING_BOX_OFFSET,
            min_lng: longitude - lng_offset,
            max_lng: longitude + lng_offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Area {
    BoundingBox(BoundingBox),
    /// Lowercase country name as recorded by the measurement client.
    Country(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThroughputDirection {
    Download,
    Upload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputQuery {
    pub area: Area,
    pub direction: ThroughputDirection,
    pub recency_days: u32,
}

impl ThroughputQuery {
    /// Query for a place: a whole country when the place is one, otherwise
    /// a bounding box around its coordinates.
    pub fn for_place(
        formatted_address: &str,
        latitude: f64,
        longitude: f64,
        types: &[String],
        direction: ThroughputDirection,
    ) -> Self {
        if types.iter().any(|t| t == "country") {
            Self {
                area: Area::Country(formatted_address.trim().to_lowercase()),
                direction,
                recency_days: COUNTRY_RECENCY_DAYS,
            }
        } else {
            Self {
                area: Area::BoundingBox(BoundingBox::around(latitude, longitude)),
                direction,
                recency_days: BOUNDING_BOX_RECENCY_DAYS,
            }
        }
    }
}

/// Abstraction over an aggregate-metrics provider (e.g., BigQuery over M-Lab NDT).
#[async_trait::async_trait]
pub trait ThroughputMetrics: Send + Sync {
    /// Average throughput in Mbps. Fails when no measurement matches.
    async fn average_throughput(&self, query: &ThroughputQuery) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_at_equator_is_square() {
        let bbox = BoundingBox::around(0.0, 10.0);
        assert!((bbox.max_lat - 0.045).abs() < 1e-12);
        assert!((bbox.min_lng - 9.955).abs() < 1e-12);
        assert!((bbox.max_lng - 10.045).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_narrows_longitude_with_latitude() {
        let bbox = BoundingBox::around(60.0, 10.0);
        let lng_half = (bbox.max_lng - bbox.min_lng) / 2.0;
        assert!((lng_half - 0.0225).abs() < 1e-9);
        assert!((bbox.max_lat - bbox.min_lat - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_query_for_country_uses_country_name() {
        let types = vec!["country".to_string(), "political".to_string()];
        let query = ThroughputQuery::for_place("Portugal", 39.4, -8.2, &types, ThroughputDirection::Upload);
        assert_eq!(query.area, Area::Country("portugal".to_string()));
        assert_eq!(query.recency_days, 2);
    }

    #[test]
    fn test_query_for_city_uses_bounding_box() {
        let types = vec!["locality".to_string()];
        let query = ThroughputQuery::for_place("Porto, Portugal", 41.15, -8.61, &types, ThroughputDirection::Download);
        assert!(matches!(query.area, Area::BoundingBox(_)));
        assert_eq!(query.recency_days, 7);
    }
}
