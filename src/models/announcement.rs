//! Swipe marketplace data structures
//!
//! Shapes exchanged with the Swipe API: listings, the authenticated profile,
//! and the bearer credential pair.

use serde::{Deserialize, Serialize};

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authenticated user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// A marketplace listing as returned by the announcements endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub apartment_number: Option<String>,
    pub price: f64,
    pub area: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub images: Vec<AnnouncementImage>,
    #[serde(default)]
    pub owner: Option<AnnouncementOwner>,
}

impl Announcement {
    /// Parsed geocoordinates, if the listing carries any
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.as_deref()?.parse::<f64>().ok()?;
        let lon = self.longitude.as_deref()?.parse::<f64>().ok()?;
        Some((lat, lon))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementImage {
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementOwner {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Payload for creating a new listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub address: String,
    pub apartment_number: String,
    pub price: f64,
    pub area: f64,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
    pub images: Vec<String>,
    pub number_of_rooms: String,
    pub communication_method: String,
}

/// Payload for initiating registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Which slice of the marketplace a browsing session covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseMode {
    All,
    Mine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_deserializes_sparse_payload() {
        let json = r#"{"id": 7, "address": "Baker St, 221B", "price": 120000.0, "area": 54.5}"#;
        let item: Announcement = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 7);
        assert!(item.images.is_empty());
        assert!(item.owner.is_none());
        assert!(item.coordinates().is_none());
    }

    #[test]
    fn test_coordinates_parsing() {
        let json = r#"{"id": 1, "address": "x", "price": 1.0, "area": 1.0,
                       "latitude": "50.45", "longitude": "30.52"}"#;
        let item: Announcement = serde_json::from_str(json).unwrap();
        assert_eq!(item.coordinates(), Some((50.45, 30.52)));

        let json = r#"{"id": 1, "address": "x", "price": 1.0, "area": 1.0,
                       "latitude": "not-a-number", "longitude": "30.52"}"#;
        let item: Announcement = serde_json::from_str(json).unwrap();
        assert!(item.coordinates().is_none());
    }
}
