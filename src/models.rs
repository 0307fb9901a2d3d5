use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One entry from the `etkinlikler` list endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Adi", default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(rename = "KisaAciklama", default)]
    pub short_description: Option<String>,
    #[serde(rename = "Tur", default)]
    pub category: Option<String>,
    #[serde(rename = "UcretsizMi", default, deserialize_with = "de_flag")]
    pub is_free: bool,
    #[serde(rename = "EtkinlikBaslamaTarihi", default)]
    pub starts_at: Option<String>,
    #[serde(rename = "EtkinlikBitisTarihi", default)]
    pub ends_at: Option<String>,
    #[serde(rename = "KucukAfis", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "Resim", default)]
    pub poster_url: Option<String>,
    #[serde(rename = "EtkinlikUrl", default)]
    pub page_path: Option<String>,
    #[serde(rename = "BiletSatisLinki", default)]
    pub ticket_url: Option<String>,
    #[serde(rename = "EtkinlikMerkezi", default)]
    pub venue_name: Option<String>,
    #[serde(
        rename = "Enlem",
        alias = "Latitude",
        default,
        deserialize_with = "de_loose_string"
    )]
    pub latitude: Option<String>,
    #[serde(
        rename = "Boylam",
        alias = "Longitude",
        default,
        deserialize_with = "de_loose_string"
    )]
    pub longitude: Option<String>,
}

impl Event {
    pub fn title(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            "Untitled Event".to_string()
        } else {
            name.to_string()
        }
    }

    pub fn price_label(&self) -> &'static str {
        if self.is_free {
            "Ücretsiz"
        } else {
            "Ücretli"
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .or(self.poster_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}

/// Extended record returned by `etkinlikler/{id}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    #[serde(rename = "Aciklama", default)]
    pub description: Option<String>,
    #[serde(rename = "Mekan", default)]
    pub venue: Option<Venue>,
    #[serde(rename = "Seanslar", default, deserialize_with = "de_list")]
    pub sessions: Vec<Session>,
}

impl EventDetail {
    /// Coordinates from the venue object, falling back to the flat event fields.
    pub fn coordinates_raw(&self) -> (Option<&str>, Option<&str>) {
        let venue_lat = self.venue.as_ref().and_then(|v| v.latitude.as_deref());
        let venue_lon = self.venue.as_ref().and_then(|v| v.longitude.as_deref());
        match (venue_lat, venue_lon) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => (
                self.event.latitude.as_deref(),
                self.event.longitude.as_deref(),
            ),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Venue {
    #[serde(rename = "Adi", default)]
    pub name: Option<String>,
    #[serde(rename = "Adres", default)]
    pub address: Option<String>,
    #[serde(
        rename = "Enlem",
        alias = "Latitude",
        default,
        deserialize_with = "de_loose_string"
    )]
    pub latitude: Option<String>,
    #[serde(
        rename = "Boylam",
        alias = "Longitude",
        default,
        deserialize_with = "de_loose_string"
    )]
    pub longitude: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Session {
    #[serde(rename = "SeansBaslamaTarihi", default)]
    pub starts_at: Option<String>,
    #[serde(rename = "SeansBitisTarihi", default)]
    pub ends_at: Option<String>,
    #[serde(rename = "MekanAdi", default)]
    pub venue_name: Option<String>,
}

/// Accepts a string, a number or null. Coordinates arrive in all three shapes.
fn de_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn de_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
