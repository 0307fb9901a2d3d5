use chrono::NaiveDateTime;
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property};
use thiserror::Error;

use crate::format::{self, clean_text, EVENT_TIMEZONE};
use crate::models::{Event, EventDetail};

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("event {0} has no usable start time")]
    MissingStart(i64),
}

/// What the device calendar needs to create an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub uid: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: Tz,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
}

impl CalendarEntry {
    pub fn from_event(event: &Event, page_url: Option<String>) -> Result<Self, CalendarError> {
        let start = event
            .starts_at
            .as_deref()
            .and_then(format::parse_timestamp)
            .ok_or(CalendarError::MissingStart(event.id))?;
        let end = event
            .ends_at
            .as_deref()
            .and_then(format::parse_timestamp)
            .filter(|end| *end >= start)
            .unwrap_or(start);
        let notes = event
            .short_description
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty());

        Ok(Self {
            uid: format!("etkinlik-{}@kultursanat.izmir.bel.tr", event.id),
            title: event.title(),
            start,
            end,
            timezone: EVENT_TIMEZONE,
            location: non_empty(event.venue_name.as_deref()),
            notes,
            url: page_url,
        })
    }

    /// Prefers the venue's full name and address from a detail record.
    pub fn from_detail(detail: &EventDetail, page_url: Option<String>) -> Result<Self, CalendarError> {
        let mut entry = Self::from_event(&detail.event, page_url)?;
        if let Some(venue) = &detail.venue {
            let parts: Vec<&str> = [venue.name.as_deref(), venue.address.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if !parts.is_empty() {
                entry.location = Some(parts.join(", "));
            }
        }
        if let Some(description) = detail.description.as_deref().map(clean_text) {
            if !description.is_empty() {
                entry.notes = Some(description);
            }
        }
        Ok(entry)
    }

    pub fn to_ics(&self) -> String {
        let mut cal = Calendar::new();

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&self.uid);
        ics_event.summary(&self.title);
        self.add_zoned(&mut ics_event, "DTSTART", self.start);
        self.add_zoned(&mut ics_event, "DTEND", self.end);

        if let Some(ref loc) = self.location {
            ics_event.location(loc);
        }
        if let Some(ref notes) = self.notes {
            ics_event.description(notes);
        }
        if let Some(ref url) = self.url {
            ics_event.add_property("URL", url);
        }

        cal.push(ics_event.done());
        cal.done().to_string()
    }

    fn add_zoned(&self, ics_event: &mut icalendar::Event, name: &str, at: NaiveDateTime) {
        let mut prop = Property::new(name, at.format("%Y%m%dT%H%M%S").to_string());
        prop.add_parameter("TZID", self.timezone.name());
        ics_event.append_property(prop);
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(start: Option<&str>, end: Option<&str>) -> Event {
        serde_json::from_value(json!({
            "Id": 42,
            "Adi": "Jazz Night",
            "KisaAciklama": "Açık&nbsp;hava<br>konseri",
            "EtkinlikBaslamaTarihi": start,
            "EtkinlikBitisTarihi": end,
            "EtkinlikMerkezi": "Kültürpark",
        }))
        .expect("event fixture")
    }

    #[test]
    fn builds_entry_in_izmir_time() {
        let event = fixture(Some("2024-07-30T20:00:00"), Some("2024-07-30T22:00:00"));
        let entry = CalendarEntry::from_event(&event, None).expect("entry");
        assert_eq!(entry.title, "Jazz Night");
        assert_eq!(entry.location.as_deref(), Some("Kültürpark"));
        assert_eq!(entry.notes.as_deref(), Some("Açık hava konseri"));
        assert_eq!(entry.timezone.name(), "Europe/Istanbul");

        let ics = entry.to_ics();
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("DTSTART;TZID=Europe/Istanbul:20240730T200000"));
        assert!(ics.contains("DTEND;TZID=Europe/Istanbul:20240730T220000"));
        assert!(ics.contains("SUMMARY:Jazz Night"));
        assert!(ics.contains("UID:etkinlik-42@kultursanat.izmir.bel.tr"));
    }

    #[test]
    fn missing_or_backwards_end_collapses_to_start() {
        let event = fixture(Some("2024-07-30T20:00:00"), None);
        let entry = CalendarEntry::from_event(&event, None).expect("entry");
        assert_eq!(entry.end, entry.start);

        let event = fixture(Some("2024-07-30T20:00:00"), Some("2024-07-29T20:00:00"));
        let entry = CalendarEntry::from_event(&event, None).expect("entry");
        assert_eq!(entry.end, entry.start);
    }

    #[test]
    fn missing_start_is_an_error() {
        let event = fixture(None, Some("2024-07-30T22:00:00"));
        assert!(matches!(
            CalendarEntry::from_event(&event, None),
            Err(CalendarError::MissingStart(42))
        ));
    }

    #[test]
    fn detail_venue_overrides_location() {
        let detail: EventDetail = serde_json::from_value(json!({
            "Id": 42,
            "Adi": "Jazz Night",
            "EtkinlikBaslamaTarihi": "2024-07-30T20:00:00",
            "EtkinlikMerkezi": "Kültürpark",
            "Aciklama": "<p>Uzun</p> açıklama",
            "Mekan": { "Adi": "AASSM", "Adres": "Mithatpaşa Cd. No:138" }
        }))
        .expect("detail fixture");
        let entry = CalendarEntry::from_detail(
            &detail,
            Some("https://kultursanat.izmir.bel.tr/Etkinlikler/jazz".into()),
        )
        .expect("entry");
        assert_eq!(
            entry.location.as_deref(),
            Some("AASSM, Mithatpaşa Cd. No:138")
        );
        assert_eq!(entry.notes.as_deref(), Some("Uzun açıklama"));
        assert!(entry.to_ics().contains("URL:https://kultursanat.izmir.bel.tr/Etkinlikler/jazz"));
    }
}
