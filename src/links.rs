use std::path::Path;

use reqwest::Url;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{Event, EventDetail};

pub const DEFAULT_SITE_BASE: &str = "https://kultursanat.izmir.bel.tr/Etkinlikler";

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("event has no {0}")]
    Missing(&'static str),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("coordinates not found")]
    CoordinatesNotFound,
    #[error("failed to open {target}: {reason}")]
    Launch { target: String, reason: String },
}

/// Hands URLs and files to whatever the platform uses to open them.
pub trait Launcher {
    fn open_url(&self, url: &Url) -> Result<(), LinkError>;
    fn open_path(&self, path: &Path) -> Result<(), LinkError>;
}

pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &Url) -> Result<(), LinkError> {
        opener::open_browser(url.as_str()).map_err(|err| LinkError::Launch {
            target: url.to_string(),
            reason: err.to_string(),
        })
    }

    fn open_path(&self, path: &Path) -> Result<(), LinkError> {
        opener::open(path).map_err(|err| LinkError::Launch {
            target: path.display().to_string(),
            reason: err.to_string(),
        })
    }
}

/// Parses `candidate` and accepts it only as an absolute http(s) URL.
pub fn web_url(candidate: &str) -> Result<Url, LinkError> {
    let trimmed = candidate.trim();
    let parsed =
        Url::parse(trimmed).map_err(|_| LinkError::InvalidUrl(trimmed.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(LinkError::InvalidUrl(trimmed.to_string())),
    }
}

/// `<base>/<path>` with a single slash at the join.
pub fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

pub fn event_page_url(site_base: &str, event: &Event) -> Result<Url, LinkError> {
    let path = event
        .page_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(LinkError::Missing("page path"))?;
    web_url(&join_path(site_base, path))
}

pub fn ticket_url(event: &Event) -> Result<Url, LinkError> {
    let link = event
        .ticket_url
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(LinkError::Missing("ticket link"))?;
    web_url(link)
}

/// Opens a validated URL. Anything that is not absolute http(s) is logged and
/// never reaches the launcher.
pub fn open_validated(
    launcher: &dyn Launcher,
    what: &str,
    url: Result<Url, LinkError>,
) -> Result<Url, LinkError> {
    let url = match url {
        Ok(url) => url,
        Err(err) => {
            error!(target: "links", %err, "refusing to open {what}");
            return Err(err);
        }
    };
    info!(target: "links", %url, "opening {what}");
    launcher.open_url(&url).map_err(|err| {
        error!(target: "links", %err, "an error occurred while opening the {what}");
        err
    })?;
    Ok(url)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Parses API coordinate strings, which may use a decimal comma.
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Result<Self, LinkError> {
        let latitude = parse_component(latitude).ok_or(LinkError::CoordinatesNotFound)?;
        let longitude = parse_component(longitude).ok_or(LinkError::CoordinatesNotFound)?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            warn!(target: "links", latitude, longitude, "coordinates out of range");
            return Err(LinkError::CoordinatesNotFound);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn from_event(event: &Event) -> Result<Self, LinkError> {
        Self::parse(event.latitude.as_deref(), event.longitude.as_deref())
    }

    pub fn from_detail(detail: &EventDetail) -> Result<Self, LinkError> {
        let (lat, lon) = detail.coordinates_raw();
        Self::parse(lat, lon)
    }

    /// URI understood by device map applications.
    pub fn geo_uri(&self) -> String {
        format!("geo:{},{}", self.latitude, self.longitude)
    }

    pub fn map_url(&self) -> Result<Url, LinkError> {
        Url::parse_with_params(
            "https://www.google.com/maps/search/",
            [
                ("api", "1".to_string()),
                ("query", format!("{},{}", self.latitude, self.longitude)),
            ],
        )
        .map_err(|err| LinkError::InvalidUrl(err.to_string()))
    }
}

fn parse_component(raw: Option<&str>) -> Option<f64> {
    let normalized = raw?.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    pub(crate) struct RecordingLauncher {
        pub urls: RefCell<Vec<String>>,
        pub paths: RefCell<Vec<PathBuf>>,
    }

    impl Launcher for RecordingLauncher {
        fn open_url(&self, url: &Url) -> Result<(), LinkError> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(())
        }

        fn open_path(&self, path: &Path) -> Result<(), LinkError> {
            self.paths.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn event_with(page: Option<&str>, ticket: Option<&str>) -> Event {
        serde_json::from_value(serde_json::json!({
            "Id": 1,
            "Adi": "Test Event",
            "EtkinlikUrl": page,
            "BiletSatisLinki": ticket,
        }))
        .expect("event fixture")
    }

    #[test]
    fn joins_site_base_and_page_path() {
        let event = event_with(Some("/test-event"), None);
        let url = event_page_url(DEFAULT_SITE_BASE, &event).expect("page url");
        assert_eq!(
            url.as_str(),
            "https://kultursanat.izmir.bel.tr/Etkinlikler/test-event"
        );
        let url = event_page_url("https://example.com/base/", &event).expect("page url");
        assert_eq!(url.as_str(), "https://example.com/base/test-event");
    }

    #[test]
    fn non_http_urls_are_rejected() {
        assert!(matches!(
            web_url("javascript:alert(1)"),
            Err(LinkError::InvalidUrl(_))
        ));
        assert!(matches!(web_url("ftp://x.org/a"), Err(LinkError::InvalidUrl(_))));
        assert!(matches!(web_url("bilet/123"), Err(LinkError::InvalidUrl(_))));
        assert!(web_url(" https://biletinial.com/x ").is_ok());
    }

    #[test]
    fn invalid_ticket_link_never_reaches_launcher() {
        let launcher = RecordingLauncher::default();
        let event = event_with(Some("x"), Some("www.bilet.com/1"));
        let result = open_validated(&launcher, "ticket page", ticket_url(&event));
        assert!(result.is_err());
        assert!(launcher.urls.borrow().is_empty());

        let event = event_with(Some("x"), Some("https://www.bilet.com/1"));
        open_validated(&launcher, "ticket page", ticket_url(&event)).expect("opens");
        assert_eq!(*launcher.urls.borrow(), vec!["https://www.bilet.com/1"]);
    }

    #[test]
    fn missing_links_are_reported() {
        let event = event_with(None, None);
        assert!(matches!(
            event_page_url(DEFAULT_SITE_BASE, &event),
            Err(LinkError::Missing("page path"))
        ));
        assert!(matches!(ticket_url(&event), Err(LinkError::Missing("ticket link"))));
    }

    #[test]
    fn coordinates_accept_decimal_comma() {
        let coords = Coordinates::parse(Some("38,4237"), Some(" 27.1428 ")).expect("coords");
        assert_eq!(coords.latitude, 38.4237);
        assert_eq!(coords.longitude, 27.1428);
        assert_eq!(coords.geo_uri(), "geo:38.4237,27.1428");
        assert_eq!(
            coords.map_url().expect("map url").as_str(),
            "https://www.google.com/maps/search/?api=1&query=38.4237%2C27.1428"
        );
    }

    #[test]
    fn malformed_coordinates_are_not_found() {
        for (lat, lon) in [
            (None, Some("27.1")),
            (Some(""), Some("27.1")),
            (Some("abc"), Some("27.1")),
            (Some("38,1,2"), Some("27.1")),
            (Some("123"), Some("27.1")),
        ] {
            let err = Coordinates::parse(lat, lon).expect_err("should fail");
            assert_eq!(err.to_string(), "coordinates not found");
        }
    }
}
