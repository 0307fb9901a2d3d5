use std::fmt::Write as _;

use crate::format::{clean_text, format_date, format_time, DateDisplay};
use crate::models::{Event, EventDetail, Session};
use crate::store::{DetailState, FetchStatus};

pub fn list_line(event: &Event) -> String {
    let mut line = format!("[{}] {}", event.id, event.title());
    if let Some(category) = event.category.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = write!(line, " | {}", category.trim());
    }
    let _ = write!(line, " | {}", event.price_label());
    let date = event.starts_at.as_deref().map(format_date).unwrap_or_default();
    if !date.is_empty() {
        let _ = write!(line, " | {date}");
    }
    line
}

pub fn render_list(events: &[Event]) -> String {
    if events.is_empty() {
        return "Etkinlik bulunamadı.".to_string();
    }
    events.iter().map(list_line).collect::<Vec<_>>().join("\n")
}

pub fn render_status(status: &FetchStatus) -> Option<String> {
    match status {
        FetchStatus::Loading => Some("Loading...".to_string()),
        FetchStatus::Failed(message) => Some(format!("Error: {message}")),
        FetchStatus::Idle | FetchStatus::Succeeded => None,
    }
}

/// Detail screen text. The base event always renders; the detail slot only
/// adds to it.
pub fn render_detail(event: &Event, detail: &DetailState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", event.title());

    let description = event
        .short_description
        .as_deref()
        .map(clean_text)
        .unwrap_or_default();
    if !description.is_empty() {
        let _ = writeln!(out, "{description}");
    }
    if let Some(venue) = event.venue_name.as_deref().filter(|v| !v.trim().is_empty()) {
        let _ = writeln!(out, "Mekan: {}", venue.trim());
    }
    let _ = writeln!(out, "{}", event.price_label());
    for line in DateDisplay::for_event(event).lines() {
        let _ = writeln!(out, "{line}");
    }
    if event.ticket_url.as_deref().is_some_and(|t| !t.trim().is_empty()) {
        let _ = writeln!(out, "Bilet satışı mevcut");
    }
    if let Some(image) = event.image_url() {
        let _ = writeln!(out, "Afiş: {}", image.trim());
    }

    match detail {
        DetailState::Loaded(detail) if detail.event.id == event.id => {
            render_more_info(&mut out, detail);
        }
        DetailState::Failed { id, message } if *id == event.id => {
            let _ = writeln!(out, "Ek bilgi alınamadı: {message}");
        }
        _ => {}
    }
    out.trim_end().to_string()
}

fn render_more_info(out: &mut String, detail: &EventDetail) {
    if let Some(description) = detail.description.as_deref().map(clean_text) {
        if !description.is_empty() {
            let _ = writeln!(out, "\n{description}");
        }
    }
    if let Some(venue) = &detail.venue {
        let parts: Vec<&str> = [venue.name.as_deref(), venue.address.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !parts.is_empty() {
            let _ = writeln!(out, "Adres: {}", parts.join(", "));
        }
    }
    if !detail.sessions.is_empty() {
        let _ = writeln!(out, "Seanslar:");
        for session in &detail.sessions {
            let _ = writeln!(out, "  {}", session_line(session));
        }
    }
}

fn session_line(session: &Session) -> String {
    let start = session.starts_at.as_deref().unwrap_or_default();
    let end = session.ends_at.as_deref().unwrap_or_default();
    let mut line = format!("{} {}", format_date(start), format_time(start));
    let end_time = format_time(end);
    if !end_time.is_empty() {
        let _ = write!(line, "-{end_time}");
    }
    if let Some(venue) = session.venue_name.as_deref().filter(|v| !v.trim().is_empty()) {
        let _ = write!(line, " @ {}", venue.trim());
    }
    line.trim().to_string()
}
