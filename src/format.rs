//! Display formatting for event fields.
//!
//! Timestamps from the API are wall-clock times in İzmir without an offset.
//! Everything here works on that wall-clock value, so output never depends on
//! the machine's locale or timezone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::models::Event;

pub const EVENT_TIMEZONE: Tz = chrono_tz::Europe::Istanbul;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--.*?-->|<\s*/?\s*([A-Za-z][A-Za-z0-9]*)[^<>]*>").expect("valid tag regex")
});
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]{2,8});").expect("valid entity regex")
});

// Tags that style a run of text rather than separate blocks of it.
const INLINE_TAGS: [&str; 11] = [
    "a", "b", "i", "u", "em", "strong", "span", "font", "small", "sub", "sup",
];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an API timestamp into İzmir wall-clock time.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&EVENT_TIMEZONE).naive_local());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `DD MM YYYY`, or an empty string when the input is not a timestamp.
pub fn format_date(input: &str) -> String {
    parse_timestamp(input)
        .map(|dt| format!("{:02} {:02} {}", dt.day(), dt.month(), dt.year()))
        .unwrap_or_default()
}

/// 24-hour `HH:MM`, or an empty string when the input is not a timestamp.
pub fn format_time(input: &str) -> String {
    parse_timestamp(input)
        .map(|dt| format!("{:02}:{:02}", dt.hour(), dt.minute()))
        .unwrap_or_default()
}

pub fn is_same_day(start: &str, end: &str) -> bool {
    match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(a), Some(b)) => a.date() == b.date(),
        _ => false,
    }
}

/// Strips markup from an API text fragment and normalises whitespace.
///
/// Runs decode, strip and collapse until the text stops changing, so the
/// result is a fixed point: `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn clean_pass(input: &str) -> String {
    let decoded = ENTITY_RE.replace_all(input, |caps: &Captures| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    let stripped = TAG_RE.replace_all(&decoded, |caps: &Captures| {
        let inline = caps
            .get(1)
            .map(|name| {
                let name = name.as_str().to_ascii_lowercase();
                INLINE_TAGS.contains(&name.as_str())
            })
            .unwrap_or(false);
        if inline {
            String::new()
        } else {
            " ".to_string()
        }
    });
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let ch = match body {
        "nbsp" => '\u{a0}',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        _ => return None,
    };
    Some(ch.to_string())
}

/// How the detail view shows an event's dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateDisplay {
    Single {
        date: String,
        start_time: String,
        end_time: String,
    },
    Range {
        start_date: String,
        end_date: String,
        start_time: String,
        end_time: String,
    },
}

impl DateDisplay {
    pub fn new(start: &str, end: &str) -> Self {
        let start_time = format_time(start);
        let end_time = format_time(end);
        if is_same_day(start, end) {
            DateDisplay::Single {
                date: format_date(start),
                start_time,
                end_time,
            }
        } else {
            DateDisplay::Range {
                start_date: format_date(start),
                end_date: format_date(end),
                start_time,
                end_time,
            }
        }
    }

    pub fn for_event(event: &Event) -> Self {
        Self::new(
            event.starts_at.as_deref().unwrap_or_default(),
            event.ends_at.as_deref().unwrap_or_default(),
        )
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            DateDisplay::Single {
                date,
                start_time,
                end_time,
            } => vec![
                format!("Tarih: {date}"),
                format!("Saat: {}", time_span(start_time, end_time)),
            ],
            DateDisplay::Range {
                start_date,
                end_date,
                start_time,
                end_time,
            } => vec![
                format!("Başlangıç: {start_date}"),
                format!("Bitiş: {end_date}"),
                format!("Saat: {}", time_span(start_time, end_time)),
            ],
        }
    }
}

fn time_span(start: &str, end: &str) -> String {
    match (start.is_empty(), end.is_empty()) {
        (false, false) => format!("{start} - {end}"),
        (false, true) => start.to_string(),
        (true, false) => end.to_string(),
        (true, true) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_date_and_time_zero_padded() {
        assert_eq!(format_date("2024-07-03T09:05:00"), "03 07 2024");
        assert_eq!(format_time("2024-07-03T09:05:00"), "09:05");
        assert_eq!(format_time("2024-07-03T21:30:00.000"), "21:30");
    }

    #[test]
    fn empty_or_garbage_timestamps_format_to_nothing() {
        assert_eq!(format_date(""), "");
        assert_eq!(format_time("not a date"), "");
        assert!(!is_same_day("", ""));
    }

    #[test]
    fn offset_timestamps_are_shown_in_izmir_time() {
        assert_eq!(format_time("2024-07-30T17:00:00Z"), "20:00");
        assert_eq!(format_date("2024-07-30T22:30:00+00:00"), "31 07 2024");
    }

    #[test]
    fn same_day_compares_calendar_date() {
        assert!(is_same_day("2024-07-30T20:00:00", "2024-07-30T22:00:00"));
        assert!(!is_same_day("2024-07-30T20:00:00", "2024-07-31T09:00:00"));
    }

    #[test]
    fn clean_text_strips_tags_and_decodes_nbsp() {
        assert_eq!(clean_text("Line1<br>Line2&nbsp;end"), "Line1 Line2 end");
        assert_eq!(
            clean_text("  <p>Açık\r\n\r\nhava</p><p>sineması</p> "),
            "Açık hava sineması"
        );
        assert_eq!(clean_text("<b>Jaz</b>z &amp; blues"), "Jazz & blues");
        assert_eq!(clean_text("a &lt;b&gt; c"), "a c");
        assert_eq!(clean_text("&#304;zmir &#x131;&#351;&#305;k"), "İzmir ışık");
        assert_eq!(clean_text("&unknown; stays"), "&unknown; stays");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn escaped_markup_is_stripped_once_decoded() {
        assert_eq!(
            clean_text("Yaş sınırı &lt;18&gt; ve &lt;b&gt; etiketi"),
            "Yaş sınırı <18> ve etiketi"
        );
        assert_eq!(clean_text("3 &lt; 5 &amp;&amp; 7 &gt; 2"), "3 < 5 && 7 > 2");
    }

    #[test]
    fn clean_text_handles_double_encoding() {
        let once = clean_text("x&amp;nbsp;y");
        assert_eq!(once, "x y");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn date_display_switches_on_same_day() {
        let single = DateDisplay::new("2024-07-30T20:00:00", "2024-07-30T22:00:00");
        assert_eq!(
            single,
            DateDisplay::Single {
                date: "30 07 2024".into(),
                start_time: "20:00".into(),
                end_time: "22:00".into(),
            }
        );
        assert_eq!(single.lines(), vec!["Tarih: 30 07 2024", "Saat: 20:00 - 22:00"]);

        let range = DateDisplay::new("2024-07-30T20:00:00", "2024-08-02T18:00:00");
        assert_eq!(
            range.lines(),
            vec![
                "Başlangıç: 30 07 2024",
                "Bitiş: 02 08 2024",
                "Saat: 20:00 - 18:00"
            ]
        );
    }

    proptest! {
        #[test]
        fn clean_text_is_idempotent(input in r"[a-zA-Z0-9 <>/&;#!\-\r\n\t]{0,64}") {
            let once = clean_text(&input);
            prop_assert_eq!(clean_text(&once), once);
        }

        #[test]
        fn clean_text_is_idempotent_on_markup(
            parts in prop::collection::vec(
                prop_oneof![
                    Just("<br>".to_string()),
                    Just("</p>".to_string()),
                    Just("&nbsp;".to_string()),
                    Just("&amp;".to_string()),
                    Just("&lt;".to_string()),
                    Just("&gt;".to_string()),
                    Just("\n".to_string()),
                    "[a-zçğıöşü]{1,5}",
                ],
                0..16,
            )
        ) {
            let input = parts.concat();
            let once = clean_text(&input);
            prop_assert_eq!(clean_text(&once), once);
        }

        #[test]
        fn formatting_is_deterministic(
            y in 1990i32..2100, m in 1u32..=12, d in 1u32..=28, h in 0u32..24, min in 0u32..60
        ) {
            let ts = format!("{y:04}-{m:02}-{d:02}T{h:02}:{min:02}:00");
            prop_assert_eq!(format_date(&ts), format_date(&ts));
            prop_assert_eq!(format_date(&ts), format!("{d:02} {m:02} {y}"));
            prop_assert_eq!(format_time(&ts), format!("{h:02}:{min:02}"));
        }
    }
}
