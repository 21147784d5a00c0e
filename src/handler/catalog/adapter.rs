//! Adapter layer: Convert catalog documents to domain models
//!
//! This is the ONLY place where catalog document types are converted to
//! domain types. References become stubs carrying the uniform URI of the
//! referenced document.

use chrono::{DateTime, NaiveDate, Utc};

use super::dto;
use crate::model::{
    Album, Artwork, Creator, Disc, Format, MediaObject, ObjectKind, Stream, Transcript,
    TranscriptLine,
};

/// Formats every catalog stream can be served in, best first.
pub fn catalog_formats() -> Vec<Format> {
    vec![
        Format {
            id: 0,
            name: "FLAC 24-bit".to_string(),
            container_format: "flac".to_string(),
            codec: "flac".to_string(),
            bitrate_bps: 0,
            bit_depth: 24,
            sample_rate_hz: 96_000,
            ..Default::default()
        },
        Format {
            id: 1,
            name: "FLAC".to_string(),
            container_format: "flac".to_string(),
            codec: "flac".to_string(),
            bitrate_bps: 0,
            bit_depth: 16,
            sample_rate_hz: 44_100,
            ..Default::default()
        },
        Format {
            id: 2,
            name: "Ogg Vorbis 320".to_string(),
            container_format: "ogg".to_string(),
            codec: "vorbis".to_string(),
            bitrate_bps: 320_000,
            bit_depth: 16,
            sample_rate_hz: 44_100,
            ..Default::default()
        },
        Format {
            id: 3,
            name: "Ogg Vorbis 160".to_string(),
            container_format: "ogg".to_string(),
            codec: "vorbis".to_string(),
            bitrate_bps: 160_000,
            bit_depth: 16,
            sample_rate_hz: 44_100,
            ..Default::default()
        },
    ]
}

fn uri(provider: &str, kind: ObjectKind, id: &str) -> String {
    format!("{provider}:{kind}:{id}")
}

/// Turn a reference into a stub of the given kind.
pub fn to_stub(provider: &str, kind: ObjectKind, reference: &dto::RefDoc) -> MediaObject {
    MediaObject::stub(kind, provider, uri(provider, kind, &reference.id), &reference.name)
}

fn to_stubs(provider: &str, kind: ObjectKind, references: &[dto::RefDoc]) -> Vec<MediaObject> {
    references
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| to_stub(provider, kind, r))
        .collect()
}

fn to_artworks(docs: Vec<dto::ArtworkDoc>) -> Vec<Artwork> {
    docs.into_iter()
        .map(|a| Artwork {
            width: a.width,
            height: a.height,
            url: a.url,
            file_type: a.file_type,
        })
        .collect()
}

/// Parse a debut date given as `YYYY-MM-DD` or RFC 3339.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

pub fn to_creator(provider: &str, doc: dto::CreatorDoc) -> Creator {
    let debut_date = doc.debut.as_deref().and_then(|raw| {
        let parsed = parse_date(raw);
        if parsed.is_none() {
            tracing::debug!(provider, raw, "Ignoring unparseable debut date");
        }
        parsed
    });

    Creator {
        name: doc.name,
        description: doc.description,
        genres: doc.genres,
        albums: to_stubs(provider, ObjectKind::Album, &doc.albums),
        top_streams: to_stubs(provider, ObjectKind::Stream, &doc.top_tracks),
        appearances: to_stubs(provider, ObjectKind::Album, &doc.appearances),
        singles: to_stubs(provider, ObjectKind::Stream, &doc.singles),
        playlists: to_stubs(provider, ObjectKind::Album, &doc.playlists),
        related: to_stubs(provider, ObjectKind::Creator, &doc.related),
        artworks: to_artworks(doc.artworks),
        debut_date,
    }
}

pub fn to_album(provider: &str, doc: dto::AlbumDoc) -> Album {
    let discs = doc
        .discs
        .into_iter()
        .enumerate()
        .map(|(i, disc)| Disc {
            // Discs without an explicit number are numbered by position
            number: if disc.number == 0 { i as u32 + 1 } else { disc.number },
            name: disc.name,
            artworks: Vec::new(),
            streams: to_stubs(provider, ObjectKind::Stream, &disc.tracks),
        })
        .collect();

    Album {
        name: doc.name,
        description: doc.description,
        release_date: doc.released,
        discs,
        copyrights: doc.copyrights,
        label: doc.label,
        artworks: to_artworks(doc.artworks),
        creators: to_stubs(provider, ObjectKind::Creator, &doc.artists),
    }
}

/// Convert a track. `formats` are the provider's templates, best first.
pub fn to_stream(provider: &str, doc: dto::TrackDoc, formats: &[Format]) -> Stream {
    let formats = match &doc.formats {
        None => formats.to_vec(),
        Some(ids) => formats.iter().filter(|f| ids.contains(&f.id)).cloned().collect(),
    };
    let album = doc
        .album
        .as_ref()
        .filter(|a| !a.id.is_empty())
        .map(|a| Box::new(to_stub(provider, ObjectKind::Album, a)));

    Stream {
        name: doc.name,
        track_number: doc.number,
        duration_seconds: doc.duration_secs,
        formats,
        creators: to_stubs(provider, ObjectKind::Creator, &doc.artists),
        album,
        transcript: None,
        explicit: doc.explicit,
        visual: doc.visual,
        language: doc.language,
        artworks: to_artworks(doc.artworks),
        release_date: doc.released,
        extra_metadata: doc.extra,
    }
}

/// Parse LRC-style lyrics.
///
/// Lines tagged `[mm:ss.xx]` are timed; if no line carries a timestamp the
/// transcript is plain text. Metadata tags such as `[ar:Someone]` are dropped.
pub fn parse_lrc(id: &str, text: &str) -> Transcript {
    let mut lines = Vec::new();
    let mut timed = false;

    for raw in text.lines() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match parse_lrc_tag(raw) {
            LrcLine::Timed(start_time_ms, text) => {
                timed = true;
                lines.push(TranscriptLine {
                    start_time_ms,
                    text: text.to_string(),
                });
            }
            LrcLine::Meta => {}
            LrcLine::Plain(text) => lines.push(TranscriptLine {
                start_time_ms: 0,
                text: text.to_string(),
            }),
        }
    }

    Transcript {
        lines,
        time_synced: timed,
        right_to_left: false,
        provider_id: id.to_string(),
    }
}

enum LrcLine<'a> {
    Timed(u64, &'a str),
    Meta,
    Plain(&'a str),
}

fn parse_lrc_tag(line: &str) -> LrcLine<'_> {
    let Some(rest) = line.strip_prefix('[') else {
        return LrcLine::Plain(line);
    };
    let Some((tag, text)) = rest.split_once(']') else {
        return LrcLine::Plain(line);
    };
    match parse_timestamp(tag) {
        Some(ms) => LrcLine::Timed(ms, text.trim()),
        None if tag.contains(':') => LrcLine::Meta,
        None => LrcLine::Plain(line),
    }
}

/// `mm:ss`, `mm:ss.x`, `mm:ss.xx` or `mm:ss.xxx` to milliseconds.
fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, seconds) = tag.split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;
    let (secs, frac) = seconds.split_once('.').unwrap_or((seconds, ""));
    let secs: u64 = secs.parse().ok()?;
    if secs >= 60 {
        return None;
    }
    let frac_ms = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().ok()? * 100,
        2 => frac.parse::<u64>().ok()? * 10,
        3 => frac.parse::<u64>().ok()?,
        _ => return None,
    };
    // Out-of-range minute counts are not timestamps
    minutes.checked_mul(60_000)?.checked_add(secs * 1000 + frac_ms)
}

/// Rewrite `{{kind:id|text}}` links into markdown links to uniform URIs.
///
/// Unknown kinds and malformed links are left untouched.
pub fn replace_links(provider: &str, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        match rewrite_link(provider, inner) {
            Some(link) => out.push_str(&link),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn rewrite_link(provider: &str, inner: &str) -> Option<String> {
    let (target, label) = inner.split_once('|').unwrap_or((inner, ""));
    let (kind, id) = target.split_once(':')?;
    let kind = ObjectKind::from_type_segment(kind.trim())?;
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    let label = if label.is_empty() { id } else { label };
    Some(format!("[{}]({})", label, uri(provider, kind, id)))
}
