use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{audio::queue::TrackRequest, sources::ResolvedTrack};

/// Colour palette shared by every embed
pub mod colors {
    use serenity::all::Colour;

    pub const NOW_PLAYING: Colour = Colour::new(0x1DB954);
    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
}

const STANDARD_FOOTER: &str = "🎵 queuecast";

const QUEUE_PREVIEW_LEN: usize = 20;

/// Discord rejects embed field values longer than this (in characters).
const FIELD_VALUE_LIMIT: usize = 1024;
/// Room kept free for the trailing "…and N more" line.
const OVERFLOW_NOTE_RESERVE: usize = 24;
const URL_DISPLAY_LEN: usize = 200;

pub fn create_now_playing_embed(track: &ResolvedTrack) -> CreateEmbed {
    let duration = track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "🔴 Live".to_string());

    CreateEmbed::default()
        .title("🎵 Now Playing")
        .description(format!("[{}]({})", track.title, track.canonical_url))
        .color(colors::NOW_PLAYING)
        .thumbnail(track.thumbnail_url())
        .field("⏱️ Duration", duration, true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_queued_embed(url: &str, position: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ Added to queue")
        .description(url)
        .color(colors::SUCCESS_GREEN)
        .field("📋 Position", position.to_string(), true)
        .footer(CreateEmbedFooter::new(
            "Plays automatically when the current track ends",
        ))
}

pub fn create_queue_embed(current: Option<&ResolvedTrack>, pending: &[TrackRequest]) -> CreateEmbed {
    let now = current
        .map(|track| format!("[{}]({})", track.title, track.canonical_url))
        .unwrap_or_else(|| "Nothing".to_string());

    let listing = queue_listing(pending);

    CreateEmbed::default()
        .title("📋 Queue")
        .color(colors::INFO_BLUE)
        .field("🎵 Now playing", now, false)
        .field(format!("Up next ({})", pending.len()), listing, false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Numbered pending URLs, cut short to fit one embed field.
fn queue_listing(pending: &[TrackRequest]) -> String {
    if pending.is_empty() {
        return "The queue is empty".to_string();
    }

    let budget = FIELD_VALUE_LIMIT - OVERFLOW_NOTE_RESERVE;
    let mut listing = String::new();
    let mut used = 0;
    let mut shown = 0;

    for (index, request) in pending.iter().take(QUEUE_PREVIEW_LEN).enumerate() {
        let line = format!("`{}.` {}", index + 1, shorten(&request.url, URL_DISPLAY_LEN));
        let cost = line.chars().count() + usize::from(shown > 0);
        if used + cost > budget {
            break;
        }
        if shown > 0 {
            listing.push('\n');
        }
        listing.push_str(&line);
        used += cost;
        shown += 1;
    }

    if shown < pending.len() {
        listing.push_str(&format!("\n…and {} more", pending.len() - shown));
    }
    listing
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars - 1).collect();
    short.push('…');
    short
}

pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
