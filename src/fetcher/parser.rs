//! Parsers for yt-dlp output
//!
//! Two kinds of output are handled: progress lines streamed on stdout while a
//! download runs, and the JSON info documents printed by `--dump-single-json`.

use super::traits::FetchProgress;
use crate::types::{ChannelInfo, ChannelSearchResult, VideoInfo, VideoSummary};
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Prefix of lines produced by [`PROGRESS_TEMPLATE`]
pub const PROGRESS_PREFIX: &str = "[progress]";

/// Template handed to `--progress-template`
///
/// Produces `[progress] <status> <downloaded> <total> <estimate>`, with `NA`
/// for fields the extractor does not know.
pub const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

const VIDEO_DESCRIPTION_LIMIT: usize = 500;
const SUMMARY_DESCRIPTION_LIMIT: usize = 200;
const STDERR_TAIL_LINES: usize = 5;

static DOWNLOAD_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*(\d+(?:\.\d+)?)\s*([KMGT]?i?B)").ok()
});

/// Parse one stdout line into a progress event
///
/// Understands the structured [`PROGRESS_TEMPLATE`] output and, as a fallback,
/// yt-dlp's default `[download]  45.3% of 3.20MiB` lines.
pub fn parse_progress_line(line: &str) -> Option<FetchProgress> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_template_fields(rest);
    }

    if line.starts_with("[download]") {
        return parse_default_download_line(line);
    }

    None
}

fn parse_template_fields(rest: &str) -> Option<FetchProgress> {
    let mut fields = rest.split_whitespace();
    let status = fields.next()?;
    let downloaded = fields.next().and_then(parse_number);
    let total = fields.next().and_then(parse_number);
    let estimate = fields.next().and_then(parse_number);

    match status {
        "finished" => Some(FetchProgress::Finished),
        "downloading" => Some(FetchProgress::Downloading {
            downloaded_bytes: downloaded.unwrap_or(0),
            total_bytes: total.or(estimate).filter(|t| *t > 0),
        }),
        _ => None,
    }
}

fn parse_default_download_line(line: &str) -> Option<FetchProgress> {
    let regex = DOWNLOAD_LINE.as_ref()?;
    let caps = regex.captures(line)?;

    let percent: f64 = caps.get(1)?.as_str().parse().ok()?;
    let size: f64 = caps.get(2)?.as_str().parse().ok()?;
    let total = (size * unit_multiplier(caps.get(3)?.as_str())) as u64;
    let downloaded = (total as f64 * (percent / 100.0).clamp(0.0, 1.0)) as u64;

    Some(FetchProgress::Downloading {
        downloaded_bytes: downloaded,
        total_bytes: (total > 0).then_some(total),
    })
}

// yt-dlp prints integers for byte counts but may emit floats for estimates
fn parse_number(raw: &str) -> Option<u64> {
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1_000.0,
        "MB" => 1_000_000.0,
        "GB" => 1_000_000_000.0,
        "TB" => 1_000_000_000_000.0,
        _ => 1.0,
    }
}

/// Reduce captured stderr to the lines worth reporting
///
/// Prefers `ERROR:` lines; otherwise keeps the last few non-empty lines.
pub fn summarize_stderr(stderr: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }

    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Build a [`VideoInfo`] from a detailed (non-flat) info document
pub fn video_info_from_json(video_id: &str, info: &Value) -> VideoInfo {
    VideoInfo {
        id: video_id.to_string(),
        title: str_field(info, "title"),
        description: truncate(&str_field(info, "description"), VIDEO_DESCRIPTION_LIMIT),
        duration: info.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
        uploader: str_field(info, "uploader"),
        channel_id: str_field(info, "channel_id"),
        channel: str_field(info, "channel"),
        view_count: u64_field(info, "view_count"),
        like_count: u64_field(info, "like_count"),
        upload_date: str_field(info, "upload_date"),
        webpage_url: str_field(info, "webpage_url"),
        thumbnail: last_thumbnail(info).unwrap_or_else(|| default_thumbnail(video_id)),
        updated_at: Utc::now(),
    }
}

/// Build a [`ChannelInfo`] from a channel's `/videos` listing
pub fn channel_info_from_json(channel_id: &str, info: &Value) -> ChannelInfo {
    let entries = entries(info);
    let thumbnail = info
        .get("thumbnail")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| last_thumbnail(info))
        .or_else(|| entries.first().and_then(last_thumbnail))
        .unwrap_or_default();

    ChannelInfo {
        channel_id: channel_id.to_string(),
        title: info
            .get("channel")
            .or_else(|| info.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: truncate(&str_field(info, "description"), VIDEO_DESCRIPTION_LIMIT),
        subscriber_count: info
            .get("channel_follower_count")
            .or_else(|| info.get("subscriber_count"))
            .and_then(Value::as_u64),
        video_count: entries.len() as u64,
        thumbnail,
        uploader: str_field(info, "uploader"),
        webpage_url: format!("https://www.youtube.com/channel/{channel_id}"),
        updated_at: Utc::now(),
    }
}

/// Build up to `limit` [`VideoSummary`] entries from a flat channel listing
pub fn video_summaries_from_json(info: &Value, limit: usize) -> Vec<VideoSummary> {
    entries(info)
        .iter()
        .filter(|e| e.is_object())
        .take(limit)
        .map(|entry| {
            let video_id = str_field(entry, "id");
            VideoSummary {
                title: str_field(entry, "title"),
                description: truncate(&str_field(entry, "description"), SUMMARY_DESCRIPTION_LIMIT),
                duration: entry.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
                upload_date: str_field(entry, "upload_date"),
                view_count: u64_field(entry, "view_count"),
                thumbnail: last_thumbnail(entry).unwrap_or_else(|| default_thumbnail(&video_id)),
                webpage_url: entry
                    .get("webpage_url")
                    .or_else(|| entry.get("url"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={video_id}")),
                video_id,
            }
        })
        .collect()
}

/// Build channel search results, deduplicated by channel ID in first-seen order
pub fn channel_search_from_json(info: &Value) -> Vec<ChannelSearchResult> {
    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();

    for entry in entries(info) {
        let Some(channel_id) = entry
            .get("channel_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        if !seen.insert(channel_id.to_string()) {
            continue;
        }

        results.push(ChannelSearchResult {
            channel_id: channel_id.to_string(),
            title: entry
                .get("channel")
                .or_else(|| entry.get("uploader"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            description: truncate(&str_field(entry, "description"), SUMMARY_DESCRIPTION_LIMIT),
            thumbnail: last_thumbnail(entry).unwrap_or_default(),
            subscriber_count: None,
            video_count: None,
            webpage_url: format!("https://www.youtube.com/channel/{channel_id}"),
        });
    }

    results
}

fn entries(info: &Value) -> &[Value] {
    info.get("entries")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn last_thumbnail(value: &Value) -> Option<String> {
    value
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|t| t.last())
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn default_thumbnail(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
