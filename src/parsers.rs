// src/parsers.rs
//! Best-effort readers for console text.
//!
//! The console output format is not a stable protocol: wording changes between
//! server versions, plugins and locales. Every function here is total. Input that
//! is not recognized yields `None` or an empty collection, never an error.
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::performance::{HeapEntry, MemoryReading, TpsReading};

pub const DEFAULT_TPS: f64 = 20.0;
pub const MAX_TPS: f64 = 20.0;

const TPS_MARKER: &str = "TPS from last";
const MSPT_MARKER: &str = "MSPT";

lazy_static! {
    static ref FORMATTING_CODE: Regex = Regex::new(r"§.").unwrap();
    static ref DECIMAL: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
    // A number plus whatever letters trail it, so `5m` can be told apart from `20.0`.
    static ref QUANTITY: Regex = Regex::new(r"(\d+(?:\.\d+)?)([A-Za-z%]*)").unwrap();
    static ref COUNT_LINE: Regex = Regex::new(
        r"(?i)\d+\s+(?:players?|игрок)|\d+\s*(?:of|из)\s+(?:a\s+max(?:imum)?\s+of\s+)?\d+|\d+\s*/\s*\d+"
    ).unwrap();
    static ref COUNT_OF: Regex = Regex::new(
        r"(?i)(\d+)\s*(?:of|из)\s+(?:a\s+max(?:imum)?\s+of\s+)?(\d+)"
    ).unwrap();
    static ref COUNT_SLASH: Regex = Regex::new(r"(\d+)\s*/\s*(\d+)").unwrap();
    static ref MEMORY_RATIO: Regex = Regex::new(
        r"(?i)(\d+)\s*([kmgt]i?b)\s*/\s*(\d+)\s*([kmgt]i?b)"
    ).unwrap();
    static ref TIMES: Regex = Regex::new(r"(?i)(\d+)\s+times").unwrap();
    static ref INTEGER: Regex = Regex::new(r"\d+").unwrap();
    static ref HEAP_LINE: Regex = Regex::new(r"^\s*(\d+)\s+(\d+)\s+(.+)$").unwrap();
}

fn strip_formatting(raw: &str) -> std::borrow::Cow<'_, str> {
    FORMATTING_CODE.replace_all(raw, "")
}

fn is_count_line(line: &str) -> bool {
    COUNT_LINE.is_match(line)
}

/// Player names from a `list` reply.
///
/// A line carries names when it has a colon and something left after the
/// first colon. Count announcements are skipped unless the count sits before
/// the colon, as in vanilla's one-line `There are 2 of a max of 20 players
/// online: Steve, Alex`. Names after the colon may be comma separated.
pub fn parse_player_list(raw: &str) -> Vec<String> {
    let text = strip_formatting(raw);
    let mut players = Vec::new();

    for line in text.lines() {
        let Some((head, rest)) = line.split_once(':') else {
            continue;
        };
        if is_count_line(rest) || (is_count_line(line) && !is_count_line(head)) {
            continue;
        }
        players.extend(
            rest.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
    }

    players
}

/// `(online, max)` from the first count announcement, e.g. "There are 2 of a max of 20 players online".
pub fn parse_player_counts(raw: &str) -> Option<(u32, u32)> {
    for line in raw.lines() {
        let caps = COUNT_OF.captures(line).or_else(|| COUNT_SLASH.captures(line));
        if let Some(caps) = caps {
            let online = caps[1].parse().ok();
            let max = caps[2].parse().ok();
            if let (Some(online), Some(max)) = (online, max) {
                return Some((online, max));
            }
        }
    }
    None
}

/// Whether a `list` reply looks like a player listing at all.
pub fn is_player_listing(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    lower.contains("player") || lower.contains("игрок") || !parse_player_list(raw).is_empty()
}

/// Splits the text after `marker` into the label part and the value part.
/// Without a colon both parts are the same text.
fn report_parts<'a>(line: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let start = line.find(marker)? + marker.len();
    let after = &line[start..];
    Some(after.rsplit_once(':').unwrap_or((after, after)))
}

fn bare_values(text: &str) -> Vec<f64> {
    QUANTITY
        .captures_iter(text)
        .filter(|caps| caps[2].is_empty())
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

fn window_labels(text: &str) -> Vec<String> {
    QUANTITY
        .captures_iter(text)
        .filter(|caps| matches!(&caps[2], "s" | "m" | "h"))
        .map(|caps| format!("{}{}", &caps[1], &caps[2]))
        .collect()
}

/// Values on the report line, or on the next line when the report line stops at its colon.
fn report_values(lines: &[&str], index: usize, values_part: &str) -> Vec<f64> {
    let values = bare_values(values_part);
    if !values.is_empty() {
        return values;
    }
    lines.get(index + 1).map(|next| bare_values(next)).unwrap_or_default()
}

fn assign_windows(reading: &mut TpsReading, labels: &[String], values: &[f64]) {
    if values.len() < 3 {
        return;
    }

    let labelled = |window: &str| {
        labels
            .iter()
            .position(|label| label.as_str() == window)
            .and_then(|i| values.get(i).copied())
    };

    let has_windows = ["1m", "5m", "15m"]
        .iter()
        .all(|w| labels.iter().any(|l| l.as_str() == *w));

    if labels.len() == values.len() && has_windows {
        reading.tps_1m = labelled("1m");
        reading.tps_5m = labelled("5m");
        reading.tps_15m = labelled("15m");
    } else {
        reading.tps_1m = Some(values[0]);
        reading.tps_5m = Some(values[1]);
        reading.tps_15m = Some(values[2]);
    }
    reading.tps = Some(values[0]);
}

/// Rolling TPS averages and tick duration from `spark tps`.
pub fn parse_spark_tps(raw: &str) -> Option<TpsReading> {
    let text = strip_formatting(raw);
    let lines: Vec<&str> = text.lines().collect();
    let mut reading = TpsReading::default();

    for (i, line) in lines.iter().enumerate() {
        if let Some((labels, values)) = report_parts(line, TPS_MARKER) {
            let values = report_values(&lines, i, values);
            assign_windows(&mut reading, &window_labels(labels), &values);
        }

        if let Some((_, values)) = report_parts(line, MSPT_MARKER) {
            if let Some(mspt) = report_values(&lines, i, values).first() {
                reading.mspt = Some(*mspt);
            }
        }
    }

    (reading != TpsReading::default()).then_some(reading)
}

fn megabytes(value: u64, unit: &str) -> u64 {
    match unit.to_ascii_lowercase().chars().next() {
        Some('k') => value / 1024,
        Some('g') => value.saturating_mul(1024),
        Some('t') => value.saturating_mul(1024 * 1024),
        _ => value,
    }
}

/// Heap usage and collection count from `spark gc`.
///
/// Used and total keep the console's unit when both sides agree, otherwise
/// both are converted to megabytes.
pub fn parse_spark_memory(raw: &str) -> Option<MemoryReading> {
    let mut reading = MemoryReading::default();

    for line in raw.lines() {
        if reading.memory_used.is_none() {
            if let Some(caps) = MEMORY_RATIO.captures(line) {
                let used: Option<u64> = caps[1].parse().ok();
                let total: Option<u64> = caps[3].parse().ok();
                if let (Some(mut used), Some(mut total)) = (used, total) {
                    if !caps[2].eq_ignore_ascii_case(&caps[4]) {
                        used = megabytes(used, &caps[2]);
                        total = megabytes(total, &caps[4]);
                    }
                    reading.memory_used = Some(used);
                    reading.memory_total = Some(total);
                    reading.memory_percent = (total > 0)
                        .then(|| ((used as f64 / total as f64) * 100.0).round() as u64);
                }
            }
        }

        if line.to_lowercase().contains("collections") {
            let count = TIMES
                .captures(line)
                .and_then(|caps| caps[1].parse().ok())
                .or_else(|| {
                    let tail = line.rsplit_once(':').map(|(_, t)| t).unwrap_or(line);
                    INTEGER.find(tail).and_then(|m| m.as_str().parse().ok())
                });
            if count.is_some() {
                reading.gc_collections = count;
            }
        }
    }

    (reading != MemoryReading::default()).then_some(reading)
}

/// Class records from `spark heapsummary`, largest first.
pub fn parse_heap_summary(raw: &str) -> Vec<HeapEntry> {
    let mut entries: Vec<HeapEntry> = raw
        .lines()
        .filter_map(|line| {
            let caps = HEAP_LINE.captures(line)?;
            let class_name = caps[3].trim();
            if class_name.is_empty() {
                return None;
            }
            Some(HeapEntry {
                class_name: class_name.to_string(),
                instances: caps[1].parse().ok()?,
                bytes: caps[2].parse().ok()?,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    entries
}

/// Current tick rate from a plain `tps` reply: the last number in `[0, 20]`.
pub fn parse_fallback_tps(raw: &str) -> f64 {
    DECIMAL
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|tps| (0.0..=MAX_TPS).contains(tps))
        .last()
        .unwrap_or(DEFAULT_TPS)
}
