//! Output formatters for snapshots, history tables, and the message feed.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use chrono::Local;
use serde::Serialize;

use crate::backend::Pager;
use crate::feed::{Message, Sender};
use crate::models::{
    CityForecast, EarthquakeRecord, ForecastRecord, SystemConfig, WarningRecord, WeatherSnapshot,
};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const RED: &str = "\x1b[91m"; // errors
const YELLOW: &str = "\x1b[93m"; // warnings
const CYAN: &str = "\x1b[96m"; // AI bulletins
const GREEN: &str = "\x1b[92m"; // ok / system
const ORANGE: &str = "\x1b[38;5;208m"; // warning titles

// Icons for visual richness
const ICON_BOT: &str = "🤖";
const ICON_CITY: &str = "📍";
const ICON_WARN: &str = "⚠️";
const ICON_QUAKE: &str = "🌍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array or object
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

fn write_json_value<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

fn write_ndjson_rows<W: Write, T: Serialize>(writer: &mut W, rows: &[T]) -> io::Result<()> {
    for row in rows {
        let json = serde_json::to_string(row)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write the backend AI configuration.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_config<W: Write>(
    writer: &mut W,
    config: &SystemConfig,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            writeln!(writer, "{BOLD}Backend status{RESET}")?;
            writeln!(writer, "  AI provider: {CYAN}{}{RESET}", config.ai_provider)?;
            writeln!(writer, "  AI model:    {CYAN}{}{RESET}", config.ai_model)
        }
        Format::Json | Format::Ndjson => write_json_value(writer, config),
    }
}

/// Write a weather snapshot: the AI bulletin followed by the city grid.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_snapshot<W: Write>(
    writer: &mut W,
    snapshot: &WeatherSnapshot,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            writeln!(writer, "{ICON_BOT} {BOLD}最新 AI 氣象快訊{RESET}")?;
            if snapshot.ai_report.is_empty() {
                writeln!(writer, "{DIM}尚無資料，請嘗試更新。{RESET}")?;
            } else {
                writeln!(writer, "{CYAN}{}{RESET}", snapshot.ai_report)?;
            }
            writeln!(writer)?;
            write_city_grid(writer, &snapshot.cities)
        }
        Format::Json | Format::Ndjson => write_json_value(writer, snapshot),
    }
}

fn write_city_grid<W: Write>(writer: &mut W, cities: &[CityForecast]) -> io::Result<()> {
    if cities.is_empty() {
        return writeln!(writer, "{DIM}(no city forecasts){RESET}");
    }

    writeln!(writer, "{ICON_CITY} {BOLD}全臺主要縣市預報{RESET}")?;
    for city in cities {
        writeln!(
            writer,
            "  {BOLD}{:<4}{RESET} │ {:<12} │ {YELLOW}{}-{}°C{RESET} │ ☂ {}%",
            city.name, city.wx, city.min_t, city.max_t, city.pop
        )?;
    }
    Ok(())
}

/// Write one page of forecast history rows.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_forecasts<W: Write>(
    writer: &mut W,
    rows: &[ForecastRecord],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            for row in rows {
                let report = row.ai_report.as_deref().unwrap_or("無 AI 報告");
                writeln!(
                    writer,
                    "#{:<5} {DIM}{}{RESET} │ {}",
                    row.id,
                    row.report_time.as_deref().unwrap_or("-"),
                    truncate(report, 50)
                )?;
            }
            Ok(())
        }
        Format::Json => write_json_value(writer, &rows),
        Format::Ndjson => write_ndjson_rows(writer, rows),
    }
}

/// Write one page of warning history rows.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_warnings<W: Write>(
    writer: &mut W,
    rows: &[WarningRecord],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            for row in rows {
                let report = row.ai_report.as_deref().unwrap_or("尚未生成");
                writeln!(
                    writer,
                    "{ICON_WARN} #{:<5} {ORANGE}{BOLD}{}{RESET} {DIM}{}{RESET}",
                    row.id,
                    row.title,
                    row.issue_time.as_deref().unwrap_or("-")
                )?;
                if let Some(areas) = &row.affected_areas {
                    writeln!(writer, "   {DIM}受影響: {}{RESET}", truncate(areas, 60))?;
                }
                writeln!(writer, "   {}", truncate(report, 70))?;
            }
            Ok(())
        }
        Format::Json => write_json_value(writer, &rows),
        Format::Ndjson => write_ndjson_rows(writer, rows),
    }
}

/// Write one page of earthquake history rows.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_earthquakes<W: Write>(
    writer: &mut W,
    rows: &[EarthquakeRecord],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            for row in rows {
                let mag = row
                    .magnitude
                    .map_or_else(|| "?".to_string(), |m| format!("{m:.1}"));
                let report = row.ai_report.as_deref().unwrap_or("尚未生成");
                writeln!(
                    writer,
                    "{ICON_QUAKE} #{:<8} {RED}{BOLD}M{mag}{RESET} {} {DIM}{}{RESET}",
                    row.earthquake_no.as_deref().unwrap_or("-"),
                    row.location.as_deref().unwrap_or("Unknown location"),
                    row.origin_time.as_deref().unwrap_or("-")
                )?;
                writeln!(writer, "   {}", truncate(report, 70))?;
            }
            Ok(())
        }
        Format::Json => write_json_value(writer, &rows),
        Format::Ndjson => write_ndjson_rows(writer, rows),
    }
}

/// Write the pagination footer: page number plus forward/backward hints.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_page_footer<W: Write>(writer: &mut W, pager: &Pager, rows: usize) -> io::Result<()> {
    if rows == 0 {
        writeln!(writer, "{DIM}無資料{RESET}")?;
    }

    let next_hint = if pager.has_next() {
        format!("--page {} for more", pager.page + 1)
    } else {
        "end of data".to_string()
    };
    let prev_hint = if pager.has_prev() {
        format!(" │ --page {} to go back", pager.page - 1)
    } else {
        String::new()
    };

    writeln!(
        writer,
        "{DIM}─ page {} ({rows} rows) │ {next_hint}{prev_hint}{RESET}",
        pager.page + 1
    )
}

/// Write one feed message as a chat-style line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> io::Result<()> {
    let time = message.time.with_timezone(&Local).format("%H:%M:%S");
    let tag = if message.is_error {
        "ERROR"
    } else {
        message.sender.as_str()
    };
    let color = match (message.sender, message.is_error) {
        (_, true) => RED,
        (Sender::Ai, false) => CYAN,
        (Sender::System, false) => GREEN,
    };

    writeln!(
        writer,
        "{DIM}[{time}]{RESET} {color}{BOLD}{tag:<6}{RESET} {}",
        message.text
    )
}

/// Shorten text to `max` characters, appending an ellipsis when cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("台北市天氣晴", 10), "台北市天氣晴");
        assert_eq!(truncate("台北市天氣晴", 3), "台北市…");
    }

    #[test]
    fn test_empty_page_renders_no_data_without_error() {
        let mut pager = Pager::new(10);
        pager.record_fetch(0);

        let mut buf = Vec::new();
        write_page_footer(&mut buf, &pager, 0).expect("write failed");
        let out = String::from_utf8(buf).expect("utf8");
        assert!(out.contains("無資料"));
        assert!(out.contains("end of data"));
    }

    #[test]
    fn test_footer_hints_follow_pager_state() {
        let mut pager = Pager::new(10);
        pager.record_fetch(10);
        pager.next_page();
        pager.record_fetch(10);

        let mut buf = Vec::new();
        write_page_footer(&mut buf, &pager, 10).expect("write failed");
        let out = String::from_utf8(buf).expect("utf8");
        assert!(out.contains("page 2"));
        assert!(out.contains("--page 2 for more"));
        assert!(out.contains("--page 0 to go back"));
    }

    #[test]
    fn test_snapshot_json_round_trips() {
        let snapshot = WeatherSnapshot {
            overview: String::new(),
            cities: vec![],
            ai_report: "鋒面通過。".to_string(),
        };

        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot, Format::Json).expect("write failed");
        let parsed: WeatherSnapshot =
            serde_json::from_slice(&buf).expect("output must be valid JSON");
        assert_eq!(parsed.ai_report, "鋒面通過。");
    }
}
