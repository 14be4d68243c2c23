//! Lenient date parsing and path-based date recovery

use crate::reader::CellValue;
use chrono::{Duration, NaiveDate};
use std::path::{Component, Path};

/// Serial days for 1990-01-01 and 2100-12-31, the years an offer can carry.
/// Smaller numbers are usually a bare year or an amount, not a date.
const MIN_OFFER_SERIAL: f64 = 32_874.0;
const MAX_OFFER_SERIAL: f64 = 73_415.0;

const MONTHS: [(&str, u32); 24] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Words that may sit between date parts ("15 de junio de 2023")
const FILLER_WORDS: [&str; 5] = ["de", "del", "of", "the", "el"];

/// Interpret a cell as a date.
///
/// Dates and datetimes pass through untouched. Numbers are read as Excel
/// serial dates only when they land between 1990 and 2100. Text goes through [`parse_date_text`].
pub fn parse_date_value(value: &CellValue) -> Option<CellValue> {
    match value {
        CellValue::Date(_) | CellValue::DateTime(_) => Some(value.clone()),
        CellValue::Int(_) | CellValue::Float(_) => {
            let serial = value.as_f64()?;
            excel_serial_to_date(serial).map(CellValue::Date)
        }
        CellValue::Text(s) => parse_date_text(s).map(CellValue::Date),
        CellValue::Bool(_) | CellValue::Empty => None,
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(MIN_OFFER_SERIAL..=MAX_OFFER_SERIAL).contains(&serial) {
        return None;
    }
    // 1899-12-30 absorbs Excel's fictitious 1900-02-29
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Best-guess parse of a free-text date.
///
/// Accepts ISO dates, day-first numeric dates (`15/06/2023`, `15-06-23`,
/// `15.06.2023`), compact `YYYYMMDD`, and dates with Spanish or English
/// month names. A trailing time part is ignored. A missing day defaults to
/// the first of the month.
pub fn parse_date_text(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    // Drop a time part: "2023-06-15 10:30", "2023-06-15T10:30:00"
    let date_part = s
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or(s);
    if let Some(date) = parse_numeric_date(date_part) {
        return Some(date);
    }

    parse_named_month(s)
}

fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_digit_run(s);
    }

    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    if parts.len() != 3 || !parts.iter().all(|p| is_number(p)) {
        return None;
    }
    let nums: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    if nums.len() != 3 {
        return None;
    }

    if parts[0].len() == 4 {
        // Year first is always year-month-day
        return NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2]);
    }

    let year = expand_year(nums[2], parts[2].len())?;
    // Offers come from Spanish offices, where 05/06/2023 is the 5th of June.
    // Day first; fall back to month first when the day-first reading is impossible
    NaiveDate::from_ymd_opt(year, nums[1], nums[0])
        .or_else(|| NaiveDate::from_ymd_opt(year, nums[0], nums[1]))
}

fn parse_named_month(s: &str) -> Option<NaiveDate> {
    let lowered = s.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !FILLER_WORDS.contains(t))
        .collect();

    let mut month = None;
    let mut year = None;
    let mut day = None;

    for token in tokens {
        if let Some(m) = month_from_name(token) {
            month.get_or_insert(m);
        } else if is_number(token) {
            let n: u32 = token.parse().ok()?;
            if token.len() == 4 {
                year.get_or_insert(n as i32);
            } else if day.is_none() && (1..=31).contains(&n) {
                day = Some(n);
            } else if year.is_none() && token.len() == 2 {
                year = expand_year(n, 2);
            }
        } else if let Some(n) = ordinal_day(token) {
            day.get_or_insert(n);
        }
    }

    NaiveDate::from_ymd_opt(year?, month?, day.unwrap_or(1))
}

/// Month number for a full or abbreviated (3+ letters) month name
pub(crate) fn month_from_name(token: &str) -> Option<u32> {
    if token.len() < 3 || !token.chars().all(char::is_alphabetic) {
        return None;
    }
    if token == "sept" || token == "set" {
        return Some(9);
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == token || (token.len() >= 3 && name.starts_with(token)))
        .map(|(_, n)| *n)
}

/// "15th", "1st", "2nd"
fn ordinal_day(token: &str) -> Option<u32> {
    let digits = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))?;
    let n: u32 = digits.parse().ok()?;
    (1..=31).contains(&n).then_some(n)
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn expand_year(year: u32, digits: usize) -> Option<i32> {
    match digits {
        2 => Some(2000 + year as i32),
        4 => Some(year as i32),
        _ => None,
    }
}

fn plausible_year(year: i32) -> bool {
    (1990..=2100).contains(&year)
}

/// Parse a 6, 7 or 8 digit run as `YYMMDD`, `YYYYMDD` or `YYYYMMDD`
fn parse_digit_run(run: &str) -> Option<NaiveDate> {
    let num = |range: std::ops::Range<usize>| run.get(range)?.parse::<u32>().ok();
    let (year, month, day) = match run.len() {
        8 => (num(0..4)? as i32, num(4..6)?, num(6..8)?),
        7 => (num(0..4)? as i32, num(4..5)?, num(5..7)?),
        6 => (2000 + num(0..2)? as i32, num(2..4)?, num(4..6)?),
        _ => return None,
    };
    if !plausible_year(year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn digit_runs(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_ascii_digit())
        .filter(|run| (6..=8).contains(&run.len()))
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

/// Find a date in a 6 to 8 digit run of the path.
///
/// The file name is searched first, then the parent directories from the
/// deepest up.
pub fn date_from_path_digits(path: &Path) -> Option<NaiveDate> {
    let mut candidates = Vec::new();
    if let Some(stem) = path.file_stem() {
        candidates.push(stem.to_string_lossy().to_string());
    }
    let mut dirs = path_segments(path.parent()?);
    dirs.reverse();
    candidates.extend(dirs);

    candidates
        .iter()
        .flat_map(|segment| digit_runs(segment).collect::<Vec<_>>())
        .find_map(parse_digit_run)
}

/// Rebuild a date from directory names such as `2023/0615/` or
/// `2023/06/15/` or `2023/Junio/15/`.
pub fn date_from_path_segments(path: &Path) -> Option<NaiveDate> {
    let dirs = path_segments(path.parent()?);

    for (i, segment) in dirs.iter().enumerate().rev() {
        let Some(year) = year_in_segment(segment) else {
            continue;
        };
        let rest = &dirs[i + 1..];

        if let Some(next) = rest.first() {
            let compact = next
                .split(|c: char| !c.is_ascii_digit())
                .find(|run| run.len() == 4)
                .and_then(|run| {
                    let month = run[..2].parse().ok()?;
                    let day = run[2..].parse().ok()?;
                    NaiveDate::from_ymd_opt(year, month, day)
                });
            if compact.is_some() {
                return compact;
            }
        }

        if let [month_segment, day_segment, ..] = rest {
            let month = month_in_segment(month_segment);
            let day = leading_number(day_segment);
            if let (Some(month), Some(day)) = (month, day) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    return Some(date);
                }
            }
        }
    }

    None
}

fn year_in_segment(segment: &str) -> Option<i32> {
    segment
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .find(|year| (1900..=2099).contains(year))
}

fn month_in_segment(segment: &str) -> Option<u32> {
    if let Some(n) = leading_number(segment) {
        return (1..=12).contains(&n).then_some(n);
    }
    let lowered = segment.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphabetic())
        .find_map(month_from_name)
}

fn leading_number(segment: &str) -> Option<u32> {
    let digits: String = segment
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse().ok()
}
