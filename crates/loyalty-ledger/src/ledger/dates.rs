use chrono::NaiveDate;

/// Parse a free-form purchase date into a calendar date.
///
/// Two shapes are recognized: day-first `D/M/YYYY` and ISO-like `YYYY-M-D`, with one or
/// two digit day and month. Anything else, including impossible dates, yields `None`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some([day, month, year]) = split_fields(trimmed, '/') {
        return build_date(year, month, day);
    }

    if let Some([year, month, day]) = split_fields(trimmed, '-') {
        return build_date(year, month, day);
    }

    None
}

fn split_fields(value: &str, separator: char) -> Option<[&str; 3]> {
    let mut parts = value.split(separator);
    let fields = [parts.next()?, parts.next()?, parts.next()?];
    if parts.next().is_some() {
        return None;
    }
    Some(fields)
}

fn build_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year = digits(year, 4, 4)?;
    let month = digits(month, 1, 2)?;
    let day = digits(day, 1, 2)?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn digits(field: &str, min: usize, max: usize) -> Option<u32> {
    if field.len() < min || field.len() > max || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
