use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};

const LOCAL_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Renders an ISO-8601 timestamp as `DD/MM/YYYY às HH:MM:SS` in local time.
///
/// The three leading spaces are part of the output; the message tag relies
/// on them for spacing. Input that does not parse comes back unchanged.
pub fn format_timestamp(iso: &str) -> String {
    match to_local(iso) {
        Some(time) => format!(
            "   {:02}/{:02}/{} às {:02}:{:02}:{:02}",
            time.day(),
            time.month(),
            time.year(),
            time.hour(),
            time.minute(),
            time.second()
        ),
        None => iso.to_string(),
    }
}

fn to_local(iso: &str) -> Option<NaiveDateTime> {
    let iso = iso.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(iso) {
        return Some(time.with_timezone(&Local).naive_local());
    }

    // No offset: already wall-clock time.
    if let Some(time) = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(iso, format).ok())
    {
        return Some(time);
    }

    // A bare date means midnight UTC.
    let midnight = NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().with_timezone(&Local).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_wall_clock_time() {
        assert_eq!(
            format_timestamp("2024-03-05T08:09:03"),
            "   05/03/2024 às 08:09:03"
        );
    }

    #[test]
    fn drops_fractional_seconds() {
        assert_eq!(
            format_timestamp("2024-12-31T23:59:59.999"),
            "   31/12/2024 às 23:59:59"
        );
    }

    #[test]
    fn converts_offsets_to_local_time() {
        let expected = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Local);
        assert_eq!(
            format_timestamp("2024-01-01T10:00:00Z"),
            expected
                .format("   %d/%m/%Y às %H:%M:%S")
                .to_string()
        );
    }

    #[test]
    fn accepts_space_separator() {
        assert_eq!(
            format_timestamp("2024-03-05 08:09:03"),
            "   05/03/2024 às 08:09:03"
        );
    }

    #[test]
    fn bare_date_is_midnight_utc() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .with_timezone(&Local);
        assert_eq!(
            format_timestamp("2024-03-05"),
            expected
                .format("   %d/%m/%Y às %H:%M:%S")
                .to_string()
        );
    }

    #[test]
    fn garbage_is_returned_as_is() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
