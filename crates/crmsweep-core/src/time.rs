use chrono::{DateTime, SecondsFormat, Utc};

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filesystem-safe variant of [`to_iso`]: `:` and `.` become `-`.
pub fn file_stamp(ms: i64) -> String {
    to_iso(ms).replace([':', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::{file_stamp, to_iso};

    #[test]
    fn iso_renders_utc_millis() {
        assert_eq!(to_iso(1_700_000_000_000), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn file_stamp_has_no_colons_or_dots() {
        let stamp = file_stamp(1_700_000_000_000);
        assert_eq!(stamp, "2023-11-14T22-13-20-000Z");
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
    }
}
