//! Human-readable formatting for listings.

/// Format a byte count into a short human-readable string.
///
/// Binary units by default; pass `si = true` for powers of 1000.
pub fn humanize_file_size(bytes: u64, si: bool) -> String {
    let thresh: f64 = if si { 1000.0 } else { 1024.0 };
    let mut size = bytes as f64;

    if size < thresh {
        return format!("{bytes} B");
    }

    let units: &[&str] = if si {
        &["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"]
    } else {
        &["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"]
    };

    let mut unit = 0usize;
    loop {
        size /= thresh;
        if (size * 10.0).round() / 10.0 < thresh || unit == units.len() - 1 {
            break;
        }
        unit += 1;
    }

    format!("{:.1} {}", size, units[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_below_the_threshold_stay_plain() {
        assert_eq!(humanize_file_size(0, false), "0 B");
        assert_eq!(humanize_file_size(1023, false), "1023 B");
        assert_eq!(humanize_file_size(999, true), "999 B");
    }

    #[test]
    fn binary_units() {
        assert_eq!(humanize_file_size(1024, false), "1.0 KiB");
        assert_eq!(humanize_file_size(1536, false), "1.5 KiB");
        assert_eq!(humanize_file_size(5 * 1024 * 1024, false), "5.0 MiB");
    }

    #[test]
    fn si_units() {
        assert_eq!(humanize_file_size(1000, true), "1.0 kB");
        assert_eq!(humanize_file_size(2_500_000, true), "2.5 MB");
    }
}
