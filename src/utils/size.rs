//! Human-readable byte sizes.

/// Format a byte count with a decimal unit (`B`, `kB`, `MB`, `GB`).
///
/// # Examples
///
/// - `format_bytes(512)` -> `"512 B"`
/// - `format_bytes(48_200)` -> `"48.2 kB"`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["kB", "MB", "GB"];

    if bytes < 1000 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1000.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(48_200), "48.2 kB");
        assert_eq!(format_bytes(3_500_000), "3.5 MB");
        assert_eq!(format_bytes(2_000_000_000), "2.0 GB");
    }
}
