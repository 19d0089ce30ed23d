pub mod ffmpeg;
pub mod ytdlp;

/// Signature of a login-wall placeholder clip: a successful-looking download
/// that is under two seconds and under 300 KB. Such files are discarded and
/// the direct page-scrape path is forced instead.
pub fn is_login_placeholder(duration_secs: Option<f64>, size_bytes: u64) -> bool {
    matches!(duration_secs, Some(d) if d < 2.0) && size_bytes < 300_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_discarded() {
        assert!(is_login_placeholder(Some(1.2), 50_000));
    }

    #[test]
    fn test_real_video_is_accepted() {
        assert!(!is_login_placeholder(Some(10.0), 2_000_000));
    }

    #[test]
    fn test_both_limits_must_trip() {
        assert!(!is_login_placeholder(Some(1.2), 2_000_000));
        assert!(!is_login_placeholder(Some(10.0), 50_000));
        assert!(!is_login_placeholder(None, 50_000));
    }
}
