//! JST time helpers.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// JST is UTC+9
const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Fixed offset for JST.
pub fn jst_offset() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Current time in JST.
pub fn now_jst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst_offset())
}

/// Format the current JST time as `HH:MM:SS`.
pub fn jst_clock() -> String {
    now_jst().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jst_offset_is_nine_hours() {
        // テスト項目: JST のオフセットは UTC+9
        // when (操作):
        let offset = jst_offset();

        // then (期待する結果):
        assert_eq!(offset.local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_now_jst_has_jst_offset() {
        // テスト項目: now_jst() は JST のオフセットを持つ
        // when (操作):
        let now = now_jst();

        // then (期待する結果):
        assert_eq!(now.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_jst_clock_format() {
        // テスト項目: jst_clock() は HH:MM:SS 形式を返す
        // when (操作):
        let clock = jst_clock();

        // then (期待する結果):
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.matches(':').count(), 2);
    }
}
