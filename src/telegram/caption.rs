//! Caption attached to forwarded documents.

use chrono::{DateTime, Utc};

/// Telegram rejects document captions longer than this, counted in UTF-16
/// code units.
pub const MAX_CAPTION_CHARS: usize = 1024;

const ELLIPSIS: char = '…';

/// Timestamp format used in captions, e.g. `2024-05-01 13:37:00 UTC`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Builds the fixed-format multi-line caption.
///
/// The filename is shortened when the caption would exceed
/// [`MAX_CAPTION_CHARS`]; the other lines are always kept intact.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use tunnel::telegram::caption::build_caption;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 37, 0).unwrap();
/// let caption = build_caption("report.pdf", 3, "10.0.0.7", at);
/// assert!(caption.contains("report.pdf"));
/// assert!(caption.contains("3 bytes"));
/// assert!(caption.contains("2024-05-01 13:37:00 UTC"));
/// ```
pub fn build_caption(file_name: &str, size_bytes: u64, uploader_ip: &str, received_at: DateTime<Utc>) -> String {
    let render = |name: &str| {
        format!(
            "📂 New File Uploaded\n📎 {}\n📦 {} bytes\n🌐 {}\n🕒 {}",
            name,
            size_bytes,
            uploader_ip,
            format_timestamp(received_at)
        )
    };

    let caption = render(file_name);
    if utf16_len(&caption) <= MAX_CAPTION_CHARS {
        return caption;
    }

    let budget = MAX_CAPTION_CHARS
        .saturating_sub(utf16_len(&render("")))
        .saturating_sub(ELLIPSIS.len_utf16());
    let mut used = 0;
    let mut shortened: String = file_name
        .chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= budget
        })
        .collect();
    shortened.push(ELLIPSIS);
    render(&shortened)
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
