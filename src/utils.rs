//! Filename helpers shared by the orchestrator and the API

/// Characters replaced with `_` in titles used as download filenames
const RESERVED_FILENAME_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Upper bound on title length, in characters
const MAX_TITLE_CHARS: usize = 200;

/// Make a media title safe to use as a client-side filename stem
///
/// Reserved path characters become `_`, control characters are dropped and
/// surrounding whitespace is trimmed. Returns `None` if nothing is left.
///
/// ```
/// use media_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("AC/DC: Live?").as_deref(), Some("AC_DC_ Live_"));
/// assert_eq!(sanitize_title("  \t "), None);
/// ```
pub fn sanitize_title(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .take(MAX_TITLE_CHARS)
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build an RFC 5987 `Content-Disposition` value for `<title>.<ext>`
///
/// Non-ASCII titles survive intact: the filename is percent-encoded UTF-8.
pub fn content_disposition(title: &str, extension: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}.{}",
        urlencoding::encode(title),
        extension
    )
}

/// Recover the filename from a `Content-Disposition` value
///
/// Understands both `filename="..."` and the RFC 5987 `filename*=` form, the
/// latter taking priority.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // charset'lang'encoded-filename
            if let Some(idx) = encoded.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
            {
                return Some(decoded.into_owned());
            }
        } else if let Some(name) = part.strip_prefix("filename=") {
            plain = Some(name.trim_matches('"').to_string());
        }
    }
    plain
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_characters_are_replaced() {
        assert_eq!(
            sanitize_title(r#"a/b\c?d%e*f:g|h"i<j>k"#).unwrap(),
            "a_b_c_d_e_f_g_h_i_j_k"
        );
    }

    #[test]
    fn unicode_titles_pass_through() {
        assert_eq!(sanitize_title("日本語 タイトル").unwrap(), "日本語 タイトル");
        assert_eq!(sanitize_title("Café Ünïcode").unwrap(), "Café Ünïcode");
    }

    #[test]
    fn control_characters_and_padding_are_removed() {
        assert_eq!(sanitize_title("  Title\r\n").unwrap(), "Title");
        assert_eq!(sanitize_title("a\u{7}b").unwrap(), "ab");
        assert!(sanitize_title("\n\n").is_none());
        assert!(sanitize_title("").is_none());
    }

    #[test]
    fn very_long_titles_are_capped() {
        let long = "x".repeat(1000);
        assert_eq!(sanitize_title(&long).unwrap().chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn content_disposition_percent_encodes_title() {
        let value = content_disposition("My Video", "mp4");
        assert_eq!(value, "attachment; filename*=UTF-8''My%20Video.mp4");

        let value = content_disposition("日本", "wav");
        assert!(value.is_ascii());
        assert_eq!(
            filename_from_content_disposition(&value).as_deref(),
            Some("日本.wav")
        );
    }

    #[test]
    fn plain_filename_parameter_is_understood() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="file.mp4""#).as_deref(),
            Some("file.mp4")
        );
        assert!(filename_from_content_disposition("inline").is_none());
    }
}
