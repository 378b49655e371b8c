use serenity::all::User;

/// Longest reason accepted by moderation commands, embed fields cap out shortly after
pub const MAX_REASON_LENGTH: usize = 512;

pub const NO_REASON: &str = "No reason provided.";

/// Helper method to get the username of a user
pub fn username(m: &User) -> String {
    if let Some(ref global_name) = m.global_name {
        global_name.to_string()
    } else {
        m.tag()
    }
}

/// Audit log entry for a moderative action
pub fn to_log_format(moderator: &str, target: &str, reason: &str) -> String {
    format!(
        "{} | Handled '{}' for reason '{}'",
        moderator, target, reason
    )
}

/// Fills in the default reason and enforces the length limit
pub fn validate_reason(reason: Option<String>) -> Result<String, crate::Error> {
    match reason {
        Some(reason) if reason.trim().is_empty() => Ok(NO_REASON.to_string()),
        Some(reason) if reason.chars().count() > MAX_REASON_LENGTH => Err(format!(
            "Reason must be less than {} characters.",
            MAX_REASON_LENGTH
        )
        .into()),
        Some(reason) => Ok(reason),
        None => Ok(NO_REASON.to_string()),
    }
}

/// Cuts `s` down to `max` characters, marking the cut with `...`
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }

    let mut cut = s.chars().take(max.saturating_sub(3)).collect::<String>();
    cut.push_str("...");
    cut
}

/// Joins `items` with `sep` in at most `max` bytes, what doesn't fit becomes "...and N more"
pub fn join_capped(items: &[String], sep: &str, max: usize) -> String {
    let mut out = String::new();

    for (i, item) in items.iter().enumerate() {
        let sep_len = if out.is_empty() { 0 } else { sep.len() };
        let left_after = items.len() - i - 1;

        let needed = if left_after == 0 {
            out.len() + sep_len + item.len()
        } else {
            out.len()
                + sep_len
                + item.len()
                + sep.len()
                + format!("...and {} more", left_after).len()
        };

        if needed > max {
            if sep_len > 0 {
                out.push_str(sep);
            }
            out.push_str(&format!("...and {} more", items.len() - i));
            return out;
        }

        if sep_len > 0 {
            out.push_str(sep);
        }
        out.push_str(item);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format() {
        assert_eq!(
            to_log_format("mod", "target", "spam"),
            "mod | Handled 'target' for reason 'spam'"
        );
    }

    #[test]
    fn reasons() {
        assert_eq!(validate_reason(None).unwrap(), NO_REASON);
        assert_eq!(validate_reason(Some("  ".into())).unwrap(), NO_REASON);
        assert_eq!(validate_reason(Some("spam".into())).unwrap(), "spam");
        assert!(validate_reason(Some("a".repeat(MAX_REASON_LENGTH))).is_ok());
        assert!(validate_reason(Some("a".repeat(MAX_REASON_LENGTH + 1))).is_err());
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate("abcdefghijk", 10), "abcdefg...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn capped_joins() {
        let items = vec!["<@1>".to_string(), "<@2>".to_string()];
        assert_eq!(join_capped(&items, " ", 1024), "<@1> <@2>");
        assert_eq!(join_capped(&[], " ", 1024), "");

        let items = (0..500)
            .map(|i| format!("<@&{}>", 100000000000000000u64 + i))
            .collect::<Vec<_>>();
        let joined = join_capped(&items, " ", 1024);
        assert!(joined.len() <= 1024);
        assert!(joined.starts_with("<@&100000000000000000> "));
        assert!(joined.ends_with(" more"));

        let shown = joined.matches("<@&").count();
        assert!(joined.ends_with(&format!("...and {} more", items.len() - shown)));
    }
}
