/// Normalizes free text by stripping surrounding whitespace.
///
/// ```
/// use reviews::normalization::normalize_text;
/// assert_eq!(normalize_text("  Great shoot!\n"), "Great shoot!");
/// ```
pub fn normalize_text(text: impl AsRef<str>) -> String {
    text.as_ref().trim().to_owned()
}

/// Normalizes an email address by stripping surrounding whitespace
/// and lower-casing it.
///
/// ```
/// use reviews::normalization::normalize_email;
/// assert_eq!(normalize_email(" Amy@X.com "), "amy@x.com");
/// ```
pub fn normalize_email(email: impl AsRef<str>) -> String {
    email.as_ref().trim().to_lowercase()
}

/// Returns whether the text is empty once normalized.
pub fn is_blank(text: impl AsRef<str>) -> bool {
    text.as_ref().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{is_blank, normalize_email, normalize_text};

    fn count_whitespace(s: impl AsRef<str>) -> usize {
        s.as_ref().chars().filter(|c| c.is_whitespace()).count()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 2000, ..ProptestConfig::default()
        })]

        #[test]
        fn text_normalization_works(string in "(\\S.*\\S|\\S+)", space_before in "\\s*", space_after in "\\s*") {
            let normalized = normalize_text(format!("{}{}{}", space_before, string, space_after));

            prop_assert!(!normalized.starts_with(char::is_whitespace) && !normalized.ends_with(char::is_whitespace), "{:?} (normalized form of {:?}) has no leading or trailing whitespace", normalized, string);

            prop_assert_eq!(count_whitespace(&normalized), count_whitespace(string.trim()), "{:?} (normalized form of {:?}) preserves inner whitespace", normalized, string);
        }

        #[test]
        fn email_normalization_is_idempotent(local in "[A-Za-z0-9._]{1,16}", domain in "[A-Za-z0-9]{1,12}\\.[A-Za-z]{2,4}", padding in "[ \t]*") {
            let raw = format!("{}{}@{}{}", padding, local, domain, padding);
            let once = normalize_email(&raw);

            prop_assert_eq!(normalize_email(&once), once.clone());
            prop_assert!(!once.chars().any(char::is_uppercase));
            prop_assert!(!once.starts_with(char::is_whitespace) && !once.ends_with(char::is_whitespace));
        }

        #[test]
        fn whitespace_only_is_blank(string in "\\s*") {
            prop_assert!(is_blank(&string));
        }
    }

    #[test]
    fn inner_text_is_kept() {
        assert!(!is_blank(" a "));
        assert_eq!(normalize_text("\tLovely  photos \n"), "Lovely  photos");
    }
}
