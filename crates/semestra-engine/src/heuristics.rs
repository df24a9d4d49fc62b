//! Best-effort free-text extraction from imported calendar entries.
//!
//! Institutional calendar feeds carry everything in SUMMARY/DESCRIPTION
//! strings ("MIE100 LEC0101", "Instructor: J. Doe"). This module derives the
//! structured fields the rest of the engine consumes; the resolver and
//! detector depend only on those fields, never on the raw text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Section code token: a recognized prefix followed by digits, e.g. "LEC0101".
static SECTION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(LEC|TUT|PRA|LAB|SEM|DIS|WKS|CLN|LBR|EXM|TST|QUI)\s*(0*[0-9]{1,6})[A-Z]*\b")
        .unwrap()
});

/// Leading course-code token, e.g. "MIE100" or "CSC108H1".
static COURSE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{2,6}\d{2,4})(?:[A-Za-z]\d)?[A-Za-z]?$").unwrap());

/// "Instructor: ..." style labels in description text.
static INSTRUCTOR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Instructor|Instructors|Prof|Professor)\s*[:\-]\s*(.+)").unwrap()
});

/// Trailing campus/term suffix noise, e.g. "H1" / "Y1".
static TRAILING_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[HY]\d\s*$").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static CATEGORY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{2,4})\d").unwrap());

/// Fixed lookup tables for event-type codes and abbreviations.
///
/// Injected where the importer is constructed rather than read from process
/// globals; `Default` carries the builtin codes.
#[derive(Debug, Clone)]
pub struct EventTypeCatalog {
    /// Ordered so free-text scans resolve ties deterministically.
    code_by_section_prefix: Vec<(&'static str, &'static str)>,
    builtin_abbreviations: HashMap<&'static str, &'static str>,
    default_code: &'static str,
}

impl Default for EventTypeCatalog {
    fn default() -> Self {
        Self {
            code_by_section_prefix: vec![
                ("LEC", "LECTURE"),
                ("TUT", "TUTORIAL"),
                ("PRA", "PRACTICAL"),
                ("LAB", "PRACTICAL"),
            ],
            builtin_abbreviations: HashMap::from([
                ("LECTURE", "LEC"),
                ("TUTORIAL", "TUT"),
                ("PRACTICAL", "PRA"),
            ]),
            default_code: "LECTURE",
        }
    }
}

impl EventTypeCatalog {
    /// Derive the canonical event-type code for an entry.
    ///
    /// An explicit section prefix maps through the table (unknown prefixes
    /// pass through as-is); otherwise the summary is scanned for any known
    /// prefix; otherwise the default code applies.
    pub fn event_type_for(&self, summary: &str, section_prefix: Option<&str>) -> String {
        if let Some(prefix) = section_prefix {
            return self
                .code_by_section_prefix
                .iter()
                .find(|(known, _)| *known == prefix)
                .map(|(_, code)| *code)
                .unwrap_or(prefix)
                .to_string();
        }

        let upper = summary.to_uppercase();
        for (prefix, code) in &self.code_by_section_prefix {
            if upper.contains(prefix) {
                return (*code).to_string();
            }
        }
        self.default_code.to_string()
    }

    /// Short display abbreviation for an event-type code.
    ///
    /// Builtin codes use their fixed abbreviation; anything else keeps its
    /// first four alphanumeric characters, with "TYPE" as the last resort.
    pub fn abbreviation_for(&self, code: &str) -> String {
        let upper = code.to_uppercase();
        if let Some(builtin) = self.builtin_abbreviations.get(upper.as_str()) {
            return (*builtin).to_string();
        }
        let normalized: String = upper.chars().filter(|c| c.is_alphanumeric()).collect();
        let abbreviated: String = normalized.chars().take(4).collect();
        if abbreviated.is_empty() {
            "TYPE".to_string()
        } else {
            abbreviated
        }
    }
}

/// Normalized course name from an entry summary.
///
/// Strips section-code tokens and collapses whitespace. If a leading
/// course-code token remains ("MIE100 Mechanics" -> "MIE100") it wins;
/// otherwise trailing suffix noise is removed from the cleaned text.
pub fn normalize_course_name(summary: &str) -> String {
    let cleaned = SECTION_TOKEN.replace_all(summary, "");
    let cleaned = WHITESPACE_RUN.replace_all(cleaned.trim(), " ").to_string();
    if cleaned.is_empty() {
        return String::new();
    }

    let first_token = cleaned.split(' ').next().unwrap_or("").to_uppercase();
    if let Some(captures) = COURSE_TOKEN.captures(&first_token) {
        return captures[1].to_uppercase();
    }

    TRAILING_SUFFIX.replace(&cleaned, "").trim().to_string()
}

/// Section prefix and identifier from an entry summary, when present.
///
/// Returns `(prefix, digits)`; digits keep their leading zeros so "LEC0101"
/// yields section "0101".
pub fn extract_section(summary: &str) -> (Option<String>, Option<String>) {
    let upper = summary.to_uppercase();
    let Some(captures) = SECTION_TOKEN.captures(&upper) else {
        return (None, None);
    };
    let prefix = captures[1].to_uppercase();
    let digits: String = captures[2].chars().filter(|c| c.is_ascii_digit()).collect();
    let section_id = if digits.is_empty() { None } else { Some(digits) };
    (Some(prefix), section_id)
}

/// Title and instructor from an entry description.
///
/// The instructor comes from the first "Instructor:" style label. The title
/// is the first line that is not key/value metadata, does not repeat the
/// course name, and has no section token; truncated to 160 characters.
pub fn extract_title_and_instructor(
    description: &str,
    course_name: &str,
) -> (Option<String>, Option<String>) {
    if description.is_empty() {
        return (None, None);
    }

    let mut title: Option<String> = None;
    let mut instructor: Option<String> = None;
    let course_upper = course_name.to_uppercase();

    for line in description.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if instructor.is_none() {
            if let Some(captures) = INSTRUCTOR_LABEL.captures(line) {
                instructor = Some(captures[1].trim().to_string());
            }
        }

        if title.is_some() {
            continue;
        }
        if let Some((key, _)) = line.split_once(':') {
            if key.len() <= 20 {
                continue;
            }
        }
        if !course_upper.is_empty() && line.to_uppercase().contains(&course_upper) {
            continue;
        }
        if SECTION_TOKEN.is_match(line) {
            continue;
        }
        title = Some(line.chars().take(160).collect());
    }

    (title, instructor)
}

/// Category from a course name, e.g. "MIE100" -> "MIE".
pub fn extract_category(course_name: &str) -> Option<String> {
    let trimmed = course_name.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(captures) = CATEGORY_PREFIX.captures(trimmed) {
        return Some(captures[1].to_uppercase());
    }

    let first_word = trimmed.split(' ').next().unwrap_or("");
    if first_word.len() > 1 && first_word.chars().all(|c| c.is_alphabetic()) {
        return Some(first_word.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_code_token_wins() {
        assert_eq!(normalize_course_name("MIE100 LEC0101"), "MIE100");
        assert_eq!(normalize_course_name("csc108h1 TUT0002"), "CSC108");
    }

    #[test]
    fn free_text_name_strips_suffix_noise() {
        assert_eq!(
            normalize_course_name("Intro to Mechanics H1"),
            "Intro to Mechanics"
        );
        assert_eq!(normalize_course_name("   "), "");
    }

    #[test]
    fn section_digits_keep_leading_zeros() {
        let (prefix, section) = extract_section("MIE100 LEC0101");
        assert_eq!(prefix.as_deref(), Some("LEC"));
        assert_eq!(section.as_deref(), Some("0101"));
    }

    #[test]
    fn no_section_token_yields_nothing() {
        assert_eq!(extract_section("Plain meeting"), (None, None));
    }

    #[test]
    fn event_type_prefers_explicit_prefix() {
        let catalog = EventTypeCatalog::default();
        assert_eq!(catalog.event_type_for("whatever", Some("LAB")), "PRACTICAL");
        assert_eq!(catalog.event_type_for("whatever", Some("SEM")), "SEM");
        assert_eq!(catalog.event_type_for("MIE100 TUT section", None), "TUTORIAL");
        assert_eq!(catalog.event_type_for("MIE100", None), "LECTURE");
    }

    #[test]
    fn abbreviation_builtin_and_derived() {
        let catalog = EventTypeCatalog::default();
        assert_eq!(catalog.abbreviation_for("LECTURE"), "LEC");
        assert_eq!(catalog.abbreviation_for("practical"), "PRA");
        assert_eq!(catalog.abbreviation_for("Seminar"), "SEMI");
        assert_eq!(catalog.abbreviation_for("--"), "TYPE");
    }

    #[test]
    fn instructor_label_and_title_line() {
        let description = "MIE100 LEC0101\nApplied Mechanics\nInstructor: J. Doe";
        let (title, instructor) = extract_title_and_instructor(description, "MIE100");
        assert_eq!(title.as_deref(), Some("Applied Mechanics"));
        assert_eq!(instructor.as_deref(), Some("J. Doe"));
    }

    #[test]
    fn metadata_lines_never_become_titles() {
        let description = "Room: BA1130\nDelivery: In person";
        let (title, instructor) = extract_title_and_instructor(description, "MIE100");
        assert_eq!(title, None);
        assert_eq!(instructor, None);
    }

    #[test]
    fn category_from_code_or_first_word() {
        assert_eq!(extract_category("MIE100").as_deref(), Some("MIE"));
        assert_eq!(extract_category("Philosophy 101").as_deref(), Some("Philosophy"));
        assert_eq!(extract_category("1A"), None);
        assert_eq!(extract_category(""), None);
    }
}
