//! Client-side checks run before a movie is submitted.
//!
//! Every check is a pure function returning `None` when the value is
//! acceptable or `Some(message)` describing the single problem found.
//! [`ManualEntry::validate`] combines them and attaches each message to the
//! field that failed.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::api::{MovieFormat, MovieInput};
use crate::fields::FieldErrors;

/// Latin or Cyrillic letter.
static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Zа-яА-ЯёЁ]").unwrap());

/// Anything that is not a letter, whitespace, comma, period or hyphen.
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Zа-яА-ЯёЁ\s,.-]").unwrap());

pub const TITLE_EMPTY: &str = "Title cannot be empty";
pub const TITLE_DUPLICATE: &str = "Movie with this title already exists";
pub const YEAR_REQUIRED: &str = "Year is required";
pub const ACTORS_EMPTY: &str = "Actors field cannot be empty or only spaces";
pub const ACTORS_NO_LETTER: &str = "Actors field must contain at least one letter";
pub const ACTORS_BAD_CHARS: &str = "Only letters, commas, dots, spaces and hyphens are allowed";
pub const FORMAT_REQUIRED: &str = "Format is required";

/// Inclusive range of accepted release years.
///
/// Historical revisions of the collection used 1900 and 1850 as the lower
/// bound; 1900 is the default and either can be configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearPolicy {
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for YearPolicy {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

fn default_min_year() -> i32 {
    1900
}

fn default_max_year() -> i32 {
    2021
}

impl YearPolicy {
    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    fn message(&self) -> String {
        format!(
            "Year must be between {} and {}",
            self.min_year, self.max_year
        )
    }
}

/// Title must be non-blank and must not duplicate an existing title,
/// ignoring case and surrounding whitespace.
///
/// The duplicate check only sees the titles the caller has cached; the
/// server still has the final word.
pub fn validate_title<'a, I>(value: &str, existing: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Some(TITLE_EMPTY.to_string());
    }

    existing
        .into_iter()
        .any(|title| title.trim().to_lowercase() == normalized)
        .then(|| TITLE_DUPLICATE.to_string())
}

/// Year must be an integer inside the policy range. An empty value passes;
/// required-ness is enforced by [`ManualEntry::validate`].
pub fn validate_year(value: &str, policy: &YearPolicy) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    match value.trim().parse::<i32>() {
        Ok(year) if policy.contains(year) => None,
        _ => Some(policy.message()),
    }
}

/// Actors are a comma separated list of names made of letters, whitespace,
/// commas, periods and hyphens, with at least one letter overall.
pub fn validate_actors(value: &str) -> Option<String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Some(ACTORS_EMPTY.to_string());
    }
    if !LETTER.is_match(trimmed) {
        return Some(ACTORS_NO_LETTER.to_string());
    }
    if DISALLOWED.is_match(value) {
        return Some(ACTORS_BAD_CHARS.to_string());
    }

    None
}

/// Format must be one of the known formats; there is no free text.
pub fn validate_format(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(FORMAT_REQUIRED.to_string());
    }

    match value.parse::<MovieFormat>() {
        Ok(_) => None,
        Err(_) => Some(format!(
            "Format must be one of {}",
            MovieFormat::ALL
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Input-time filter for actor text fields.
///
/// Returns the new value when it only contains allowed characters, else keeps
/// the previous one, so digits and symbols never make it into the field.
/// Meant for interactive frontends that see every keystroke; callers taking
/// the whole value at once (the CLI) rely on [`validate_actors`] instead.
pub fn filter_actor_input(previous: &str, next: &str) -> String {
    if next.is_empty() || !DISALLOWED.is_match(next) {
        next.to_string()
    } else {
        previous.to_string()
    }
}

/// Split an actors field into trimmed, non-empty names.
pub fn parse_actor_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Raw contents of the manual-entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntry {
    pub title: String,
    pub year: String,
    pub format: String,
    pub actors: String,
}

impl ManualEntry {
    /// Run every check and build the create payload.
    ///
    /// All fields are checked even after one fails so the caller can mark
    /// every offending input at once.
    pub fn validate<'a, I>(&self, existing: I, policy: &YearPolicy) -> Result<MovieInput, FieldErrors>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut errors = FieldErrors::new();

        errors.insert_opt("title", validate_title(&self.title, existing));
        if self.year.trim().is_empty() {
            errors.insert("year", YEAR_REQUIRED);
        } else {
            errors.insert_opt("year", validate_year(&self.year, policy));
        }
        errors.insert_opt("format", validate_format(&self.format));
        errors.insert_opt("actors", validate_actors(&self.actors));

        if !errors.is_empty() {
            return Err(errors);
        }

        let year = self.year.trim().parse::<i32>().map_err(|_| {
            let mut errors = FieldErrors::new();
            errors.insert("year", policy.message());
            errors
        })?;
        let format = self.format.parse::<MovieFormat>().map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.insert("format", e);
            errors
        })?;

        Ok(MovieInput {
            title: self.title.trim().to_string(),
            year,
            format,
            actors: parse_actor_names(&self.actors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> std::iter::Empty<&'static str> {
        std::iter::empty()
    }

    #[test]
    fn test_title_blank_rejected() {
        assert_eq!(validate_title("", none()).as_deref(), Some(TITLE_EMPTY));
        assert_eq!(validate_title("  ", none()).as_deref(), Some(TITLE_EMPTY));
    }

    #[test]
    fn test_title_duplicate_ignores_case_and_whitespace() {
        let cached = ["Matrix"];
        assert_eq!(
            validate_title("  matrix ", cached).as_deref(),
            Some(TITLE_DUPLICATE)
        );
        assert_eq!(validate_title("Matrix 2", cached), None);
        assert_eq!(validate_title("Inception", none()), None);
        assert_eq!(
            validate_title("Inception", ["inception"]).as_deref(),
            Some(TITLE_DUPLICATE)
        );
    }

    #[test]
    fn test_year_bounds() {
        let policy = YearPolicy::default();
        assert!(validate_year("1899", &policy).is_some());
        assert_eq!(validate_year("1900", &policy), None);
        assert_eq!(validate_year("2021", &policy), None);
        assert!(validate_year("2022", &policy).is_some());
        assert!(validate_year("abc", &policy).is_some());
        assert_eq!(validate_year("", &policy), None);
        assert_eq!(
            validate_year("1899", &policy).as_deref(),
            Some("Year must be between 1900 and 2021")
        );
    }

    #[test]
    fn test_year_policy_is_configurable() {
        let policy = YearPolicy {
            min_year: 1850,
            max_year: 2021,
        };
        assert_eq!(validate_year("1899", &policy), None);
        assert_eq!(
            validate_year("1849", &policy).as_deref(),
            Some("Year must be between 1850 and 2021")
        );
    }

    #[test]
    fn test_year_whitespace_only_is_not_a_number() {
        assert!(validate_year("  ", &YearPolicy::default()).is_some());
        assert_eq!(validate_year(" 1999 ", &YearPolicy::default()), None);
    }

    #[test]
    fn test_actors_rules() {
        assert_eq!(validate_actors("123").as_deref(), Some(ACTORS_NO_LETTER));
        assert_eq!(validate_actors("John_Doe").as_deref(), Some(ACTORS_BAD_CHARS));
        assert_eq!(validate_actors("John, Mary-Jane"), None);
        assert_eq!(validate_actors("  ").as_deref(), Some(ACTORS_EMPTY));
        assert_eq!(validate_actors("R2D2").as_deref(), Some(ACTORS_BAD_CHARS));
    }

    #[test]
    fn test_actors_accept_cyrillic() {
        assert_eq!(validate_actors("Олег Янковский, Ёжик"), None);
        assert_eq!(validate_actors("Jr. Robert Downey"), None);
    }

    #[test]
    fn test_format_required() {
        assert_eq!(validate_format("").as_deref(), Some(FORMAT_REQUIRED));
        assert_eq!(validate_format("Blu-Ray"), None);
        assert!(validate_format("LaserDisc").is_some());
    }

    #[test]
    fn test_filter_actor_input_rejects_digits() {
        assert_eq!(filter_actor_input("Tom", "Tom2"), "Tom");
        assert_eq!(filter_actor_input("Tom", "Tom "), "Tom ");
        assert_eq!(filter_actor_input("Tom", ""), "");
        assert_eq!(filter_actor_input("", "Анна"), "Анна");
    }

    #[test]
    fn test_parse_actor_names() {
        assert_eq!(
            parse_actor_names(" Mel Brooks, ,Gene Wilder,"),
            vec!["Mel Brooks".to_string(), "Gene Wilder".to_string()]
        );
    }

    #[test]
    fn test_manual_entry_valid() {
        let entry = ManualEntry {
            title: " Young Frankenstein ".to_string(),
            year: "1974".to_string(),
            format: "DVD".to_string(),
            actors: "Gene Wilder, Marty Feldman".to_string(),
        };
        let input = entry.validate(["Blazing Saddles"], &YearPolicy::default()).unwrap();
        assert_eq!(input.title, "Young Frankenstein");
        assert_eq!(input.year, 1974);
        assert_eq!(input.format, MovieFormat::Dvd);
        assert_eq!(input.actors, vec!["Gene Wilder", "Marty Feldman"]);
    }

    #[test]
    fn test_manual_entry_attaches_errors_per_field() {
        let entry = ManualEntry {
            title: "Matrix".to_string(),
            year: "".to_string(),
            format: "".to_string(),
            actors: "Keanu Reeves".to_string(),
        };
        let errors = entry.validate(["matrix"], &YearPolicy::default()).unwrap_err();
        assert_eq!(errors.get("title"), Some(TITLE_DUPLICATE));
        assert_eq!(errors.get("year"), Some(YEAR_REQUIRED));
        assert_eq!(errors.get("format"), Some(FORMAT_REQUIRED));
        assert!(!errors.contains("actors"));
        assert_eq!(errors.len(), 3);
    }
}
