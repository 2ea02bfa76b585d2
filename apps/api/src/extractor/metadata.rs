//! Author / company / follower extraction from the header that precedes a
//! post's timestamp marker.

use once_cell::sync::Lazy;
use regex::Regex;

const ENTITY_SUFFIXES: &[&str] = &[
    "GmbH",
    "AG",
    "SE",
    "Inc",
    "LLC",
    "Ltd",
    "Corporation",
    "Corp",
    "KG",
    "UG",
];

/// Longest run of name-like words accepted as a personal name.
const MAX_NAME_WORDS: usize = 4;
const MAX_NAME_CHARS: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMetadata {
    pub author: Option<String>,
    pub company: Option<String>,
    pub followers: Option<String>,
}

pub fn parse_metadata(header: &str) -> PostMetadata {
    let author = find_author(header);

    // Search after the author first so the name never bleeds into the company.
    let company = match &author {
        Some(found) => {
            find_company(&header[found.end..]).or_else(|| find_company(&header[..found.start]))
        }
        None => find_company(header),
    };

    PostMetadata {
        author: author.map(|a| a.name),
        company,
        followers: find_followers(header),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Author
// ────────────────────────────────────────────────────────────────────────────

struct AuthorMatch {
    name: String,
    start: usize,
    end: usize,
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '(' | ')'))
}

fn is_entity_suffix(word: &str) -> bool {
    let word = trim_punctuation(word);
    ENTITY_SUFFIXES.iter().any(|s| s.eq_ignore_ascii_case(word))
}

/// Proper-cased word such as `Jane`, `Müller-Lüdenscheidt` or `O'Neil`.
/// Acronyms (`CEO`) do not count.
fn is_name_word(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    let well_formed = rest
        .iter()
        .all(|c| c.is_alphabetic() || matches!(c, '-' | '\'' | '.'));
    let is_acronym = !rest.is_empty() && rest.iter().all(|c| !c.is_lowercase());
    well_formed && !is_acronym
}

/// Leading proper-cased words of a line, stopping before the company words
/// that precede an entity suffix (`Jane Doe Acme Solutions GmbH` → `Jane Doe`).
/// A run of three or more words before a suffix keeps its first two as the
/// name; a two-word run before a suffix is a company on its own.
fn leading_name(line: &str) -> Option<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let mut run: Vec<&str> = Vec::new();
    for (i, word) in words.iter().enumerate() {
        if is_entity_suffix(word) {
            if run.len() > 2 {
                run.truncate(2);
            } else {
                run.pop();
            }
            break;
        }
        if !is_name_word(word) {
            // "Some Page 12K Follower" names a page, not a person.
            if words.get(i + 1).is_some_and(|next| next.starts_with("Follower")) {
                return None;
            }
            break;
        }
        run.push(word);
    }

    if run.len() < 2 || run.len() > MAX_NAME_WORDS {
        return None;
    }
    let name = run.join(" ");
    (name.chars().count() < MAX_NAME_CHARS).then_some(name)
}

fn find_author(header: &str) -> Option<AuthorMatch> {
    header
        .split(['\n', '·', '•', '|'])
        .find_map(leading_name)
        .and_then(|name| {
            let start = header.find(&name)?;
            Some(AuthorMatch {
                end: start + name.len(),
                start,
                name,
            })
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Company
// ────────────────────────────────────────────────────────────────────────────

static KNOWN_COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Kirsten\s+Controlsystems\s+GmbH|Mei\s+Luft\s+GmbH\s+&\s+Co\.\s+KG)")
        .expect("valid regex")
});
static COMPANY_WITH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-ZÄÖÜ][\p{L}\d&.\-]*(?: (?:& )?[A-ZÄÖÜ\d][\p{L}\d&.\-]*)*? (?:GmbH(?: & Co\.? KG)?|AG|SE|Inc|LLC|Ltd|Corporation|Corp|KG|UG))\b",
    )
    .expect("valid regex")
});
static COMPANY_BEFORE_FOLLOWERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-ZÄÖÜ][\p{L}&.,\- ]{3,50}) \d+(?:[.,]\d+)?[KM]? Follower").expect("valid regex")
});
static FOLLOWERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?[KM]?)\s+Follower").expect("valid regex"));

fn first_group(re: &Regex, text: &str) -> Option<String> {
    let found = re.captures(text)?.get(1)?.as_str();
    let cleaned = found
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', '-'])
        .trim()
        .to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn match_known_company(text: &str) -> Option<String> {
    first_group(&KNOWN_COMPANY, text)
}

fn match_company_with_suffix(text: &str) -> Option<String> {
    first_group(&COMPANY_WITH_SUFFIX, text)
}

fn match_company_before_followers(text: &str) -> Option<String> {
    first_group(&COMPANY_BEFORE_FOLLOWERS, text)
}

type CompanyMatcher = fn(&str) -> Option<String>;

const COMPANY_MATCHERS: [CompanyMatcher; 3] = [
    match_known_company,
    match_company_with_suffix,
    match_company_before_followers,
];

fn find_company(text: &str) -> Option<String> {
    COMPANY_MATCHERS.iter().find_map(|matcher| matcher(text))
}

fn find_followers(text: &str) -> Option<String> {
    FOLLOWERS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_stops_before_company() {
        let meta = parse_metadata("Jane Doe Acme GmbH 500 Follower");
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.company.as_deref(), Some("Acme GmbH"));
        assert_eq!(meta.followers.as_deref(), Some("500"));
    }

    #[test]
    fn test_multi_word_company_after_author() {
        let meta = parse_metadata("Jane Doe Acme Solutions GmbH 500 Follower");
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.company.as_deref(), Some("Acme Solutions GmbH"));
        assert_eq!(meta.followers.as_deref(), Some("500"));

        let meta = parse_metadata("Jane Doe Deutsche Bahn AG");
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
        assert_eq!(meta.company.as_deref(), Some("Deutsche Bahn AG"));
    }

    #[test]
    fn test_two_word_company_alone_has_no_author() {
        let meta = parse_metadata("Deutsche Bahn AG");
        assert_eq!(meta.author, None);
        assert_eq!(meta.company.as_deref(), Some("Deutsche Bahn AG"));
    }

    #[test]
    fn test_author_on_own_line() {
        let meta = parse_metadata("Acme Solutions GmbH\n1.234 Follower\nMax Mustermann\nCEO bei Acme");
        assert_eq!(meta.author.as_deref(), Some("Max Mustermann"));
        assert_eq!(meta.company.as_deref(), Some("Acme Solutions GmbH"));
        assert_eq!(meta.followers.as_deref(), Some("1.234"));
    }

    #[test]
    fn test_acronym_ends_name() {
        let meta = parse_metadata("Erika Musterfrau CEO");
        assert_eq!(meta.author.as_deref(), Some("Erika Musterfrau"));
    }

    #[test]
    fn test_company_alone_is_not_an_author() {
        let meta = parse_metadata("Beispiel AG");
        assert_eq!(meta.author, None);
        assert_eq!(meta.company.as_deref(), Some("Beispiel AG"));
    }

    #[test]
    fn test_known_company_preferred() {
        let meta = parse_metadata("Anna Schmidt\nMei Luft GmbH & Co. KG");
        assert_eq!(meta.company.as_deref(), Some("Mei Luft GmbH & Co. KG"));
    }

    #[test]
    fn test_company_from_follower_line() {
        let meta = parse_metadata("Open Source Collective 12K Follower");
        assert_eq!(meta.company.as_deref(), Some("Open Source Collective"));
        assert_eq!(meta.followers.as_deref(), Some("12K"));
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(parse_metadata(""), PostMetadata::default());
    }

    #[test]
    fn test_name_word_rules() {
        assert!(is_name_word("Müller-Lüdenscheidt"));
        assert!(is_name_word("O'Neil"));
        assert!(!is_name_word("CEO"));
        assert!(!is_name_word("500"));
        assert!(!is_name_word("jane"));
    }
}
