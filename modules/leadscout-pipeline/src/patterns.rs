//! Pure helpers shared by the discovery adapters: name splitting, email
//! pattern generation, email extraction and role normalization.

use std::sync::LazyLock;

use regex::Regex;

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.[A-Za-z]{2,}").unwrap());
static RE_EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Substrings that mark a sender as automated rather than a person.
pub const SPAM_MARKERS: &[&str] = &[
    "noreply",
    "donotreply",
    "notification",
    "sentry",
    "wix",
    "mailchimp",
    "automated",
    "bot",
    "system",
];

/// Title keywords that identify a decision-maker.
pub const LEADERSHIP_KEYWORDS: &[&str] = &[
    "founder",
    "ceo",
    "owner",
    "president",
    "presidente",
    "administrator",
    "administrador",
];

/// Generic local parts tried after the name-based ones.
const GENERIC_LOCAL_PARTS: &[&str] = &["founder", "ceo", "admin", "contact", "info"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        c if c.is_ascii_alphanumeric() || c.is_whitespace() => c,
        _ => return None,
    };
    Some(folded)
}

/// Lower-case, accent-folded, punctuation-free words of a person's name.
pub fn clean_name(name: &str) -> Vec<String> {
    let folded: String = name.to_lowercase().chars().filter_map(fold_char).collect();
    folded.split_whitespace().map(str::to_string).collect()
}

/// First and last word of a name. A single-word name has an empty `last`.
pub fn split_name(name: &str) -> Option<NameParts> {
    let words = clean_name(name);
    let first = words.first()?.clone();
    let last = if words.len() > 1 {
        words.last().cloned().unwrap_or_default()
    } else {
        String::new()
    };
    Some(NameParts { first, last })
}

pub fn is_valid_email_format(email: &str) -> bool {
    RE_EMAIL_SHAPE.is_match(email)
}

pub fn email_domain(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, d)| d).filter(|d| !d.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailPattern {
    pub email: String,
    pub probability: f64,
}

/// Candidate addresses for `name` at `domain`, most likely first.
///
/// Name-based forms come first (first.last, f.last, firstlast, first, flast,
/// first_last), then the generic mailboxes. Probability starts at 1.0 and
/// drops by 0.1 per pattern down to 0.1. Forms that need a surname are
/// skipped for single-word names, and duplicates are dropped.
pub fn email_patterns(name: &str, domain: &str) -> Vec<EmailPattern> {
    let mut locals: Vec<String> = Vec::new();
    if let Some(NameParts { first, last }) = split_name(name) {
        let initial: String = first.chars().take(1).collect();
        if !last.is_empty() {
            locals.push(format!("{first}.{last}"));
            locals.push(format!("{initial}.{last}"));
            locals.push(format!("{first}{last}"));
        }
        locals.push(first.clone());
        if !last.is_empty() {
            locals.push(format!("{initial}{last}"));
            locals.push(format!("{first}_{last}"));
        }
    }
    locals.extend(GENERIC_LOCAL_PARTS.iter().map(|s| s.to_string()));

    let mut seen = std::collections::HashSet::new();
    let mut probability: f64 = 1.0;
    let mut patterns = Vec::new();
    for local in locals {
        let email = format!("{local}@{domain}");
        if !is_valid_email_format(&email) || !seen.insert(email.clone()) {
            continue;
        }
        patterns.push(EmailPattern { email, probability });
        probability = ((probability - 0.1) * 10.0).round() / 10.0;
        probability = probability.max(0.1);
    }
    patterns
}

/// The single address used when a source knows the owner's name but no email:
/// first.last, else first, else founder.
pub fn primary_email(name: &str, domain: &str) -> String {
    match split_name(name) {
        Some(NameParts { first, last }) if !last.is_empty() => format!("{first}.{last}@{domain}"),
        Some(NameParts { first, .. }) => format!("{first}@{domain}"),
        None => format!("founder@{domain}"),
    }
}

/// All addresses found in `text`, lower-cased and de-duplicated in order.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in RE_EMAIL.find_iter(text) {
        let email = m.as_str().trim_end_matches('.').to_lowercase();
        if !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

pub fn is_spam_email(email: &str) -> bool {
    let lower = email.to_lowercase();
    SPAM_MARKERS.iter().any(|marker| lower.contains(marker))
}

pub fn filter_spam(emails: Vec<String>) -> Vec<String> {
    emails.into_iter().filter(|e| !is_spam_email(e)).collect()
}

pub fn is_leadership_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    LEADERSHIP_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Short role label for a job title or headline.
pub fn normalize_role(title: &str) -> String {
    let lower = title.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["co-founder", "cofundador", "cofounder"]) {
        return "Co-Fundador".to_string();
    }
    if has(&["ceo", "chief executive"]) {
        return "CEO".to_string();
    }
    if has(&["founder", "fundador"]) {
        return "Fundador".to_string();
    }
    if has(&["owner", "propietario", "dueño"]) {
        return "Propietario".to_string();
    }
    if has(&["director general", "managing director"]) {
        return "Director General".to_string();
    }
    if has(&["director"]) {
        return "Director".to_string();
    }
    if has(&["gerente", "manager"]) {
        return "Gerente".to_string();
    }
    if has(&["presidente", "president"]) {
        return "Presidente".to_string();
    }

    let head = title
        .split('|')
        .next()
        .unwrap_or_default()
        .split(" at ")
        .next()
        .unwrap_or_default()
        .split(" en ")
        .next()
        .unwrap_or_default()
        .trim();
    if head.is_empty() {
        "Profesional".to_string()
    } else {
        head.chars().take(35).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_order_for_full_name() {
        let emails: Vec<String> = email_patterns("Ana Ruiz", "acme.com")
            .into_iter()
            .map(|p| p.email)
            .collect();
        assert_eq!(
            emails,
            vec![
                "ana.ruiz@acme.com",
                "a.ruiz@acme.com",
                "anaruiz@acme.com",
                "ana@acme.com",
                "aruiz@acme.com",
                "ana_ruiz@acme.com",
                "founder@acme.com",
                "ceo@acme.com",
                "admin@acme.com",
                "contact@acme.com",
                "info@acme.com",
            ]
        );
    }

    #[test]
    fn probabilities_decrease_to_floor() {
        let patterns = email_patterns("Ana Ruiz", "acme.com");
        assert_eq!(patterns[0].probability, 1.0);
        assert!((patterns[1].probability - 0.9).abs() < 1e-9);
        for pair in patterns.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
        assert_eq!(patterns.last().unwrap().probability, 0.1);
    }

    #[test]
    fn generic_hint_does_not_duplicate() {
        let emails: Vec<String> = email_patterns("founder", "acme.com")
            .into_iter()
            .map(|p| p.email)
            .collect();
        assert_eq!(emails[0], "founder@acme.com");
        assert_eq!(emails.iter().filter(|e| *e == "founder@acme.com").count(), 1);
    }

    #[test]
    fn names_with_accents_and_middle_names() {
        let parts = split_name("José María García").unwrap();
        assert_eq!(parts.first, "jose");
        assert_eq!(parts.last, "garcia");
        assert_eq!(primary_email("José María García", "acme.es"), "jose.garcia@acme.es");
        assert_eq!(primary_email("Madonna", "acme.es"), "madonna@acme.es");
        assert_eq!(primary_email("  ", "acme.es"), "founder@acme.es");
    }

    #[test]
    fn extracts_and_filters_emails() {
        let text = "Contact Ana at ANA@Acme.com. or noreply@acme.com, ana@acme.com again";
        let emails = extract_emails(text);
        assert_eq!(emails, vec!["ana@acme.com", "noreply@acme.com"]);
        assert_eq!(filter_spam(emails), vec!["ana@acme.com"]);
    }

    #[test]
    fn leadership_titles() {
        assert!(is_leadership_title("Co-Founder & CTO"));
        assert!(is_leadership_title("Administrador único"));
        assert!(!is_leadership_title("Personal Trainer"));
    }

    #[test]
    fn role_normalization() {
        assert_eq!(normalize_role("CEO at Acme"), "CEO");
        assert_eq!(normalize_role("Cofundador de Acme"), "Co-Fundador");
        assert_eq!(normalize_role("Dueño"), "Propietario");
        assert_eq!(normalize_role("Head Coach | Acme Gym"), "Head Coach");
        assert_eq!(normalize_role(""), "Profesional");
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email_format("a@b.co"));
        assert!(!is_valid_email_format("a@b"));
        assert!(!is_valid_email_format("a b@c.com"));
        assert_eq!(email_domain("ana@acme.com"), Some("acme.com"));
    }
}
