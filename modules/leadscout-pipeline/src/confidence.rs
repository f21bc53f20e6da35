//! Confidence model: a pure mapping from (source, validation signal) to a
//! score in `[0, 1]`.

use leadscout_common::SourceTag;

/// Score for a tag string that names no known source.
pub const UNKNOWN_SOURCE: f64 = 0.30;

/// Confidence a pattern guess gets before any validation.
pub const UNVALIDATED_PATTERN: f64 = 0.40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    /// The email's domain resolves and accepts mail.
    DomainReachable,
    /// The mailbox itself was confirmed. Never produced by the built-in
    /// validator, which does not perform an SMTP handshake.
    MailboxConfirmed,
}

pub fn base(source: SourceTag) -> f64 {
    match source {
        SourceTag::ProfessionalNetwork => 0.75,
        SourceTag::DomainRegistration => 0.70,
        SourceTag::WebSearch => 0.65,
        SourceTag::SocialBio => 0.60,
        SourceTag::SiteScrape => 0.55,
        SourceTag::PatternGuess => UNVALIDATED_PATTERN,
        SourceTag::Validator => 0.50,
        SourceTag::Fallback => 0.10,
    }
}

pub fn base_for_tag(tag: &str) -> f64 {
    SourceTag::parse(tag).map(base).unwrap_or(UNKNOWN_SOURCE)
}

pub fn score(source: SourceTag, signal: Signal) -> f64 {
    raise(base(source), signal)
}

/// Apply a validation signal to an existing confidence. Never lowers it.
pub fn raise(current: f64, signal: Signal) -> f64 {
    let current = current.clamp(0.0, 1.0);
    let raised = match signal {
        Signal::None => current,
        Signal::DomainReachable => (current + 0.10).min(base(SourceTag::Validator)),
        Signal::MailboxConfirmed => (current + 0.20).min(0.95),
    };
    current.max(raised).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_ordering_holds() {
        let order = [
            SourceTag::ProfessionalNetwork,
            SourceTag::DomainRegistration,
            SourceTag::WebSearch,
            SourceTag::PatternGuess,
            SourceTag::Fallback,
        ];
        for pair in order.windows(2) {
            assert!(base(pair[0]) >= base(pair[1]), "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn validation_never_lowers() {
        for tag in SourceTag::ALL {
            for signal in [Signal::None, Signal::DomainReachable, Signal::MailboxConfirmed] {
                assert!(score(tag, signal) >= base(tag));
                assert!((0.0..=1.0).contains(&score(tag, signal)));
            }
        }
    }

    #[test]
    fn reachable_pattern_is_capped_at_validator() {
        assert!((score(SourceTag::PatternGuess, Signal::DomainReachable) - 0.50).abs() < 1e-9);
        assert!((score(SourceTag::Fallback, Signal::DomainReachable) - 0.20).abs() < 1e-9);
        // Already above the cap: untouched.
        assert_eq!(score(SourceTag::WebSearch, Signal::DomainReachable), 0.65);
    }

    #[test]
    fn mailbox_confirmation_caps_at_095() {
        assert!((score(SourceTag::ProfessionalNetwork, Signal::MailboxConfirmed) - 0.95).abs() < 1e-9);
        assert!((score(SourceTag::SiteScrape, Signal::MailboxConfirmed) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn unknown_tags_and_out_of_range_inputs() {
        assert_eq!(base_for_tag("smoke_signals"), UNKNOWN_SOURCE);
        assert_eq!(base_for_tag("web_search"), 0.65);
        assert_eq!(raise(1.7, Signal::None), 1.0);
        assert_eq!(raise(-0.3, Signal::None), 0.0);
    }
}
