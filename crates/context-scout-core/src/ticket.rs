//! Ticket identifier validation and matching.
//!
//! Ticket IDs reach the git miner and vector store straight from agent
//! input, so they are checked before any repository access.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ScoutError, ScoutResult};

pub const MAX_TICKET_ID_LEN: usize = 100;

fn ticket_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("static pattern is valid"))
}

/// Reject empty, over-long, or non `[A-Za-z0-9._-]` ticket IDs.
pub fn validate_ticket_id(ticket_id: &str) -> ScoutResult<()> {
    if ticket_id.is_empty() {
        return Err(ScoutError::InvalidInput("ticket_id must not be empty".into()));
    }
    if ticket_id.len() > MAX_TICKET_ID_LEN {
        return Err(ScoutError::InvalidInput(format!(
            "ticket_id exceeds {} characters",
            MAX_TICKET_ID_LEN
        )));
    }
    if !ticket_id_pattern().is_match(ticket_id) {
        return Err(ScoutError::InvalidInput(format!(
            "ticket_id '{}' may only contain letters, digits, '.', '_' and '-'",
            ticket_id
        )));
    }
    Ok(())
}

/// Whole-word, case-insensitive matcher for an already validated ticket ID.
pub fn ticket_matcher(ticket_id: &str) -> ScoutResult<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(ticket_id)))
        .map_err(|e| ScoutError::InvalidInput(format!("ticket_id '{}': {}", ticket_id, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_formats() {
        for id in ["PROJ-123", "abc_1", "v1.2.3", "42"] {
            assert!(validate_ticket_id(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        for id in ["", "PROJ 123", "../etc", "a|b", "PROJ-1;rm", "tick\u{e9}t"] {
            let err = validate_ticket_id(id).unwrap_err();
            assert!(matches!(err, ScoutError::InvalidInput(_)), "{id}");
        }
    }

    #[test]
    fn enforces_length_limit() {
        assert!(validate_ticket_id(&"a".repeat(100)).is_ok());
        assert!(validate_ticket_id(&"a".repeat(101)).is_err());
    }

    #[test]
    fn matcher_is_whole_word_and_case_insensitive() {
        let re = ticket_matcher("PROJ-12").unwrap();
        assert!(re.is_match("fix: proj-12 login redirect"));
        assert!(re.is_match("feature/PROJ-12"));
        assert!(!re.is_match("PROJ-123 unrelated"));
        assert!(!re.is_match("XPROJ-12"));
    }

    #[test]
    fn matcher_escapes_dots() {
        let re = ticket_matcher("v1.2").unwrap();
        assert!(re.is_match("release v1.2 notes"));
        assert!(!re.is_match("release v1x2 notes"));
    }
}
