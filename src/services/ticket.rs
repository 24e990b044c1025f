//! Ticket number generation
//!
//! A ticket number is `<CODE><SEQ><DD><YY>`: three characters derived from the
//! event title, the per-event sequence zero-padded to four digits, and the
//! day and two-digit year of the event date. Sequences above 9999 keep their
//! full width, so the code grows past 11 characters instead of wrapping.

use chrono::{Datelike, NaiveDate};

const CODE_LEN: usize = 3;
const FALLBACK_CODE: &str = "EVT";
const PAD: char = 'X';

/// Three-character code from the title's ASCII alphanumerics
pub fn title_code(event_title: &str) -> String {
    let mut code: String = event_title
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(CODE_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if code.is_empty() {
        code.push_str(FALLBACK_CODE);
    }
    while code.len() < CODE_LEN {
        code.push(PAD);
    }
    code
}

/// `DDYY` tail of a ticket number
pub fn date_code(event_date: NaiveDate) -> String {
    format!("{:02}{:02}", event_date.day(), event_date.year().rem_euclid(100))
}

/// Build the ticket number for the `seq`-th ticket of an event
pub fn generate_ticket_number(event_title: &str, seq: u32, event_date: NaiveDate) -> String {
    format!("{}{:04}{}", title_code(event_title), seq, date_code(event_date))
}

/// Sequence of `ticket_number` when it has the given code and date tail
pub fn parse_sequence(ticket_number: &str, code: &str, date_code: &str) -> Option<u32> {
    let digits = ticket_number.strip_prefix(code)?.strip_suffix(date_code)?;
    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_known_ticket_numbers() {
        assert_eq!(generate_ticket_number("Tech Summit 2025!", 7, date(2025, 3, 14)), "TEC00071425");
        assert_eq!(generate_ticket_number("A1", 1, date(2025, 1, 5)), "A1X00010525");
    }

    #[test]
    fn test_title_code_fallbacks() {
        assert_eq!(title_code("!!! ???"), "EVT");
        assert_eq!(title_code(""), "EVT");
        assert_eq!(title_code("z"), "ZXX");
        assert_eq!(title_code("Ngabsen Bareng"), "NGA");
        assert_eq!(title_code("É-Sport Cup"), "SPO");
    }

    #[test]
    fn test_sequence_overflow_keeps_full_width() {
        assert_eq!(generate_ticket_number("Expo", 12345, date(2030, 12, 31)), "EXP123453130");
    }

    #[test]
    fn test_year_uses_two_digits() {
        assert_eq!(generate_ticket_number("Expo", 1, date(2000, 1, 1)), "EXP00010100");
        assert_eq!(generate_ticket_number("Expo", 1, date(2109, 7, 9)), "EXP00010909");
    }

    #[test]
    fn test_parse_sequence_matches_pattern_only() {
        assert_eq!(parse_sequence("SEM00121425", "SEM", "1425"), Some(12));
        assert_eq!(parse_sequence("SEM123451425", "SEM", "1425"), Some(12345));
        assert_eq!(parse_sequence("SEM00121525", "SEM", "1425"), None);
        assert_eq!(parse_sequence("SEX00121425", "SEM", "1425"), None);
        assert_eq!(parse_sequence("SEM0A121425", "SEM", "1425"), None);
    }

    proptest! {
        #[test]
        fn prop_fixed_width_for_four_digit_sequences(title in ".{0,40}", seq in 0u32..10_000, days in 0i64..40_000) {
            let event_date = date(2000, 1, 1) + chrono::Duration::days(days);
            let number = generate_ticket_number(&title, seq, event_date);
            prop_assert_eq!(number.len(), 11);
            prop_assert!(number.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
            prop_assert_eq!(parse_sequence(&number, &title_code(&title), &date_code(event_date)), Some(seq));
        }

        #[test]
        fn prop_distinct_sequences_give_distinct_numbers(a in 0u32..10_000, b in 0u32..10_000) {
            prop_assume!(a != b);
            let event_date = date(2025, 6, 1);
            prop_assert_ne!(
                generate_ticket_number("Same Event", a, event_date),
                generate_ticket_number("Same Event", b, event_date)
            );
        }
    }
}
