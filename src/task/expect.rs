// src/task/expect.rs

//! Ordered-subsequence verification of captured output.

use regex::Regex;

/// Scan `lines` once, advancing through `expectations`.
///
/// Each line can satisfy at most the current expectation; matched lines do not
/// have to be contiguous. Returns the index of the first expectation that was
/// never reached, or `None` when all of them matched in order.
pub fn first_unmatched(lines: &[String], expectations: &[Regex]) -> Option<usize> {
    let mut cursor = 0;
    for line in lines {
        if cursor == expectations.len() {
            break;
        }
        if expectations[cursor].is_match(line) {
            cursor += 1;
        }
    }

    if cursor < expectations.len() {
        Some(cursor)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn regexes(v: &[&str]) -> Vec<Regex> {
        v.iter().map(|s| Regex::new(s).unwrap()).collect()
    }

    #[test]
    fn ordered_subsequence_matches() {
        let out = lines(&["a", "b", "c", "d"]);
        assert_eq!(first_unmatched(&out, &regexes(&["b", "d"])), None);
    }

    #[test]
    fn order_violation_is_reported() {
        let out = lines(&["a", "b", "c", "d"]);
        assert_eq!(first_unmatched(&out, &regexes(&["d", "b"])), Some(1));
    }

    #[test]
    fn absent_expectation_is_reported() {
        let out = lines(&["a", "b", "c", "d"]);
        assert_eq!(first_unmatched(&out, &regexes(&["e"])), Some(0));
    }

    #[test]
    fn one_line_satisfies_one_expectation() {
        let out = lines(&["ready ready"]);
        assert_eq!(first_unmatched(&out, &regexes(&["ready", "ready"])), Some(1));
    }

    #[test]
    fn expectations_are_searched_not_anchored() {
        let out = lines(&["12345 kvstore.jar"]);
        assert_eq!(first_unmatched(&out, &regexes(&[r"[0-9]+\s+kvstore"])), None);
        assert_eq!(first_unmatched(&[], &[]), None);
    }
}
