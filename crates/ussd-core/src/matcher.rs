//! Input matching against a step's rules.
//!
//! Rules are scanned in catalog order and the first exact trigger wins, so
//! authors can order overrides. The single empty-trigger rule is only used
//! when nothing matched exactly.

use ussd_types::step::InputRule;

/// Select the rule for `raw_input`, or `None` when the input is invalid here.
pub fn match_input<'a>(rules: &'a [InputRule], raw_input: &str) -> Option<&'a InputRule> {
    let input = raw_input.trim();
    rules
        .iter()
        .find(|rule| !rule.is_fallback() && rule.trigger == input)
        .or_else(|| rules.iter().find(|rule| rule.is_fallback()))
}

/// Whether some rule has exactly this trigger (the fallback does not count).
pub fn has_exact_trigger(rules: &[InputRule], raw_input: &str) -> bool {
    let input = raw_input.trim();
    rules
        .iter()
        .any(|rule| !rule.is_fallback() && rule.trigger == input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(trigger: &str, next: &str) -> InputRule {
        InputRule {
            trigger: trigger.to_string(),
            value: String::new(),
            action_name: None,
            next_step_id: Some(next.to_string()),
            validation_name: None,
        }
    }

    #[test]
    fn test_exact_match_wins_over_fallback() {
        let rules = vec![rule("1", "balance"), rule("", "catch_all")];
        let matched = match_input(&rules, "1").unwrap();
        assert_eq!(matched.next_step_id.as_deref(), Some("balance"));
    }

    #[test]
    fn test_fallback_when_no_exact_match() {
        let rules = vec![rule("1", "balance"), rule("", "catch_all")];
        let matched = match_input(&rules, "9").unwrap();
        assert_eq!(matched.next_step_id.as_deref(), Some("catch_all"));
    }

    #[test]
    fn test_fallback_listed_first_does_not_shadow_exact() {
        let rules = vec![rule("", "catch_all"), rule("2", "help")];
        let matched = match_input(&rules, "2").unwrap();
        assert_eq!(matched.next_step_id.as_deref(), Some("help"));
    }

    #[test]
    fn test_first_exact_match_wins() {
        let rules = vec![rule("1", "first"), rule("1", "second")];
        let matched = match_input(&rules, "1").unwrap();
        assert_eq!(matched.next_step_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_no_match_without_fallback() {
        let rules = vec![rule("1", "balance"), rule("2", "help")];
        assert!(match_input(&rules, "3").is_none());
        assert!(match_input(&[], "1").is_none());
    }

    #[test]
    fn test_input_is_trimmed() {
        let rules = vec![rule("1", "balance")];
        assert!(match_input(&rules, " 1 ").is_some());
        assert!(has_exact_trigger(&rules, "1\n"));
    }

    #[test]
    fn test_has_exact_trigger_ignores_fallback() {
        let rules = vec![rule("", "catch_all")];
        assert!(!has_exact_trigger(&rules, "0"));
    }
}
