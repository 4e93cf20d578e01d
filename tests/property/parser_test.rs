// tests/property/parser_test.rs

//! Property-based tests for line parsing

use buddygate::core::commands::{Command, Verb, split_first};
use proptest::prelude::*;

const VERBS: &[&str] = &[
    "STARTTLS",
    "PASS",
    "WHOAMI",
    "LIST",
    "REMOVE",
    "ADD",
    "TYPING",
    "STATUS",
    "CLIENT",
    "NAME",
    "DESCRIPTION",
    "MESSAGE",
    "BLOCK",
    "ALLOW",
    "BROADCAST",
    "GROUPCHATS",
    "GROUPCHAT_PARTICIPANTS",
    "GROUPCHAT_INVITE",
    "GROUPCHAT_LEAVE",
    "GROUPCHAT_MESSAGE",
    "LATENCY",
];

fn flip_case(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().cycle())
        .map(|(c, lower)| if *lower { c.to_ascii_lowercase() } else { c })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_parse_never_panics(line in "\\PC{0,200}") {
        let _ = Command::parse(&line);
    }

    #[test]
    fn test_known_verbs_match_in_any_case(
        index in 0..VERBS.len(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        args in "[a-z0-9]{1,10}( {1,3}[a-z0-9]{1,10}){0,3}",
    ) {
        let spelled = flip_case(VERBS[index], &mask);
        let command = Command::parse(&format!("{spelled} {args}")).unwrap();
        prop_assert_ne!(command.verb, Verb::Unknown);
        prop_assert_eq!(&command.name, &spelled);
        prop_assert_eq!(command.args(), Some(args.as_str()));
    }

    #[test]
    fn test_arguments_keep_inner_whitespace(
        head in "[A-Za-z_]{1,12}",
        gap in "[ \t]{1,4}",
        rest in "[a-z]{1,5}( {1,4}[a-z]{1,5}){0,4}",
    ) {
        let command = Command::parse(&format!("{head}{gap}{rest}")).unwrap();
        prop_assert_eq!(command.name, head);
        prop_assert_eq!(command.args, Some(rest));
    }

    #[test]
    fn test_split_first_head_has_no_whitespace(input in "\\PC{0,80}") {
        if let Some((head, rest)) = split_first(&input) {
            prop_assert!(!head.is_empty());
            prop_assert!(!head.contains(char::is_whitespace));
            if let Some(rest) = rest {
                prop_assert!(!rest.is_empty());
                prop_assert!(!rest.starts_with(char::is_whitespace));
            }
        } else {
            prop_assert!(input.trim().is_empty());
        }
    }
}
