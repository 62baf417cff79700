//! Choice and confirm prompts: rendering the question, recognizing the answer.

pub const GENDER_CHOICES: &[&str] = &["Male", "Female"];

const YES_WORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "correct", "true",
];
const NO_WORDS: &[&str] = &["no", "n", "nope", "nah", "false"];

/// Render a prompt with its numbered choices, e.g.
/// `Please enter your gender. (1) Male or (2) Female`.
pub fn choice_prompt(text: &str, choices: &[&str]) -> String {
    let numbered: Vec<String> = choices
        .iter()
        .enumerate()
        .map(|(i, choice)| format!("({}) {choice}", i + 1))
        .collect();

    let list = match numbered.as_slice() {
        [] => return text.to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    };
    format!("{text} {list}")
}

/// Render a yes/no confirmation.
pub fn confirm_prompt(text: &str) -> String {
    choice_prompt(text, &["Yes", "No"])
}

/// Match an answer against `choices`.
///
/// Accepts the choice itself (case-insensitive), its 1-based number, or a
/// sentence naming exactly one choice as a whole word.
pub fn recognize_choice<'a>(input: &str, choices: &[&'a str]) -> Option<&'a str> {
    let answer = normalize(input);
    if answer.is_empty() {
        return None;
    }

    if let Some(choice) = choices
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(&answer))
    {
        return Some(choice);
    }

    if let Ok(index) = answer.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| choices.get(i)).copied();
    }

    let words: Vec<&str> = answer.split_whitespace().collect();
    let mut named = choices
        .iter()
        .copied()
        .filter(|c| words.iter().any(|w| c.eq_ignore_ascii_case(w)));
    match (named.next(), named.next()) {
        (Some(choice), None) => Some(choice),
        _ => None,
    }
}

/// Interpret an answer as yes or no. `None` when it is neither.
pub fn recognize_confirm(input: &str) -> Option<bool> {
    let answer = normalize(input);
    match answer.as_str() {
        "1" => return Some(true),
        "2" => return Some(false),
        _ => {}
    }
    let first = answer.split_whitespace().next()?;
    if YES_WORDS.contains(&first) {
        Some(true)
    } else if NO_WORDS.contains(&first) {
        Some(false)
    } else {
        None
    }
}

/// Lowercase, trimmed, without surrounding punctuation or brackets.
fn normalize(input: &str) -> String {
    input
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase()
        .split(|c: char| c == ',' || c == '!' || c == '.')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_two_choices_inline() {
        assert_eq!(
            choice_prompt("Please enter your gender.", GENDER_CHOICES),
            "Please enter your gender. (1) Male or (2) Female"
        );
        assert_eq!(confirm_prompt("Is this ok?"), "Is this ok? (1) Yes or (2) No");
    }

    #[test]
    fn renders_longer_lists_with_commas() {
        assert_eq!(
            choice_prompt("Pick one.", &["Red", "Green", "Blue"]),
            "Pick one. (1) Red, (2) Green, or (3) Blue"
        );
        assert_eq!(choice_prompt("Nothing.", &[]), "Nothing.");
    }

    #[test]
    fn choice_by_name_or_number() {
        assert_eq!(recognize_choice("male", GENDER_CHOICES), Some("Male"));
        assert_eq!(recognize_choice(" FEMALE ", GENDER_CHOICES), Some("Female"));
        assert_eq!(recognize_choice("2", GENDER_CHOICES), Some("Female"));
        assert_eq!(recognize_choice("(1)", GENDER_CHOICES), Some("Male"));
    }

    #[test]
    fn choice_in_a_sentence() {
        assert_eq!(recognize_choice("I am female", GENDER_CHOICES), Some("Female"));
        assert_eq!(recognize_choice("male or female", GENDER_CHOICES), None);
    }

    #[test]
    fn unrecognized_choices() {
        for input in ["", "0", "3", "other", "femal"] {
            assert_eq!(recognize_choice(input, GENDER_CHOICES), None, "input {input:?}");
        }
    }

    #[test]
    fn confirm_answers() {
        for input in ["yes", "Yes!", "y", "ok", "Sure, go ahead", "1"] {
            assert_eq!(recognize_confirm(input), Some(true), "input {input:?}");
        }
        for input in ["no", "No.", "nope", "2", "n"] {
            assert_eq!(recognize_confirm(input), Some(false), "input {input:?}");
        }
        for input in ["", "maybe", "not sure"] {
            assert_eq!(recognize_confirm(input), None, "input {input:?}");
        }
    }
}
