//! Display formatting: numbers, signs, lists and pronouns.

pub const MINUS_SIGN: char = '\u{2212}';

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{n:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// `+` for zero and positives, U+2212 for negatives.
pub fn format_signed(n: f64) -> String {
    if n < 0.0 {
        format!("{MINUS_SIGN}{}", format_number(-n))
    } else {
        format!("+{}", format_number(n))
    }
}

/// "A", "A and B", "A, B, and C".
pub fn join_list(items: &[String], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{a} {conjunction} {b}"),
        [init @ .., last] => format!("{}, {conjunction} {last}", init.join(", ")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Unspecified,
}

impl Sex {
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("male") | Some("m") | Some("man") => Sex::Male,
            Some("female") | Some("f") | Some("woman") => Sex::Female,
            _ => Sex::Unspecified,
        }
    }
}

const PRONOUNS: &[(&str, &str, &str, &str)] = &[
    ("he", "he", "she", "they"),
    ("his", "his", "her", "their"),
    ("him", "him", "her", "them"),
    ("himself", "himself", "herself", "themselves"),
    ("he's", "he's", "she's", "they're"),
];

pub fn is_pronoun(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    PRONOUNS.iter().any(|(k, ..)| *k == lower)
}

/// Substitute a pronoun keyword, mirroring the token's capitalization.
pub fn pronoun(token: &str, sex: Sex) -> Option<String> {
    let lower = token.to_ascii_lowercase();
    let (_, male, female, neutral) = PRONOUNS.iter().find(|(k, ..)| *k == lower)?;
    let word = match sex {
        Sex::Male => *male,
        Sex::Female => *female,
        Sex::Unspecified => *neutral,
    };
    Some(mirror_case(token, word))
}

fn mirror_case(original: &str, word: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return word.to_uppercase();
    }
    match original.chars().next() {
        Some(c) if c.is_uppercase() => capitalize(word),
        _ => word.to_string(),
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
        assert_eq!(format_signed(0.0), "+0");
        assert_eq!(format_signed(2.0), "+2");
        assert_eq!(format_signed(-3.0), "\u{2212}3");
    }

    #[test]
    fn lists() {
        let items = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(join_list(&items(&[]), "and"), "");
        assert_eq!(join_list(&items(&["A"]), "and"), "A");
        assert_eq!(join_list(&items(&["A", "B"]), "and"), "A and B");
        assert_eq!(join_list(&items(&["A", "B", "C"]), "or"), "A, B, or C");
    }

    #[test]
    fn pronouns_mirror_case() {
        assert_eq!(pronoun("he", Sex::Female).as_deref(), Some("she"));
        assert_eq!(pronoun("His", Sex::Female).as_deref(), Some("Her"));
        assert_eq!(pronoun("HIMSELF", Sex::Unspecified).as_deref(), Some("THEMSELVES"));
        assert_eq!(pronoun("He's", Sex::Unspecified).as_deref(), Some("They're"));
        assert_eq!(pronoun("him", Sex::Male).as_deref(), Some("him"));
        assert_eq!(pronoun("she", Sex::Male), None);
        assert_eq!(Sex::parse(Some("F")), Sex::Female);
        assert_eq!(Sex::parse(None), Sex::Unspecified);
    }
}
