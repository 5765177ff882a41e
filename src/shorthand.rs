//! Short aliases for frequently referenced paths.

/// The nine base attributes as (name, three-letter form, display name).
pub const ATTRIBUTES: &[(&str, &str, &str)] = &[
    ("intelligence", "int", "Intelligence"),
    ("wits", "wit", "Wits"),
    ("resolve", "res", "Resolve"),
    ("strength", "str", "Strength"),
    ("dexterity", "dex", "Dexterity"),
    ("stamina", "sta", "Stamina"),
    ("presence", "pre", "Presence"),
    ("manipulation", "man", "Manipulation"),
    ("composure", "com", "Composure"),
];

const DERIVED: &[&str] = &[
    "health",
    "willpower",
    "speed",
    "defense",
    "initiative",
    "size",
    "armor",
];

/// Canonical dot-path for a bare alias, if it is one.
pub fn resolve_shorthand(alias: &str) -> Option<String> {
    if alias.contains('.') {
        return None;
    }
    let lower = alias.to_ascii_lowercase();
    if let Some((name, _, _)) = ATTRIBUTES
        .iter()
        .find(|(name, short, _)| *name == lower || *short == lower)
    {
        return Some(format!("attributes.{name}"));
    }
    DERIVED
        .iter()
        .find(|stat| **stat == lower)
        .map(|stat| format!("derived.{stat}"))
}

/// Display name of an attribute by its full name.
pub fn attribute_display(name: &str) -> Option<&'static str> {
    ATTRIBUTES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, _, display)| *display)
}

/// `baseInt`, `baseStr`, ... → attribute name.
pub fn base_attribute(expr: &str) -> Option<&'static str> {
    let suffix = expr.strip_prefix("base")?;
    let lower = suffix.to_ascii_lowercase();
    ATTRIBUTES
        .iter()
        .find(|(_, short, _)| *short == lower)
        .map(|(name, _, _)| *name)
}
