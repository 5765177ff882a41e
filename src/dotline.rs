//! Fixed-length marker rows for rated traits.

use serde_json::Value;

pub const DEFAULT_MAX: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dot {
    Full,
    Bonus,
    Broken,
    Empty,
    /// Scar dot granted without cost.
    Free,
    /// Scar dot removed by a deviation.
    Ghost,
    /// Scar dot added by a deviation.
    Extra,
}

impl Dot {
    fn class(self) -> &'static str {
        match self {
            Dot::Full => "full",
            Dot::Bonus => "bonus",
            Dot::Broken => "broken",
            Dot::Empty => "empty",
            Dot::Free => "free",
            Dot::Ghost => "ghost",
            Dot::Extra => "extra",
        }
    }

    fn glyph(self) -> char {
        match self {
            Dot::Full | Dot::Extra => '\u{25CF}',
            Dot::Bonus | Dot::Free => '\u{25C9}',
            Dot::Broken => '\u{2298}',
            Dot::Empty | Dot::Ghost => '\u{25CB}',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DotValue {
    pub base: i64,
    pub bonus: i64,
    pub broken: i64,
    pub max: i64,
}

impl DotValue {
    /// Read `base`/`bonus`/`broken`/`max` from a trait or its nested `value`.
    pub fn from_json(v: &Value, max_override: Option<i64>) -> Self {
        let inner = match v.get("value") {
            Some(inner @ Value::Object(_)) => inner,
            _ => v,
        };
        let field = |name: &str| inner.get(name).and_then(Value::as_f64).map(|f| f as i64);
        let base = match v {
            Value::Number(n) => n.as_f64().map(|f| f as i64).unwrap_or(0),
            _ => field("base")
                .or_else(|| v.get("value").and_then(Value::as_f64).map(|f| f as i64))
                .unwrap_or(0),
        };
        Self {
            base,
            bonus: field("bonus").unwrap_or(0),
            broken: field("broken").unwrap_or(0),
            max: max_override
                .or_else(|| field("max"))
                .unwrap_or(DEFAULT_MAX as i64),
        }
    }

    /// Row length limited to `limit` markers.
    pub fn capped(self, limit: usize) -> Self {
        Self {
            max: self.max.min(i64::try_from(limit).unwrap_or(i64::MAX)),
            ..self
        }
    }
}

/// Exactly `max` markers. Broken dots claim slots first, then base, then
/// bonus; whatever remains is empty.
pub fn dotline(value: DotValue) -> Vec<Dot> {
    let max = value.max.max(0) as usize;
    let broken = (value.broken.max(0) as usize).min(max);
    let base = (value.base.max(0) as usize).min(max - broken);
    let bonus = (value.bonus.max(0) as usize).min(max - broken - base);
    let empty = max - broken - base - bonus;

    let mut dots = Vec::with_capacity(max);
    dots.extend(std::iter::repeat(Dot::Full).take(base));
    dots.extend(std::iter::repeat(Dot::Bonus).take(bonus));
    dots.extend(std::iter::repeat(Dot::Broken).take(broken));
    dots.extend(std::iter::repeat(Dot::Empty).take(empty));
    dots
}

/// Scar magnitude row: a negative deviation ghosts out existing dots, a
/// positive one appends extra dots; `free` marks at most one full dot.
/// The row never exceeds `limit` markers.
pub fn scar_dots(base: i64, deviation: i64, free: bool, limit: usize) -> Vec<Dot> {
    let base = (base.max(0) as usize).min(limit);
    let mut dots = Vec::new();
    if deviation < 0 {
        let ghosted = (deviation.unsigned_abs() as usize).min(base);
        dots.extend(std::iter::repeat(Dot::Full).take(base - ghosted));
        dots.extend(std::iter::repeat(Dot::Ghost).take(ghosted));
    } else {
        dots.extend(std::iter::repeat(Dot::Full).take(base));
        let extra = (deviation as usize).min(limit - base);
        dots.extend(std::iter::repeat(Dot::Extra).take(extra));
    }
    if free {
        if let Some(last_full) = dots.iter().rposition(|d| *d == Dot::Full) {
            dots[last_full] = Dot::Free;
        }
    }
    dots
}

pub fn render(dots: &[Dot]) -> String {
    let mut out = String::from("<span class='dotline'>");
    for dot in dots {
        out.push_str(&format!(
            "<span class='dot dot-{}'>{}</span>",
            dot.class(),
            dot.glyph()
        ));
    }
    out.push_str("</span>");
    out
}
