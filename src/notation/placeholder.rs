//! Opaque tokens standing in for tooltip HTML until finalization.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{NotationError, Result};

const OPEN: &str = "@@TT:";
const CLOSE: &str = "@@";

pub struct Placeholders {
    rng: StdRng,
    entries: HashMap<String, String>,
}

impl Placeholders {
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            rng: StdRng::seed_from_u64(seed),
            entries: HashMap::new(),
        }
    }

    /// Fresh base-36 identifier, unique within this registry.
    pub fn next_id(&mut self) -> String {
        loop {
            let id = to_base36(self.rng.random::<u64>());
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    /// Store `html` and return the token to splice into text instead.
    pub fn register(&mut self, html: String) -> String {
        let id = self.next_id();
        let token = format!("{OPEN}{id}{CLOSE}");
        self.entries.insert(id, html);
        token
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace every token, including tokens inside registered HTML.
    pub fn substitute(&self, text: &str) -> Result<String> {
        self.substitute_depth(text, 0)
    }

    fn substitute_depth(&self, text: &str, depth: usize) -> Result<String> {
        if depth > self.entries.len() {
            return Err(NotationError::Internal("cyclic tooltip placeholders".into()));
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find(OPEN) {
            out.push_str(&rest[..open]);
            let after = &rest[open + OPEN.len()..];
            let close = after.find(CLOSE).ok_or_else(|| {
                NotationError::Internal("truncated tooltip placeholder".into())
            })?;
            let id = &after[..close];
            let html = self.entries.get(id).ok_or_else(|| {
                NotationError::Internal(format!("unknown tooltip placeholder '{id}'"))
            })?;
            out.push_str(&self.substitute_depth(html, depth + 1)?);
            rest = &after[close + CLOSE.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
