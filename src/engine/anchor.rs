//! Anchor parsing for pattern keys.
//!
//! An anchor is a sigil wrapped around an object key in a pattern that
//! changes its match semantics, e.g. `(name)` makes the key conditional
//! and `X(name)` negates it.

/// A pattern key with its anchor semantics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor<'a> {
    /// No anchor: the key is required and its value must match
    Plain(&'a str),
    /// `(key)`: if the value does not match, the surrounding object is
    /// skipped rather than failed
    Condition(&'a str),
    /// `=(key)`: the resource value must equal the pattern value
    Equality(&'a str),
    /// `^(key)`: the key must exist; its value is unconstrained
    Existence(&'a str),
    /// `+(key)`: add-if-not-present; validation treats it as required
    AddIfNotPresent(&'a str),
    /// `X(key)`: the key must be absent, or its value must not match
    Negation(&'a str),
    /// `<(key)`: global anchor, consumed by anyPattern merging
    Global(&'a str),
}

impl<'a> Anchor<'a> {
    /// Parse a pattern key into its anchor form
    pub fn parse(key: &'a str) -> Anchor<'a> {
        if let Some(inner) = strip_wrapped(key, "(", ")") {
            return Anchor::Condition(inner);
        }
        if let Some(inner) = strip_wrapped(key, "=(", ")") {
            return Anchor::Equality(inner);
        }
        if let Some(inner) = strip_wrapped(key, "^(", ")") {
            return Anchor::Existence(inner);
        }
        if let Some(inner) = strip_wrapped(key, "+(", ")") {
            return Anchor::AddIfNotPresent(inner);
        }
        if let Some(inner) = strip_wrapped(key, "X(", ")") {
            return Anchor::Negation(inner);
        }
        if let Some(inner) = strip_wrapped(key, "<(", ")") {
            return Anchor::Global(inner);
        }
        if let Some(inner) = strip_wrapped(key, ">(", ")") {
            return Anchor::Global(inner);
        }
        Anchor::Plain(key)
    }

    /// The key without its anchor sigils
    pub fn key(&self) -> &'a str {
        match self {
            Anchor::Plain(k)
            | Anchor::Condition(k)
            | Anchor::Equality(k)
            | Anchor::Existence(k)
            | Anchor::AddIfNotPresent(k)
            | Anchor::Negation(k)
            | Anchor::Global(k) => k,
        }
    }

    /// Anchors whose mismatch skips the surrounding object
    pub fn is_condition(&self) -> bool {
        matches!(self, Anchor::Condition(_) | Anchor::Global(_))
    }
}

/// Check whether a raw pattern key carries any anchor sigil
pub fn is_anchored(key: &str) -> bool {
    !matches!(Anchor::parse(key), Anchor::Plain(_))
}

/// Check whether a raw pattern key is a condition-style anchor
pub fn is_condition_anchor(key: &str) -> bool {
    Anchor::parse(key).is_condition()
}

fn strip_wrapped<'a>(key: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)
        .and_then(|k| k.strip_suffix(suffix))
        .map(str::trim)
}
