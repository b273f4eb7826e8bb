//! Ordered color-assignment rules for file hues.
//!
//! A rule is a substring predicate over the file identifier with an
//! associated fixed color. Rules are tried in configuration order and
//! the first match wins; a catch-all default rule is always present
//! and tried last, so assignment is total.

use churn_types::Rgb;

/// One color-assignment rule.
#[derive(Debug, Clone)]
pub struct ColorRule {
    /// Human-readable label, used for the rendering legend.
    pub label: String,
    /// Substring the file identifier must contain to match.
    ///
    /// An empty pattern matches everything, which is how the trailing
    /// catch-all rule is expressed.
    pub pattern: String,
    /// The color assigned on match.
    pub color: Rgb,
}

impl ColorRule {
    /// Whether this rule matches the given file identifier.
    pub fn matches(&self, filename: &str) -> bool {
        filename.contains(&self.pattern)
    }
}

/// The immutable, ordered rule list.
///
/// `assign` is a pure function of the identifier and the rules: no
/// per-call mutation, so the assigner can be shared freely.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    rules: Vec<ColorRule>,
}

impl ColorAssigner {
    /// Build an assigner from ordered rules plus a catch-all default.
    ///
    /// The default is appended last with an empty pattern, so every
    /// identifier gets a color even when no configured rule matches.
    pub fn new(mut rules: Vec<ColorRule>, default_label: &str, default_color: Rgb) -> Self {
        rules.push(ColorRule {
            label: default_label.to_owned(),
            pattern: String::new(),
            color: default_color,
        });
        Self { rules }
    }

    /// Assign a hue to a file identifier. First matching rule wins.
    pub fn assign(&self, filename: &str) -> Rgb {
        self.rules
            .iter()
            .find(|rule| rule.matches(filename))
            .map_or(Rgb::GRAY, |rule| rule.color)
    }

    /// The (label, color) pairs in rule order, for the legend.
    pub fn legend(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.rules.iter().map(|rule| (rule.label.as_str(), rule.color))
    }
}
