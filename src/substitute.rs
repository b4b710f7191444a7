//! Placeholder substitution – rewrites one paragraph's text into a fresh run
//! sequence.
//!
//! Replacement is plain substring replacement, token by token, in
//! [`VariableMap`] order. Highlighting then splits the final text on the
//! *first* value (in the same order) that occurs in it; only that value gets
//! the highlight style. [`HighlightMode::AllValues`] highlights every value
//! instead.

use serde::{Deserialize, Serialize};

use crate::style::{RunStyle, StyleConfig};
use crate::variables::VariableMap;

/// A span of text with uniform formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

/// Which substituted values receive the highlight style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// Only the first value (in field order) found in the paragraph.
    #[default]
    FirstMatch,
    /// Every non-empty value found in the paragraph.
    AllValues,
}

/// Outcome of substituting one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub runs: Vec<TextRun>,
    /// Whether any token was replaced.
    pub changed: bool,
}

impl Substitution {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Replace every token occurrence with its value, in map order.
pub fn replace_tokens(text: &str, vars: &VariableMap) -> String {
    let mut out = text.to_string();
    for (token, value) in vars.iter() {
        if out.contains(token) {
            out = out.replace(token, value);
        }
    }
    out
}

/// Substitute `text` and split the result into styled runs.
pub fn substitute(
    text: &str,
    vars: &VariableMap,
    styles: &StyleConfig,
    mode: HighlightMode,
) -> Substitution {
    let replaced = replace_tokens(text, vars);
    let changed = replaced != text;
    let plain = styles.plain();

    if !changed {
        return Substitution {
            runs: plain_runs(replaced, &plain),
            changed,
        };
    }

    let highlight = styles.highlight();
    let runs = match mode {
        HighlightMode::FirstMatch => split_first_match(&replaced, vars, &plain, &highlight),
        HighlightMode::AllValues => split_all_values(&replaced, vars, &plain, &highlight),
    };
    Substitution { runs, changed }
}

fn plain_runs(text: String, plain: &RunStyle) -> Vec<TextRun> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![TextRun {
        text,
        style: plain.clone(),
    }]
}

fn split_first_match(
    text: &str,
    vars: &VariableMap,
    plain: &RunStyle,
    highlight: &RunStyle,
) -> Vec<TextRun> {
    // Empty values can't act as a separator.
    let Some(value) = vars
        .iter()
        .map(|(_, v)| v)
        .find(|v| !v.is_empty() && text.contains(v))
    else {
        return plain_runs(text.to_string(), plain);
    };

    let mut runs = Vec::new();
    for (i, part) in text.split(value).enumerate() {
        if i > 0 {
            runs.push(TextRun {
                text: value.to_string(),
                style: highlight.clone(),
            });
        }
        if !part.is_empty() {
            runs.push(TextRun {
                text: part.to_string(),
                style: plain.clone(),
            });
        }
    }
    runs
}

fn split_all_values(
    text: &str,
    vars: &VariableMap,
    plain: &RunStyle,
    highlight: &RunStyle,
) -> Vec<TextRun> {
    let values: Vec<&str> = vars.iter().map(|(_, v)| v).filter(|v| !v.is_empty()).collect();
    let mut runs = Vec::new();
    let mut rest = text;

    loop {
        // Earliest occurrence wins; on a tie the longer value wins.
        let next = values
            .iter()
            .filter_map(|v| rest.find(v).map(|pos| (pos, *v)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

        let Some((pos, value)) = next else {
            if !rest.is_empty() {
                runs.push(TextRun {
                    text: rest.to_string(),
                    style: plain.clone(),
                });
            }
            return runs;
        };

        if pos > 0 {
            runs.push(TextRun {
                text: rest[..pos].to_string(),
                style: plain.clone(),
            });
        }
        runs.push(TextRun {
            text: value.to_string(),
            style: highlight.clone(),
        });
        rest = &rest[pos + value.len()..];
    }
}
