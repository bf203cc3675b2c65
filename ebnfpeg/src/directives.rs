//! Turns `@name = value` statements into a [`LexicalPolicy`].

use super::ast::{Directive, DirectiveValue};
use super::error::{CompileError, CompileResult};
use regex::Regex;
use std::collections::BTreeSet;

/// How much implicit whitespace `~` and literal padding may consume.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WhitespaceMode {
    /// Only comments are skipped.
    #[default]
    None,
    /// Spaces and tabs, never a line feed.
    Horizontal,
    /// Any whitespace, line feeds included.
    Vertical,
    /// A user supplied pattern.
    Custom(String),
}

impl WhitespaceMode {
    pub fn pattern(&self) -> Option<&str> {
        match self {
            WhitespaceMode::None => None,
            WhitespaceMode::Horizontal => Some(r"[ \t]*"),
            WhitespaceMode::Vertical => Some(r"\s*"),
            WhitespaceMode::Custom(pattern) => Some(pattern.as_str()),
        }
    }
}

/// Which side(s) of a string literal implicitly consume whitespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LiteralWs {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl LiteralWs {
    pub fn left(self) -> bool {
        matches!(self, LiteralWs::Left | LiteralWs::Both)
    }

    pub fn right(self) -> bool {
        matches!(self, LiteralWs::Right | LiteralWs::Both)
    }
}

/// Rules and anonymous categories removed from the tree with their subtree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DropSet {
    pub whitespace: bool,
    pub strings: bool,
    pub regexps: bool,
    pub rules: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LexicalPolicy {
    /// Pattern for comments, which are skipped like whitespace. `None` never
    /// matches.
    pub comment: Option<String>,
    pub whitespace: WhitespaceMode,
    pub literalws: LiteralWs,
    pub ignorecase: bool,
    pub hide: BTreeSet<String>,
    pub drop: DropSet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DirectiveKind {
    Comment,
    Whitespace,
    LiteralWs,
    IgnoreCase,
    Hide,
    Drop,
}

const DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("comment", DirectiveKind::Comment),
    ("whitespace", DirectiveKind::Whitespace),
    ("literalws", DirectiveKind::LiteralWs),
    ("ignorecase", DirectiveKind::IgnoreCase),
    ("hide", DirectiveKind::Hide),
    ("drop", DirectiveKind::Drop),
];

/// Resolve directives in document order. A directive given twice replaces
/// the earlier value.
pub fn resolve(directives: &[Directive]) -> CompileResult<LexicalPolicy> {
    let mut policy = LexicalPolicy::default();
    let mut seen = BTreeSet::new();

    for directive in directives {
        let kind = DIRECTIVES
            .iter()
            .find(|(name, _)| *name == directive.name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| CompileError::UnknownDirective {
                name: directive.name.clone(),
                position: directive.position,
            })?;

        if !seen.insert(kind) {
            log::debug!("@{} given again, later value wins", directive.name);
        }

        kind.apply(directive, &mut policy)?;
    }

    log::debug!("resolved lexical policy: {:?}", policy);

    Ok(policy)
}

impl DirectiveKind {
    fn apply(self, directive: &Directive, policy: &mut LexicalPolicy) -> CompileResult<()> {
        let invalid = || CompileError::InvalidValue {
            name: directive.name.clone(),
            value: directive.value.to_string(),
            position: directive.position,
        };

        match self {
            DirectiveKind::Comment => {
                let pattern = match &directive.value {
                    DirectiveValue::Regex(r) => r.clone(),
                    DirectiveValue::Literal(s) => regex::escape(s),
                    DirectiveValue::List(_) => return Err(invalid()),
                };

                Regex::new(&pattern).map_err(|_| invalid())?;

                policy.comment = Some(pattern);
            }
            DirectiveKind::Whitespace => {
                policy.whitespace = match &directive.value {
                    DirectiveValue::Regex(r) => {
                        Regex::new(r).map_err(|_| invalid())?;
                        WhitespaceMode::Custom(r.clone())
                    }
                    value => match single_word(value).ok_or_else(invalid)? {
                        "none" => WhitespaceMode::None,
                        "horizontal" => WhitespaceMode::Horizontal,
                        "vertical" => WhitespaceMode::Vertical,
                        _ => return Err(invalid()),
                    },
                };
            }
            DirectiveKind::LiteralWs => {
                policy.literalws = match single_word(&directive.value).ok_or_else(invalid)? {
                    "none" => LiteralWs::None,
                    "left" => LiteralWs::Left,
                    "right" => LiteralWs::Right,
                    "both" => LiteralWs::Both,
                    _ => return Err(invalid()),
                };
            }
            DirectiveKind::IgnoreCase => {
                let word = single_word(&directive.value).ok_or_else(invalid)?;

                policy.ignorecase = if word.eq_ignore_ascii_case("true") {
                    true
                } else if word.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(invalid());
                };
            }
            DirectiveKind::Hide => {
                let DirectiveValue::List(names) = &directive.value else {
                    return Err(invalid());
                };

                policy.hide = names.iter().cloned().collect();
            }
            DirectiveKind::Drop => {
                let DirectiveValue::List(names) = &directive.value else {
                    return Err(invalid());
                };

                let mut drop = DropSet::default();

                for name in names {
                    match name.as_str() {
                        "whitespace" => drop.whitespace = true,
                        "strings" => drop.strings = true,
                        "regexps" => drop.regexps = true,
                        _ => {
                            drop.rules.insert(name.clone());
                        }
                    }
                }

                policy.drop = drop;
            }
        }

        Ok(())
    }
}

/// A keyword-like value: a one-element identifier list or a literal.
fn single_word(value: &DirectiveValue) -> Option<&str> {
    match value {
        DirectiveValue::List(list) if list.len() == 1 => Some(&list[0]),
        DirectiveValue::Literal(s) => Some(s.trim()),
        _ => None,
    }
}
