use std::collections::BTreeMap;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use super::ast::{self, Expression, Polarity};
use super::check;
use super::config::ParserConfig;
use super::directives::LexicalPolicy;
use super::engine;
use super::error::{CompileError, CompileResult, RunError};
use super::tree::ParseNode;
use super::utils::escape_string;

/// A grammar ready to parse input. It holds no per-parse state, so one
/// instance can serve any number of parses, concurrently if need be.
#[derive(Debug)]
pub struct CompiledGrammar {
    pub(crate) rules: Vec<CompiledRule>,
    lookup: BTreeMap<String, usize>,
    pub(crate) start: usize,
    pub(crate) policy: LexicalPolicy,
    pub(crate) config: ParserConfig,
    pub(crate) skipper: Skipper,
}

#[derive(Debug)]
pub(crate) struct CompiledRule {
    pub name: Arc<str>,
    pub matcher: Matcher,
    pub hidden: bool,
    pub dropped: bool,
}

/// Compiled form of an [`Expression`]. Rule references are indices into
/// [`CompiledGrammar::rules`], so recursive rules close over the table
/// instead of each other.
#[derive(Debug)]
pub(crate) enum Matcher {
    Literal(String),
    Regex { regex: Regex, pattern: String },
    Rule(usize),
    /// `series` is false for sequences at the top of a rule body, whose
    /// children go straight into the rule node.
    Sequence { items: Vec<Matcher>, series: bool },
    Choice(Vec<Matcher>),
    Repetition(Box<Matcher>),
    Optional(Box<Matcher>),
    Lookahead(Box<Matcher>, Polarity),
    Lookbehind(Box<Matcher>, Polarity),
    Whitespace,
}

impl Matcher {
    pub(crate) fn describe(&self, grammar: &CompiledGrammar) -> String {
        let join = |list: &[Matcher], sep: &str| {
            list.iter()
                .map(|m| m.describe(grammar))
                .collect::<Vec<String>>()
                .join(sep)
        };

        match self {
            Matcher::Literal(s) => format!("\"{}\"", escape_string(s)),
            Matcher::Regex { pattern, .. } => format!("/{}/", pattern),
            Matcher::Rule(no) => grammar.rules[*no].name.to_string(),
            Matcher::Sequence { items, .. } => join(items, " "),
            Matcher::Choice(alts) => format!("({})", join(alts, " | ")),
            Matcher::Repetition(inner) => format!("{{ {} }}", inner.describe(grammar)),
            Matcher::Optional(inner) => format!("[ {} ]", inner.describe(grammar)),
            Matcher::Lookahead(inner, Polarity::Positive) => format!("&{}", inner.describe(grammar)),
            Matcher::Lookahead(inner, Polarity::Negative) => format!("!{}", inner.describe(grammar)),
            Matcher::Lookbehind(inner, Polarity::Positive) => {
                format!("<-&{}", inner.describe(grammar))
            }
            Matcher::Lookbehind(inner, Polarity::Negative) => {
                format!("<-!{}", inner.describe(grammar))
            }
            Matcher::Whitespace => String::from("~"),
        }
    }
}

/// Implicit whitespace: any mix of the whitespace pattern and comments.
#[derive(Debug)]
pub(crate) struct Skipper {
    whitespace: Option<Regex>,
    comment: Option<Regex>,
}

impl Skipper {
    fn new(policy: &LexicalPolicy) -> CompileResult<Self> {
        Ok(Skipper {
            whitespace: policy
                .whitespace
                .pattern()
                .map(|p| anchored(p, false))
                .transpose()?,
            comment: policy
                .comment
                .as_deref()
                .map(|p| anchored(p, false))
                .transpose()?,
        })
    }

    pub(crate) fn skip(&self, input: &str, pos: usize) -> usize {
        let mut pos = pos;

        loop {
            let mut next = pos;

            for regex in [&self.whitespace, &self.comment].into_iter().flatten() {
                if let Some(m) = regex.find(&input[next..]) {
                    next += m.end();
                }
            }

            if next == pos {
                return pos;
            }

            pos = next;
        }
    }
}

fn anchored(pattern: &str, ignorecase: bool) -> CompileResult<Regex> {
    RegexBuilder::new(&format!("^(?:{})", pattern))
        .case_insensitive(ignorecase)
        .build()
        .map_err(|err| CompileError::InvalidRegex {
            pattern: pattern.to_owned(),
            message: err.to_string(),
        })
}

pub fn compile(grammar: &ast::Grammar, policy: &LexicalPolicy) -> CompileResult<CompiledGrammar> {
    compile_with_config(grammar, policy, ParserConfig::default())
}

pub fn compile_with_config(
    grammar: &ast::Grammar,
    policy: &LexicalPolicy,
    config: ParserConfig,
) -> CompileResult<CompiledGrammar> {
    if grammar.rules.is_empty() {
        return Err(CompileError::EmptyGrammar);
    }

    check::check_grammar(grammar, policy)?;

    // grammar.lookup already gives every rule its slot, so bodies can refer
    // to rules defined later or to themselves
    let mut rules = Vec::with_capacity(grammar.rules.len());

    for rule in &grammar.rules {
        let compiler = Compiler { grammar, policy };

        rules.push(CompiledRule {
            name: Arc::from(rule.name.as_str()),
            matcher: compiler.compile_expr(&rule.body, true)?,
            hidden: policy.hide.contains(&rule.name),
            dropped: policy.drop.rules.contains(&rule.name),
        });
    }

    let compiled = CompiledGrammar {
        rules,
        lookup: grammar.lookup.clone(),
        start: 0,
        policy: policy.clone(),
        config,
        skipper: Skipper::new(policy)?,
    };

    log::debug!(
        "compiled {} rules, start rule `{}`",
        compiled.rules.len(),
        compiled.start_rule()
    );

    Ok(compiled)
}

struct Compiler<'a> {
    grammar: &'a ast::Grammar,
    policy: &'a LexicalPolicy,
}

impl Compiler<'_> {
    /// `top` holds while only choices and groups separate `expr` from the
    /// rule head.
    fn compile_expr(&self, expr: &Expression, top: bool) -> CompileResult<Matcher> {
        Ok(match expr {
            Expression::Literal(s) => Matcher::Literal(s.clone()),
            Expression::Regex(pattern) => Matcher::Regex {
                regex: anchored(pattern, self.policy.ignorecase)?,
                pattern: pattern.clone(),
            },
            // check_grammar has already rejected undefined references
            Expression::Reference(name) => Matcher::Rule(self.grammar.lookup[name]),
            Expression::Sequence(list) => Matcher::Sequence {
                items: self.compile_list(list, false)?,
                series: !top,
            },
            Expression::Choice(list) => Matcher::Choice(self.compile_list(list, top)?),
            Expression::Group(inner) => self.compile_expr(inner, top)?,
            Expression::Repetition(inner) => {
                Matcher::Repetition(Box::new(self.compile_expr(inner, false)?))
            }
            Expression::Optional(inner) => {
                Matcher::Optional(Box::new(self.compile_expr(inner, false)?))
            }
            Expression::Lookahead(inner, polarity) => {
                Matcher::Lookahead(Box::new(self.compile_expr(inner, false)?), *polarity)
            }
            Expression::Lookbehind(inner, polarity) => {
                Matcher::Lookbehind(Box::new(self.compile_expr(inner, false)?), *polarity)
            }
            Expression::Whitespace => Matcher::Whitespace,
        })
    }

    fn compile_list(&self, list: &[Expression], top: bool) -> CompileResult<Vec<Matcher>> {
        list.iter().map(|expr| self.compile_expr(expr, top)).collect()
    }
}

impl CompiledGrammar {
    /// Parse `input` from the start rule. The whole input must match.
    pub fn parse(&self, input: &str) -> Result<ParseNode, RunError> {
        engine::run(self, input, None)
    }

    /// Parse `input` starting from the rule `start` instead.
    pub fn parse_from(&self, input: &str, start: &str) -> Result<ParseNode, RunError> {
        engine::run(self, input, Some(start))
    }

    pub fn start_rule(&self) -> &str {
        &self.rules[self.start].name
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| &*rule.name)
    }

    pub fn policy(&self) -> &LexicalPolicy {
        &self.policy
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub(crate) fn rule_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }
}
