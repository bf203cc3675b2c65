//! Runs a [`CompiledGrammar`] over input text.
//!
//! Matchers receive a position and either fail or return the new position
//! together with the tree fragments they produced. All mutable state, the
//! packrat memo included, lives in a [`State`] created per run.

use std::collections::HashMap;

use regex::Regex;

use super::ast::Polarity;
use super::compiler::{CompiledGrammar, Matcher};
use super::error::{ParseError, RunError};
use super::tree::{ParseNode, Tag};
use super::utils::prev_char_boundary;

/// Parse `input` with `compiled`, starting from `start` or the grammar's
/// first rule. Succeeds only if the whole input is consumed.
pub fn run(compiled: &CompiledGrammar, input: &str, start: Option<&str>) -> Result<ParseNode, RunError> {
    let start = match start {
        Some(name) => compiled
            .rule_index(name)
            .ok_or_else(|| RunError::UnknownStartRule {
                name: name.to_owned(),
            })?,
        None => compiled.start,
    };

    let mut state = State::new(compiled, input);

    match state.root(start)? {
        Some(node) => Ok(node),
        None => Err(state.error().into()),
    }
}

#[derive(Clone, Debug)]
struct Matched {
    end: usize,
    nodes: Vec<ParseNode>,
}

impl Matched {
    fn empty(pos: usize) -> Self {
        Matched {
            end: pos,
            nodes: Vec::new(),
        }
    }
}

type Step = Result<Option<Matched>, RunError>;

enum Expected<'g> {
    Matcher(&'g Matcher),
    EndOfInput,
}

struct State<'g, 'i> {
    grammar: &'g CompiledGrammar,
    input: &'i str,
    /// (rule, position, inside lookaround) -> result. Failures are cached too.
    memo: HashMap<(usize, usize, bool), Option<Matched>>,
    /// Rules being matched, for error reports.
    stack: Vec<usize>,
    /// Nesting of `eval` calls, bounded by `ParserConfig::max_depth`.
    depth: usize,
    /// Nesting of lookaround assertions; failures inside them are not
    /// reported.
    quiet: usize,
    farthest: usize,
    farthest_stack: Vec<usize>,
    expected: Vec<Expected<'g>>,
}

impl<'g, 'i> State<'g, 'i> {
    fn new(grammar: &'g CompiledGrammar, input: &'i str) -> Self {
        State {
            grammar,
            input,
            memo: HashMap::new(),
            stack: Vec::new(),
            depth: 0,
            quiet: 0,
            farthest: 0,
            farthest_stack: Vec::new(),
            expected: Vec::new(),
        }
    }

    /// The start rule always produces the root node, whatever `@hide` or
    /// `@drop` say about it. Trailing implicit whitespace belongs to it.
    fn root(&mut self, rule_no: usize) -> Result<Option<ParseNode>, RunError> {
        let Some(mut matched) = self.rule_body(rule_no, 0)? else {
            return Ok(None);
        };

        let end = self.grammar.skipper.skip(self.input, matched.end);
        let mut trailing = self.whitespace(matched.end, end);
        matched.nodes.append(&mut trailing);

        if end != self.input.len() {
            self.fail(end, Expected::EndOfInput);
            return Ok(None);
        }

        let name = self.grammar.rules[rule_no].name.clone();

        Ok(Some(rule_node(Tag::Rule(name), 0, end, matched.nodes)))
    }

    fn rule(&mut self, rule_no: usize, pos: usize) -> Step {
        let key = (rule_no, pos, self.quiet > 0);

        if self.grammar.config.memoize {
            if let Some(res) = self.memo.get(&key) {
                return Ok(res.clone());
            }
        }

        let grammar = self.grammar;
        let rule = &grammar.rules[rule_no];

        let res = self.rule_body(rule_no, pos)?.map(|matched| {
            if rule.dropped {
                Matched::empty(matched.end)
            } else if rule.hidden {
                matched
            } else {
                Matched {
                    end: matched.end,
                    nodes: vec![rule_node(
                        Tag::Rule(rule.name.clone()),
                        pos,
                        matched.end,
                        matched.nodes,
                    )],
                }
            }
        });

        match &res {
            Some(matched) => log::trace!("{} matched {}..{}", rule.name, pos, matched.end),
            None => log::trace!("{} failed at {}", rule.name, pos),
        }

        // Note that failure to match is also cached using None
        if self.grammar.config.memoize {
            self.memo.insert(key, res.clone());
        }

        Ok(res)
    }

    fn rule_body(&mut self, rule_no: usize, pos: usize) -> Step {
        let grammar = self.grammar;

        self.stack.push(rule_no);
        let res = self.eval(&grammar.rules[rule_no].matcher, pos)?;
        self.stack.pop();

        Ok(res)
    }

    /// Every nested matcher costs native stack, rule references included,
    /// so the depth limit is checked here rather than per rule.
    fn eval(&mut self, matcher: &'g Matcher, pos: usize) -> Step {
        let max_depth = self.grammar.config.max_depth;

        if self.depth >= max_depth {
            return Err(RunError::DepthExceeded {
                depth: max_depth,
                position: pos,
            });
        }

        self.depth += 1;

        let res = match matcher {
            Matcher::Literal(text) => Ok(self.literal(matcher, text, pos)),
            Matcher::Regex { regex, .. } => Ok(self.regex(matcher, regex, pos)),
            Matcher::Rule(rule_no) => self.rule(*rule_no, pos),
            Matcher::Sequence { items, series } => self.sequence(items, *series, pos),
            Matcher::Choice(alts) => self.choice(alts, pos),
            Matcher::Repetition(inner) => self.repetition(inner, pos),
            Matcher::Optional(inner) => self
                .eval(inner, pos)
                .map(|res| Some(res.unwrap_or_else(|| Matched::empty(pos)))),
            Matcher::Lookahead(inner, polarity) => self.lookahead(matcher, inner, *polarity, pos),
            Matcher::Lookbehind(inner, polarity) => self.lookbehind(matcher, inner, *polarity, pos),
            Matcher::Whitespace => {
                let end = self.grammar.skipper.skip(self.input, pos);

                Ok(Some(Matched {
                    end,
                    nodes: self.whitespace(pos, end),
                }))
            }
        };

        self.depth -= 1;

        res
    }

    fn literal(&mut self, matcher: &'g Matcher, text: &str, pos: usize) -> Option<Matched> {
        let input = self.input;
        let literalws = self.grammar.policy.literalws;

        let start = if literalws.left() {
            self.grammar.skipper.skip(input, pos)
        } else {
            pos
        };

        let Some(end) = match_literal(input, start, text, self.grammar.policy.ignorecase) else {
            self.fail(start, Expected::Matcher(matcher));
            return None;
        };

        let after = if literalws.right() {
            self.grammar.skipper.skip(input, end)
        } else {
            end
        };

        let mut nodes = self.whitespace(pos, start);

        if !self.grammar.policy.drop.strings {
            nodes.push(ParseNode::new(Tag::Text, start, end));
        }

        nodes.append(&mut self.whitespace(end, after));

        Some(Matched { end: after, nodes })
    }

    fn regex(&mut self, matcher: &'g Matcher, regex: &Regex, pos: usize) -> Option<Matched> {
        match regex.find(&self.input[pos..]) {
            Some(m) => {
                let end = pos + m.end();
                let mut res = Matched::empty(end);

                if !self.grammar.policy.drop.regexps {
                    res.nodes.push(ParseNode::new(Tag::RegExp, pos, end));
                }

                Some(res)
            }
            None => {
                self.fail(pos, Expected::Matcher(matcher));
                None
            }
        }
    }

    fn sequence(&mut self, items: &'g [Matcher], series: bool, pos: usize) -> Step {
        let mut list = Vec::new();
        let mut end = pos;

        for item in items {
            match self.eval(item, end)? {
                Some(mut matched) => {
                    end = matched.end;
                    list.append(&mut matched.nodes);
                }
                None => return Ok(None),
            }
        }

        if series && list.len() > 1 {
            let mut node = ParseNode::new(Tag::Series, pos, end);
            node.children = list;
            list = vec![node];
        }

        Ok(Some(Matched { end, nodes: list }))
    }

    fn choice(&mut self, alts: &'g [Matcher], pos: usize) -> Step {
        for alt in alts {
            if let Some(matched) = self.eval(alt, pos)? {
                return Ok(Some(matched));
            }
        }

        Ok(None)
    }

    fn repetition(&mut self, inner: &'g Matcher, pos: usize) -> Step {
        let mut res = Matched::empty(pos);

        while let Some(mut matched) = self.eval(inner, res.end)? {
            if matched.end == res.end {
                // must be making progress
                break;
            }
            res.end = matched.end;
            res.nodes.append(&mut matched.nodes);
        }

        Ok(Some(res))
    }

    fn lookahead(
        &mut self,
        matcher: &'g Matcher,
        inner: &'g Matcher,
        polarity: Polarity,
        pos: usize,
    ) -> Step {
        self.quiet += 1;
        let found = self.eval(inner, pos)?.is_some();
        self.quiet -= 1;

        Ok(self.assert(matcher, pos, found, polarity))
    }

    fn lookbehind(
        &mut self,
        matcher: &'g Matcher,
        inner: &'g Matcher,
        polarity: Polarity,
        pos: usize,
    ) -> Step {
        self.quiet += 1;

        let mut found = false;
        let mut start = pos;

        // nearest start first; the inner match has to end exactly here
        loop {
            if let Some(matched) = self.eval(inner, start)? {
                if matched.end == pos {
                    found = true;
                    break;
                }
            }

            if start == 0 {
                break;
            }

            start = prev_char_boundary(self.input, start);
        }

        self.quiet -= 1;

        Ok(self.assert(matcher, pos, found, polarity))
    }

    /// Lookaround outcome: never consumes input, never produces nodes.
    fn assert(&mut self, matcher: &'g Matcher, pos: usize, found: bool, polarity: Polarity) -> Option<Matched> {
        if found == (polarity == Polarity::Positive) {
            Some(Matched::empty(pos))
        } else {
            self.fail(pos, Expected::Matcher(matcher));
            None
        }
    }

    fn whitespace(&self, start: usize, end: usize) -> Vec<ParseNode> {
        if end > start && !self.grammar.policy.drop.whitespace {
            vec![ParseNode::new(Tag::Whitespace, start, end)]
        } else {
            Vec::new()
        }
    }

    fn fail(&mut self, pos: usize, expected: Expected<'g>) {
        if self.quiet > 0 {
            return;
        }

        if pos > self.farthest || self.expected.is_empty() {
            self.farthest = pos;
            self.farthest_stack = self.stack.clone();
            self.expected.clear();
        }

        if pos == self.farthest {
            self.expected.push(expected);
        }
    }

    fn error(&self) -> ParseError {
        let mut expected: Vec<String> = self
            .expected
            .iter()
            .map(|expected| match expected {
                Expected::Matcher(matcher) => matcher.describe(self.grammar),
                Expected::EndOfInput => String::from("end of input"),
            })
            .collect();

        expected.sort();
        expected.dedup();

        ParseError {
            position: self.farthest,
            rule_stack: self
                .farthest_stack
                .iter()
                .map(|no| self.grammar.rules[*no].name.to_string())
                .collect(),
            expected,
        }
    }
}

/// A rule node whose children are all anonymous tokens is reduced to a leaf.
fn rule_node(tag: Tag, start: usize, end: usize, children: Vec<ParseNode>) -> ParseNode {
    let mut node = ParseNode::new(tag, start, end);

    if !children
        .iter()
        .all(|child| child.tag.is_anonymous() && child.is_leaf())
    {
        node.children = children;
    }

    node
}

fn match_literal(input: &str, pos: usize, literal: &str, ignorecase: bool) -> Option<usize> {
    let rest = &input[pos..];

    if !ignorecase {
        return rest.starts_with(literal).then(|| pos + literal.len());
    }

    let mut chars = rest.char_indices();
    let mut len = 0;

    for expected in literal.chars() {
        let (off, ch) = chars.next()?;

        if !expected.to_lowercase().eq(ch.to_lowercase()) {
            return None;
        }

        len = off + ch.len_utf8();
    }

    Some(pos + len)
}
