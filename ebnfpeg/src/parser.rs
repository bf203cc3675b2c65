//! The bootstrap parser for grammar source text.
//!
//! This is the EBNF-of-EBNF written out by hand, since the compiler cannot
//! be used to parse the notation it is itself described in. Its lexical
//! policy is fixed: `#` comments run to the end of the line, whitespace may
//! span lines, and every token swallows the whitespace that follows it.

use super::ast::{self, Directive, DirectiveValue, Expression, Polarity};
use super::error::{CompileError, CompileResult};
use std::collections::BTreeMap;
use unicode_xid::UnicodeXID;

pub fn parse_grammar(src: &str) -> CompileResult<ast::Grammar> {
    let mut parser = MetaParser::new(src);

    let mut grammar = ast::Grammar {
        lookup: BTreeMap::new(),
        rules: Vec::new(),
        directives: Vec::new(),
    };

    parser.skip();

    while !parser.at_end() {
        let position = parser.pos;

        if parser.eat("@") {
            let directive = parser.directive(position)?;
            grammar.directives.push(directive);
        } else if let Some(name) = parser.eat_identifier() {
            parser.expect("=")?;

            let body = parser.expression()?;

            if grammar.lookup.contains_key(name) {
                return Err(CompileError::DuplicateRule {
                    name: name.to_owned(),
                    position,
                });
            }

            grammar.lookup.insert(name.to_owned(), grammar.rules.len());

            grammar.rules.push(ast::Rule {
                name: name.to_owned(),
                body,
                position,
            });
        } else {
            return Err(parser.error("directive or rule definition"));
        }
    }

    log::debug!(
        "parsed grammar with {} rules and {} directives",
        grammar.rules.len(),
        grammar.directives.len()
    );

    Ok(grammar)
}

/// Limit on nested brackets and lookaround operators in a rule body.
pub const MAX_NESTING: usize = 128;

#[derive(Clone, Copy)]
struct MetaParser<'s> {
    src: &'s str,
    pos: usize,
    depth: usize,
}

enum Lookaround {
    Ahead(Polarity),
    Behind(Polarity),
}

impl<'s> MetaParser<'s> {
    fn new(src: &'s str) -> Self {
        MetaParser { src, pos: 0, depth: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos == self.src.len()
    }

    fn error(&self, expected: &str) -> CompileError {
        CompileError::Syntax {
            position: self.pos,
            expected: expected.to_owned(),
        }
    }

    /// Run `f` one nesting level deeper, failing once the grammar text
    /// nests more than [`MAX_NESTING`] levels.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CompileResult<T>) -> CompileResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::NestingTooDeep {
                position: self.pos,
                limit: MAX_NESTING,
            });
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;

        res
    }

    /// Skip whitespace and `#` comments, line feeds included.
    fn skip(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();

            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with('#') {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            self.skip();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> CompileResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("`{}`", token)))
        }
    }

    fn eat_identifier(&mut self) -> Option<&'s str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();

        match chars.next() {
            Some((_, ch)) if UnicodeXID::is_xid_start(ch) || ch == '_' => (),
            _ => return None,
        }

        let len = chars
            .find(|(_, ch)| !UnicodeXID::is_xid_continue(*ch))
            .map(|(off, _)| off)
            .unwrap_or(rest.len());

        self.pos += len;
        self.skip();

        Some(&rest[..len])
    }

    /// An identifier followed by `=` starts the next rule, so it must not be
    /// read as a reference.
    fn at_rule_head(&self) -> bool {
        let mut probe = *self;

        probe.eat_identifier().is_some() && probe.rest().starts_with('=')
    }

    fn directive(&mut self, position: usize) -> CompileResult<Directive> {
        let name = match self.eat_identifier() {
            Some(name) => name.to_owned(),
            None => return Err(self.error("directive name")),
        };

        self.expect("=")?;

        let value = if let Some(literal) = self.literal()? {
            DirectiveValue::Literal(literal)
        } else if let Some(regex) = self.regex()? {
            DirectiveValue::Regex(regex)
        } else {
            let mut list = Vec::new();

            loop {
                match self.eat_identifier() {
                    Some(id) => list.push(id.to_owned()),
                    None => return Err(self.error("literal, regex or identifier list")),
                }

                if !self.eat(",") {
                    break;
                }
            }

            DirectiveValue::List(list)
        };

        Ok(Directive {
            name,
            value,
            position,
        })
    }

    fn expression(&mut self) -> CompileResult<Expression> {
        let mut alts = vec![self.term()?];

        while self.eat("|") {
            alts.push(self.term()?);
        }

        Ok(if alts.len() == 1 {
            alts.swap_remove(0)
        } else {
            Expression::Choice(alts)
        })
    }

    fn term(&mut self) -> CompileResult<Expression> {
        let mut list = Vec::new();

        while let Some(mut items) = self.factor()? {
            list.append(&mut items);
        }

        match list.len() {
            0 => Err(self.error("expression")),
            1 => Ok(list.swap_remove(0)),
            _ => Ok(Expression::Sequence(list)),
        }
    }

    /// `{ "~" } atom { "~" } [ lookaround factor ]`. The items are returned
    /// flat so that the enclosing term does not nest sequences.
    fn factor(&mut self) -> CompileResult<Option<Vec<Expression>>> {
        let mut items = Vec::new();

        while self.eat("~") {
            items.push(Expression::Whitespace);
        }

        if let Some(op) = self.lookaround() {
            items.push(self.nested(|p| p.assertion(op))?);
            return Ok(Some(items));
        }

        match self.atom()? {
            Some(atom) => items.push(atom),
            None if items.is_empty() => return Ok(None),
            None => return Ok(Some(items)),
        }

        while self.eat("~") {
            items.push(Expression::Whitespace);
        }

        if let Some(op) = self.lookaround() {
            items.push(self.nested(|p| p.assertion(op))?);
        }

        Ok(Some(items))
    }

    fn lookaround(&mut self) -> Option<Lookaround> {
        if self.eat("<-&") {
            Some(Lookaround::Behind(Polarity::Positive))
        } else if self.eat("<-!") {
            Some(Lookaround::Behind(Polarity::Negative))
        } else if self.eat("&") {
            Some(Lookaround::Ahead(Polarity::Positive))
        } else if self.eat("!") {
            Some(Lookaround::Ahead(Polarity::Negative))
        } else {
            None
        }
    }

    /// The operand of a lookaround operator is the factor that follows it.
    fn assertion(&mut self, op: Lookaround) -> CompileResult<Expression> {
        let mut items = match self.factor()? {
            Some(items) => items,
            None => return Err(self.error("factor after lookaround operator")),
        };

        let operand = Box::new(if items.len() == 1 {
            items.swap_remove(0)
        } else {
            Expression::Sequence(items)
        });

        Ok(match op {
            Lookaround::Ahead(polarity) => Expression::Lookahead(operand, polarity),
            Lookaround::Behind(polarity) => Expression::Lookbehind(operand, polarity),
        })
    }

    fn atom(&mut self) -> CompileResult<Option<Expression>> {
        if let Some(literal) = self.literal()? {
            return Ok(Some(Expression::Literal(literal)));
        }

        if let Some(regex) = self.regex()? {
            return Ok(Some(Expression::Regex(regex)));
        }

        for (open, close) in [("(", ")"), ("[", "]"), ("{", "}")] {
            if self.eat(open) {
                let inner = Box::new(self.nested(|p| p.expression())?);

                self.expect(close)?;

                return Ok(Some(match open {
                    "(" => Expression::Group(inner),
                    "[" => Expression::Optional(inner),
                    _ => Expression::Repetition(inner),
                }));
            }
        }

        if !self.at_rule_head() {
            if let Some(name) = self.eat_identifier() {
                return Ok(Some(Expression::Reference(name.to_owned())));
            }
        }

        Ok(None)
    }

    fn literal(&mut self) -> CompileResult<Option<String>> {
        let quote = match self.rest().chars().next() {
            Some(ch @ ('"' | '\'')) => ch,
            _ => return Ok(None),
        };

        match self.rest()[1..].find(quote) {
            Some(len) => {
                let literal = unquote(&self.rest()[1..len + 1]);

                self.pos += len + 2;
                self.skip();

                Ok(Some(literal))
            }
            None => Err(self.error("closing quote")),
        }
    }

    /// `/.../` with backslash escapes kept as written; the pattern goes to
    /// the regex engine verbatim.
    fn regex(&mut self) -> CompileResult<Option<String>> {
        if !self.rest().starts_with('/') {
            return Ok(None);
        }

        let body = &self.rest()[1..];
        let mut chars = body.char_indices();

        while let Some((off, ch)) = chars.next() {
            match ch {
                '\\' => {
                    chars.next();
                }
                '/' => {
                    let pattern = body[..off].to_owned();

                    self.pos += off + 2;
                    self.skip();

                    return Ok(Some(pattern));
                }
                _ => (),
            }
        }

        Err(self.error("closing `/`"))
    }
}

fn unquote(src: &str) -> String {
    let mut res = String::new();
    let mut chars = src.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('t') => res.push('\t'),
                Some('n') => res.push('\n'),
                Some('r') => res.push('\r'),
                Some('\\') => res.push('\\'),
                Some(ch) => {
                    res.push('\\');
                    res.push(ch);
                }
                None => res.push('\\'),
            }
        } else {
            res.push(ch);
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str, rule: &str) -> Expression {
        parse_grammar(src).unwrap().rule(rule).unwrap().body.clone()
    }

    fn reference(name: &str) -> Expression {
        Expression::Reference(name.to_owned())
    }

    #[test]
    fn rule_heads_end_the_previous_rule() {
        let grammar = parse_grammar("a = b c\nb = \"x\"\nc = /y/~").unwrap();

        assert_eq!(grammar.rules.len(), 3);
        assert_eq!(grammar.start().unwrap().name, "a");
        assert_eq!(
            grammar.rules[0].body,
            Expression::Sequence(vec![reference("b"), reference("c")])
        );
        assert_eq!(
            grammar.rules[2].body,
            Expression::Sequence(vec![
                Expression::Regex(String::from("y")),
                Expression::Whitespace
            ])
        );
    }

    #[test]
    fn lookaround_binds_to_following_factor() {
        assert_eq!(
            body("x = factor &term", "x"),
            Expression::Sequence(vec![
                reference("factor"),
                Expression::Lookahead(Box::new(reference("term")), Polarity::Positive)
            ])
        );

        assert_eq!(
            body("x = ID ! \"=\"", "x"),
            Expression::Sequence(vec![
                reference("ID"),
                Expression::Lookahead(
                    Box::new(Expression::Literal(String::from("="))),
                    Polarity::Negative
                )
            ])
        );

        assert_eq!(
            body("x = a <-! \"q\" b <-& c", "x"),
            Expression::Sequence(vec![
                reference("a"),
                Expression::Lookbehind(
                    Box::new(Expression::Literal(String::from("q"))),
                    Polarity::Negative
                ),
                reference("b"),
                Expression::Lookbehind(Box::new(reference("c")), Polarity::Positive),
            ])
        );
    }

    #[test]
    fn choice_groups_and_repetition() {
        assert_eq!(
            body("e = t { (PLUS | MINUS) t } [x]", "e"),
            Expression::Sequence(vec![
                reference("t"),
                Expression::Repetition(Box::new(Expression::Sequence(vec![
                    Expression::Group(Box::new(Expression::Choice(vec![
                        reference("PLUS"),
                        reference("MINUS")
                    ]))),
                    reference("t"),
                ]))),
                Expression::Optional(Box::new(reference("x"))),
            ])
        );
    }

    #[test]
    fn directives_and_comments() {
        let grammar = parse_grammar(
            r#"
            # leading comment
            @comment = /#.*/     # trailing comment
            @drop    = whitespace, strings
            @ignorecase = "True"
            start = 'a\n'
            "#,
        )
        .unwrap();

        assert_eq!(
            grammar.directives.iter().map(|d| &d.value).collect::<Vec<_>>(),
            vec![
                &DirectiveValue::Regex(String::from("#.*")),
                &DirectiveValue::List(vec![String::from("whitespace"), String::from("strings")]),
                &DirectiveValue::Literal(String::from("True")),
            ]
        );
        assert_eq!(grammar.rules[0].body, Expression::Literal(String::from("a\n")));
    }

    #[test]
    fn regex_escapes_are_kept() {
        assert_eq!(
            body(r"r = /\/(?:[^\/\\]|\\.)*\//~", "r"),
            Expression::Sequence(vec![
                Expression::Regex(String::from(r"\/(?:[^\/\\]|\\.)*\/")),
                Expression::Whitespace
            ])
        );
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse_grammar("a = \"x\"\na = \"y\""),
            Err(CompileError::DuplicateRule {
                name: String::from("a"),
                position: 8
            })
        );
        assert_eq!(
            parse_grammar("a = ( b"),
            Err(CompileError::Syntax {
                position: 7,
                expected: String::from("`)`")
            })
        );
        assert_eq!(
            parse_grammar("a = "),
            Err(CompileError::Syntax {
                position: 4,
                expected: String::from("expression")
            })
        );
        assert!(matches!(
            parse_grammar("a = \"open"),
            Err(CompileError::Syntax { position: 4, .. })
        ));
        assert!(matches!(
            parse_grammar("a = b &"),
            Err(CompileError::Syntax { position: 7, .. })
        ));
    }

    #[test]
    fn nesting_limit() {
        let ok = format!("a = {}\"x\"{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));

        assert!(parse_grammar(&ok).is_ok());

        let deep = format!("a = {}\"x\"{}", "([{".repeat(40_000), "}])".repeat(40_000));

        assert_eq!(
            parse_grammar(&deep),
            Err(CompileError::NestingTooDeep {
                position: 4 + MAX_NESTING + 1,
                limit: MAX_NESTING
            })
        );

        let deep = format!("a = {}b", "!".repeat(100_000));

        assert_eq!(
            parse_grammar(&deep),
            Err(CompileError::NestingTooDeep {
                position: 4 + MAX_NESTING + 1,
                limit: MAX_NESTING
            })
        );
    }
}
