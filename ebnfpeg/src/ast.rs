use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Grammar {
    pub lookup: BTreeMap<String, usize>,
    pub rules: Vec<Rule>,
    pub directives: Vec<Directive>,
}

impl Grammar {
    /// The first rule in the source is the default start symbol.
    pub fn start(&self) -> Option<&Rule> {
        self.rules.first()
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.lookup.get(name).map(|no| &self.rules[*no])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub name: String,
    pub body: Expression,
    /// Byte offset of the rule head in the grammar source.
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub name: String,
    pub value: DirectiveValue,
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveValue {
    Literal(String),
    Regex(String),
    List(Vec<String>),
}

impl std::fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectiveValue::Literal(s) => write!(f, "\"{}\"", s),
            DirectiveValue::Regex(r) => write!(f, "/{}/", r),
            DirectiveValue::List(list) => write!(f, "{}", list.join(", ")),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Expression {
    Literal(String),
    Regex(String),
    Reference(String),
    Sequence(Vec<Expression>),
    Choice(Vec<Expression>),
    Repetition(Box<Expression>),
    Optional(Box<Expression>),
    Group(Box<Expression>),
    Lookahead(Box<Expression>, Polarity),
    Lookbehind(Box<Expression>, Polarity),
    /// `~`
    Whitespace,
}

impl Expression {
    /// Calls `f` on every rule name referenced below this expression.
    pub fn visit_references<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expression::Reference(name) => f(name),
            Expression::Sequence(list) | Expression::Choice(list) => {
                for expr in list {
                    expr.visit_references(f);
                }
            }
            Expression::Repetition(expr)
            | Expression::Optional(expr)
            | Expression::Group(expr)
            | Expression::Lookahead(expr, _)
            | Expression::Lookbehind(expr, _) => expr.visit_references(f),
            Expression::Literal(_) | Expression::Regex(_) | Expression::Whitespace => (),
        }
    }
}
