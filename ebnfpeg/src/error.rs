use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Everything that can go wrong while turning grammar text into a
/// [`CompiledGrammar`](crate::CompiledGrammar). No partial grammar is ever
/// returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("syntax error at offset {position}: expected {expected}")]
    Syntax { position: usize, expected: String },

    #[error("rule `{name}` defined twice (second definition at offset {position})")]
    DuplicateRule { name: String, position: usize },

    #[error("unknown directive `@{name}` at offset {position}")]
    UnknownDirective { name: String, position: usize },

    #[error("invalid value `{value}` for directive `@{name}` at offset {position}")]
    InvalidValue {
        name: String,
        value: String,
        position: usize,
    },

    #[error("rule `{rule}` refers to undefined rule `{name}`")]
    UndefinedRule { name: String, rule: String },

    #[error("directive `@{directive}` names `{name}`, which is not a rule")]
    DirectiveScope { directive: String, name: String },

    #[error("invalid regular expression /{pattern}/: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("grammar defines no rules")]
    EmptyGrammar,

    #[error("expression nested deeper than {limit} levels at offset {position}")]
    NestingTooDeep { position: usize, limit: usize },
}

impl CompileError {
    pub fn position(&self) -> Option<usize> {
        match self {
            CompileError::Syntax { position, .. }
            | CompileError::DuplicateRule { position, .. }
            | CompileError::UnknownDirective { position, .. }
            | CompileError::InvalidValue { position, .. }
            | CompileError::NestingTooDeep { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// The input did not match. `position` is the farthest offset any terminal
/// or assertion was tried at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {position}: expected {}", expected.join(" or "))]
pub struct ParseError {
    pub position: usize,
    /// Rules being matched when `position` was reached, outermost first.
    pub rule_stack: Vec<String>,
    pub expected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("maximum rule nesting depth {depth} exceeded at offset {position}")]
    DepthExceeded { depth: usize, position: usize },

    #[error("no rule named `{name}` to start from")]
    UnknownStartRule { name: String },
}

impl RunError {
    pub fn position(&self) -> Option<usize> {
        match self {
            RunError::Parse(err) => Some(err.position),
            RunError::DepthExceeded { position, .. } => Some(*position),
            RunError::UnknownStartRule { .. } => None,
        }
    }
}
