use std::fmt;
use std::ops::Range;
use std::sync::Arc;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Tag {
    Rule(Arc<str>),
    /// A string literal.
    Text,
    /// A regex token.
    RegExp,
    /// Implicit whitespace or comments.
    Whitespace,
    /// A sequence nested inside a rule body, e.g. one repetition round.
    Series,
}

impl Tag {
    pub fn name(&self) -> &str {
        match self {
            Tag::Rule(name) => name,
            Tag::Text => ":Text",
            Tag::RegExp => ":RegExp",
            Tag::Whitespace => ":Whitespace",
            Tag::Series => ":Series",
        }
    }

    pub fn is_anonymous(&self) -> bool {
        !matches!(self, Tag::Rule(_))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the parse tree. Spans are byte offsets into the input; the
/// tree does not own the input text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseNode {
    pub tag: Tag,
    pub start: usize,
    pub end: usize,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub(crate) fn new(tag: Tag, start: usize, end: usize) -> Self {
        Self {
            tag,
            start,
            end,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.tag.name()
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn as_str<'s>(&self, input: &'s str) -> &'s str {
        &input[self.start..self.end]
    }

    /// All outermost nodes tagged `name` in this subtree, in document order.
    /// Matching nodes are not searched further.
    pub fn collect_rules(&self, name: &str) -> Vec<&ParseNode> {
        let mut list = Vec::new();

        fn recurse<'t>(node: &'t ParseNode, name: &str, list: &mut Vec<&'t ParseNode>) {
            if node.name() == name {
                list.push(node);
            } else {
                for node in &node.children {
                    recurse(node, name, list);
                }
            }
        }

        recurse(self, name, &mut list);

        list
    }
}
