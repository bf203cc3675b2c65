#![cfg_attr(not(test), allow(dead_code, unused_imports))]

#[cfg(test)]
mod proptest;

use ebnfpeg::utils::escape_string;
use ebnfpeg::{compile, CompiledGrammar, ParseNode};

pub const ARITHMETIC: &str = include_str!("arithmetic.ebnf");
pub const EBNF: &str = include_str!("ebnf.ebnf");

pub fn print_to_string(node: &ParseNode, input: &str) -> String {
    let children = if node.children.is_empty() {
        String::new()
    } else {
        format!(
            ", {}",
            node.children
                .iter()
                .map(|node| print_to_string(node, input))
                .collect::<Vec<String>>()
                .join(", ")
        )
    };

    format!(
        "({}, \"{}\"{})",
        node.name(),
        escape_string(node.as_str(input)),
        children
    )
}

fn parser(grammar: &str) -> CompiledGrammar {
    compile(grammar).unwrap()
}
