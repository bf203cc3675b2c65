use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use ebnfpeg::utils::line_col;
use ebnfpeg::{ParseNode, RunError, Tag};

const GRAMMAR: &str = include_str!("arithmetic.ebnf");

fn main() -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_owned());
    let level = log::LevelFilter::from_str(&level).context("invalid RUST_LOG level")?;

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )?;

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage {} EXPRESSION [NAME=VALUE]...", &args[0]);
        std::process::exit(2);
    }

    let input = &args[1];

    let mut vars = HashMap::new();

    for binding in &args[2..] {
        let (name, value) = binding
            .split_once('=')
            .ok_or_else(|| anyhow!("binding `{}` is not of the form NAME=VALUE", binding))?;
        let value: f64 = value
            .parse()
            .with_context(|| format!("value of `{}` is not a number", name))?;

        vars.insert(name.to_owned(), value);
    }

    let parser = ebnfpeg::compile(GRAMMAR).context("arithmetic grammar does not compile")?;

    println!("parsing: {}", input);

    let tree = match parser.parse(input) {
        Ok(tree) => tree,
        Err(RunError::Parse(err)) => {
            let (line, col) = line_col(input, err.position);
            bail!("{}:{}: {}", line + 1, col + 1, err);
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", sexpr(&tree, input));

    let eval = Eval { input, vars: &vars };

    for expression in &tree.children {
        println!("result: {}", eval.walk(expression)?);
    }

    Ok(())
}

fn sexpr(node: &ParseNode, input: &str) -> String {
    if node.is_leaf() {
        return format!("({} {:?})", node.name(), node.as_str(input).trim_end());
    }

    let children: Vec<String> = node.children.iter().map(|child| sexpr(child, input)).collect();

    format!("({} {})", node.name(), children.join(" "))
}

struct Eval<'a> {
    input: &'a str,
    vars: &'a HashMap<String, f64>,
}

impl Eval<'_> {
    /// Token text without the implicit whitespace and comments it swallowed.
    fn text(&self, node: &ParseNode) -> &str {
        node.as_str(self.input)
            .split(|c: char| c.is_whitespace() || c == '#')
            .next()
            .unwrap_or_default()
    }

    fn walk(&self, node: &ParseNode) -> anyhow::Result<f64> {
        match node.name() {
            "expression" | "term" => {
                let mut value = self.walk(&node.children[0])?;

                for series in &node.children[1..] {
                    debug_assert_eq!(series.tag, Tag::Series);

                    let right = self.walk(&series.children[1])?;

                    match series.children[0].name() {
                        "PLUS" => value += right,
                        "MINUS" => value -= right,
                        "MUL" => value *= right,
                        "DIV" => value /= right,
                        op => bail!("unexpected operator {}", op),
                    }
                }

                Ok(value)
            }
            "factor" => {
                let mut value = 1.0;

                for child in &node.children {
                    if child.name() == "sign" {
                        if child.children[0].name() == "NEGATIVE" {
                            value = -value;
                        }
                    } else {
                        // adjacent operands multiply: 2x, 3(y + 1)
                        value *= self.walk(child)?;
                    }
                }

                Ok(value)
            }
            "group" => self.walk(&node.children[0]),
            "NUMBER" => self
                .text(node)
                .parse()
                .with_context(|| format!("bad number {}", self.text(node))),
            "VARIABLE" => {
                let name = self.text(node);

                self.vars
                    .get(name)
                    .copied()
                    .ok_or_else(|| anyhow!("unbound variable {}", name))
            }
            name => Err(anyhow!("unexpected node {}", name)),
        }
    }
}
