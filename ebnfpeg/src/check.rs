use std::collections::HashSet;

use super::ast;
use super::directives::LexicalPolicy;
use super::error::{CompileError, CompileResult};

/// Static checks run before any matcher is built: every reference and every
/// `@hide`/`@drop` entry must name a rule. Rules that are never used are
/// only worth a warning.
pub fn check_grammar(grammar: &ast::Grammar, policy: &LexicalPolicy) -> CompileResult<()> {
    let mut used = HashSet::new();

    for rule in &grammar.rules {
        let mut undefined = None;

        rule.body.visit_references(&mut |name| {
            if grammar.lookup.contains_key(name) {
                used.insert(name);
            } else if undefined.is_none() {
                undefined = Some(name);
            }
        });

        if let Some(name) = undefined {
            return Err(CompileError::UndefinedRule {
                name: name.to_owned(),
                rule: rule.name.clone(),
            });
        }
    }

    let scoped = policy
        .hide
        .iter()
        .map(|name| ("hide", name))
        .chain(policy.drop.rules.iter().map(|name| ("drop", name)));

    for (directive, name) in scoped {
        if !grammar.lookup.contains_key(name) {
            return Err(CompileError::DirectiveScope {
                directive: directive.to_owned(),
                name: name.clone(),
            });
        }
    }

    for (no, rule) in grammar.rules.iter().enumerate() {
        if no != 0 && !used.contains(rule.name.as_str()) {
            log::warn!("rule {} is not used anywhere", rule.name);
        }
    }

    Ok(())
}
