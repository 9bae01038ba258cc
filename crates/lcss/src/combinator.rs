//! Selector combination for nested rulesets.
//!
//! A nested ruleset's effective selectors are its own selectors joined with
//! the effective selectors of the enclosing ruleset:
//!
//! ```css
//! .a, .b {
//!     & > .c { }     // .a > .c, .b > .c
//!     .d { }         // .a .d, .b .d
//!     & + & { }      // .a + .a, .a + .b, .b + .a, .b + .b
//! }
//! ```
//!
//! ## Combination Rules
//!
//! - Without `&`, each ancestor is prepended with a descendant combinator
//!   (an explicit leading `>`, `+` or `~` is kept)
//! - Each `&` is replaced by every ancestor independently, so `n` wildcards
//!   against `a` ancestors give `a^n` selectors
//! - The combinator in front of `&` moves to the first substituted element;
//!   elements attached to `&` (`&:hover`, `&-title`) stay attached
//! - Output order: current selectors in source order, each expanded in
//!   ancestor order with the first `&` varying slowest

use crate::ast::{Combinator, Element, Selector};
use crate::error::ResolveError;

/// Joins `ancestors` with `current`.
///
/// Fails when the expansion would exceed `limit` selectors or when an
/// ancestor selector has no elements.
pub fn combine(
    ancestors: &[Selector],
    current: &[Selector],
    limit: usize,
) -> Result<Vec<Selector>, ResolveError> {
    if ancestors.is_empty() {
        return Ok(current.to_vec());
    }
    if ancestors.iter().any(|a| a.elements.is_empty()) {
        return Err(ResolveError::SelectorCombination(
            "enclosing selector is empty".to_string(),
        ));
    }

    let mut combined = Vec::new();
    for selector in current {
        if selector.has_wildcard() {
            expand_wildcards(ancestors, selector, limit, &mut combined)?;
        } else {
            for ancestor in ancestors {
                combined.push(prepend(ancestor, selector));
            }
        }
        check_limit(combined.len(), limit)?;
    }
    log::trace!(
        "combined {} ancestor(s) with {} selector(s) into {}",
        ancestors.len(),
        current.len(),
        combined.len()
    );
    Ok(combined)
}

/// `ancestor current`, descendant unless `current` starts with a combinator.
fn prepend(ancestor: &Selector, current: &Selector) -> Selector {
    let mut elements = ancestor.elements.clone();
    for (i, element) in current.elements.iter().enumerate() {
        let mut element = element.clone();
        if i == 0 && element.combinator == Combinator::None {
            element.combinator = Combinator::Descendant;
        }
        elements.push(element);
    }
    Selector::new(elements)
}

fn expand_wildcards(
    ancestors: &[Selector],
    selector: &Selector,
    limit: usize,
    out: &mut Vec<Selector>,
) -> Result<(), ResolveError> {
    let mut partials: Vec<Vec<Element>> = vec![Vec::new()];

    for element in &selector.elements {
        if !element.is_wildcard() {
            for partial in &mut partials {
                partial.push(element.clone());
            }
            continue;
        }

        check_limit(partials.len().saturating_mul(ancestors.len()), limit)?;
        let mut next = Vec::with_capacity(partials.len() * ancestors.len());
        for partial in &partials {
            for ancestor in ancestors {
                let mut expanded = partial.clone();
                for (i, substituted) in ancestor.elements.iter().enumerate() {
                    let mut substituted = substituted.clone();
                    if i == 0 {
                        substituted.combinator = element.combinator;
                    }
                    expanded.push(substituted);
                }
                next.push(expanded);
            }
        }
        partials = next;
    }

    out.extend(partials.into_iter().map(Selector::new));
    Ok(())
}

fn check_limit(count: usize, limit: usize) -> Result<(), ResolveError> {
    if count > limit {
        return Err(ResolveError::SelectorCombination(format!(
            "nested selector expands to more than {limit} selectors"
        )));
    }
    Ok(())
}
