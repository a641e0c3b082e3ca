//! Two-tier environment store: `selected` is searched before `global`.
//!
//! Every operation borrows the input set and returns a new one.

use crate::template::{resolve_template, resolve_with_visited};
use crate::types::{EnvironmentSet, EnvironmentVariable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvScope {
    All,
    Active,
    Global,
}

impl EnvScope {
    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Global => "global",
        }
    }
}

fn find<'a>(vars: &'a [EnvironmentVariable], key: &str) -> Option<&'a EnvironmentVariable> {
    vars.iter().find(|var| var.key == key)
}

fn find_in<'a>(
    set: &'a EnvironmentSet,
    key: &str,
    scope: EnvScope,
) -> Option<&'a EnvironmentVariable> {
    match scope {
        EnvScope::All => find(&set.selected, key).or_else(|| find(&set.global, key)),
        EnvScope::Active => find(&set.selected, key),
        EnvScope::Global => find(&set.global, key),
    }
}

fn find_in_mut<'a>(
    set: &'a mut EnvironmentSet,
    key: &str,
    scope: EnvScope,
) -> Option<&'a mut EnvironmentVariable> {
    let in_selected = set.selected.iter().any(|var| var.key == key);
    match scope {
        EnvScope::All if in_selected => set.selected.iter_mut().find(|var| var.key == key),
        EnvScope::All => set.global.iter_mut().find(|var| var.key == key),
        EnvScope::Active => set.selected.iter_mut().find(|var| var.key == key),
        EnvScope::Global => set.global.iter_mut().find(|var| var.key == key),
    }
}

fn append_target(set: &mut EnvironmentSet, scope: EnvScope) -> &mut Vec<EnvironmentVariable> {
    match scope {
        EnvScope::All | EnvScope::Active => &mut set.selected,
        EnvScope::Global => &mut set.global,
    }
}

pub fn get(key: &str, set: &EnvironmentSet) -> Option<String> {
    get_in(key, set, EnvScope::All)
}

pub fn get_in(key: &str, set: &EnvironmentSet, scope: EnvScope) -> Option<String> {
    find_in(set, key, scope).map(|var| var.current_value.clone())
}

/// Looks `key` up and resolves templates inside its value against the whole
/// set. The key itself counts as visited, so a value that leads back to it
/// keeps its token.
pub fn get_resolve(key: &str, set: &EnvironmentSet) -> Option<String> {
    get_resolve_in(key, set, EnvScope::All)
}

pub fn get_resolve_in(key: &str, set: &EnvironmentSet, scope: EnvScope) -> Option<String> {
    let value = get_in(key, set, scope)?;
    let lookup = |name: &str| get(name, set);
    Some(resolve_with_visited(&value, &[key], &lookup))
}

pub fn set(key: &str, value: &str, set: &EnvironmentSet) -> EnvironmentSet {
    set_in(key, value, set, EnvScope::All)
}

pub fn set_in(key: &str, value: &str, env: &EnvironmentSet, scope: EnvScope) -> EnvironmentSet {
    let mut next = env.clone();
    match find_in_mut(&mut next, key, scope) {
        Some(var) => var.current_value = value.to_string(),
        None => append_target(&mut next, scope).push(EnvironmentVariable::new(key, value)),
    }
    next
}

/// Writes the initial value, creating the variable when the scope lacks it.
pub fn set_initial_in(
    key: &str,
    value: &str,
    env: &EnvironmentSet,
    scope: EnvScope,
) -> EnvironmentSet {
    let mut next = env.clone();
    match find_in_mut(&mut next, key, scope) {
        Some(var) => var.initial_value = value.to_string(),
        None => append_target(&mut next, scope).push(EnvironmentVariable::new(key, value)),
    }
    next
}

pub fn get_initial_raw_in(key: &str, set: &EnvironmentSet, scope: EnvScope) -> Option<String> {
    find_in(set, key, scope).map(|var| var.initial_value.clone())
}

/// Restores the current value of the first match from its initial value.
pub fn reset_in(key: &str, env: &EnvironmentSet, scope: EnvScope) -> EnvironmentSet {
    let mut next = env.clone();
    if let Some(var) = find_in_mut(&mut next, key, scope) {
        var.current_value = var.initial_value.clone();
    }
    next
}

pub fn unset(key: &str, set: &EnvironmentSet) -> EnvironmentSet {
    unset_in(key, set, EnvScope::All)
}

pub fn unset_in(key: &str, env: &EnvironmentSet, scope: EnvScope) -> EnvironmentSet {
    let mut next = env.clone();
    let in_selected = next.selected.iter().position(|var| var.key == key);
    let in_global = next.global.iter().position(|var| var.key == key);
    match (scope, in_selected, in_global) {
        (EnvScope::All | EnvScope::Active, Some(index), _) => {
            next.selected.remove(index);
        }
        (EnvScope::All | EnvScope::Global, _, Some(index)) => {
            next.global.remove(index);
        }
        _ => {}
    }
    next
}

pub fn resolve(template: &str, set: &EnvironmentSet) -> String {
    resolve_template(template, |name| get(name, set))
}

/// Resolves `template`, rendering secret variables as `*` runs of the same
/// length.
pub fn resolve_masked(template: &str, set: &EnvironmentSet) -> String {
    resolve_template(template, |name| {
        find_in(set, name, EnvScope::All).map(|var| {
            if var.secret {
                "*".repeat(var.current_value.chars().count())
            } else {
                var.current_value.clone()
            }
        })
    })
}
