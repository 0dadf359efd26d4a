//! Scopes, scope inheritance and scope mappings.
//!
//! A [`Scope`] is a named usage context for a dependency (compile, runtime,
//! test...). Scopes may extend other scopes: a dependency declared for
//! `compile` is also part of `runtime` because `runtime` extends `compile`.
//! A [`ScopeMapping`] tells the resolver which configurations of the
//! *dependency itself* to pull when it is requested under a given scope.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use depot_util::errors::DepotError;

/// Separators reserved by the textual scope-mapping syntax.
const RESERVED: [&str; 3] = [",", "->", ";"];

#[derive(Debug)]
struct ScopeInner {
    name: String,
    description: String,
    transitive: bool,
    extends: Vec<Scope>,
}

/// A named dependency scope.
///
/// Equality, ordering and hashing only consider the name. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Scope(Arc<ScopeInner>);

impl Scope {
    /// A transitive scope extending nothing.
    pub fn of(name: &str) -> Result<Self, DepotError> {
        Self::new(name, &[], true)
    }

    /// A scope extending `extends`.
    ///
    /// Fails when the name is blank, contains a mapping separator, or when one
    /// of the extended scopes already has `name` among its ancestors.
    pub fn new(name: &str, extends: &[Scope], transitive: bool) -> Result<Self, DepotError> {
        validate_name(name)?;
        for parent in extends {
            if parent.ancestor_scopes().iter().any(|s| s.name() == name) {
                return Err(DepotError::Declaration {
                    message: format!(
                        "scope '{name}' cannot extend '{}': it is already one of its ancestors",
                        parent.name()
                    ),
                });
            }
        }
        Ok(Self::unchecked(name, "", transitive, extends))
    }

    fn unchecked(name: &str, description: &str, transitive: bool, extends: &[Scope]) -> Self {
        Scope(Arc::new(ScopeInner {
            name: name.to_string(),
            description: description.to_string(),
            transitive,
            extends: extends.to_vec(),
        }))
    }

    /// Same scope with a human readable description attached.
    pub fn with_description(&self, description: &str) -> Self {
        Self::unchecked(
            self.name(),
            description,
            self.is_transitive(),
            &self.0.extends,
        )
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    /// Whether dependencies declared in this scope bring their own dependencies.
    pub fn is_transitive(&self) -> bool {
        self.0.transitive
    }

    /// Scopes this one directly extends.
    pub fn extended_scopes(&self) -> &[Scope] {
        &self.0.extends
    }

    /// This scope followed by every scope it extends, directly or not.
    ///
    /// Depth-first, declaration order, each name listed once.
    pub fn ancestor_scopes(&self) -> Vec<Scope> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        self.collect_ancestors(&mut result, &mut seen);
        result
    }

    fn collect_ancestors(&self, out: &mut Vec<Scope>, seen: &mut HashSet<String>) {
        // A name met twice is either a diamond or a cycle; both stop here.
        if !seen.insert(self.name().to_string()) {
            return;
        }
        out.push(self.clone());
        for parent in &self.0.extends {
            parent.collect_ancestors(out, seen);
        }
    }

    /// `true` if `other` is a strict ancestor of this scope.
    pub fn is_extending(&self, other: &Scope) -> bool {
        self.ancestor_scopes().iter().skip(1).any(|s| s == other)
    }

    /// `true` if this scope is one of `scopes` or extends one of them.
    pub fn is_in_or_extending_any_of(&self, scopes: &[Scope]) -> bool {
        scopes.iter().any(|s| s == self || self.is_extending(s))
    }

    /// Scopes present in both lists, in the order of `self_scopes`.
    pub fn common_scopes(self_scopes: &[Scope], others: &[Scope]) -> Vec<Scope> {
        self_scopes
            .iter()
            .filter(|s| others.contains(s))
            .cloned()
            .collect()
    }
}

fn validate_name(name: &str) -> Result<(), DepotError> {
    if name.trim().is_empty() {
        return Err(DepotError::Declaration {
            message: "scope name cannot be blank".to_string(),
        });
    }
    if let Some(sep) = RESERVED.iter().find(|sep| name.contains(*sep)) {
        return Err(DepotError::Declaration {
            message: format!("scope name '{name}' contains the reserved sequence '{sep}'"),
        });
    }
    Ok(())
}

/// Union of [`Scope::ancestor_scopes`] over `scopes`, first-seen order.
pub fn involved_scopes(scopes: &[Scope]) -> Vec<Scope> {
    let mut result: Vec<Scope> = Vec::new();
    for scope in scopes {
        for ancestor in scope.ancestor_scopes() {
            if !result.contains(&ancestor) {
                result.push(ancestor);
            }
        }
    }
    result
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl Ord for Scope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scopes every build understands.
pub mod scopes {
    use super::*;

    /// Needed to compile and to run; exported to consumers.
    pub fn compile() -> Scope {
        static SCOPE: OnceLock<Scope> = OnceLock::new();
        SCOPE
            .get_or_init(|| {
                Scope::unchecked(
                    "compile",
                    "Dependencies to compile the project and to run it.",
                    true,
                    &[],
                )
            })
            .clone()
    }

    /// Provided by the runtime environment; never exported.
    pub fn provided() -> Scope {
        static SCOPE: OnceLock<Scope> = OnceLock::new();
        SCOPE
            .get_or_init(|| {
                Scope::unchecked(
                    "provided",
                    "Dependencies to compile the project but that should not be embedded in produced artifacts.",
                    false,
                    &[],
                )
            })
            .clone()
    }

    /// Needed at runtime only.
    pub fn runtime() -> Scope {
        static SCOPE: OnceLock<Scope> = OnceLock::new();
        SCOPE
            .get_or_init(|| {
                Scope::unchecked(
                    "runtime",
                    "Dependencies to embed in produced artifacts (as war or fat jar files).",
                    true,
                    &[compile()],
                )
            })
            .clone()
    }

    /// Needed to compile and run tests.
    pub fn test() -> Scope {
        static SCOPE: OnceLock<Scope> = OnceLock::new();
        SCOPE
            .get_or_init(|| {
                Scope::unchecked(
                    "test",
                    "Dependencies necessary to compile and run tests.",
                    true,
                    &[runtime(), provided()],
                )
            })
            .clone()
    }

    /// The four standard scopes.
    pub fn standard() -> Vec<Scope> {
        vec![compile(), provided(), runtime(), test()]
    }

    /// A standard scope by name, ignoring case.
    pub fn by_name(name: &str) -> Option<Scope> {
        standard()
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Mapping used when a module dependency carries no explicit binding.
    pub fn default_mapping() -> ScopeMapping {
        let archives = Scope::unchecked("archives(master)", "", true, &[]);
        let compile_default = Scope::unchecked("compile(default)", "", true, &[]);
        let runtime_default = Scope::unchecked("runtime(default)", "", true, &[]);
        let mut mapping = ScopeMapping::new();
        for from in [compile(), provided()] {
            mapping.put(from, &[archives.clone(), compile_default.clone()]);
        }
        for from in [runtime(), test()] {
            mapping.put(from, &[archives.clone(), runtime_default.clone()]);
        }
        mapping
    }
}

/// Maps a *from* scope to the scopes to pull from the dependency itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMapping {
    entries: Vec<(Scope, Vec<Scope>)>,
}

impl ScopeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map each of `from` to the scopes named in `to`.
    ///
    /// Mapping an already present scope extends its targets.
    pub fn and(&self, from: &[Scope], to: &[&str]) -> Result<Self, DepotError> {
        let targets = to
            .iter()
            .map(|name| Scope::of(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut result = self.clone();
        for scope in from {
            result.put(scope.clone(), &targets);
        }
        Ok(result)
    }

    fn put(&mut self, from: Scope, targets: &[Scope]) {
        match self.entries.iter_mut().find(|(s, _)| *s == from) {
            Some((_, existing)) => {
                for t in targets {
                    if !existing.contains(t) {
                        existing.push(t.clone());
                    }
                }
            }
            None => self.entries.push((from, targets.to_vec())),
        }
    }

    /// The left-hand scopes.
    pub fn entries(&self) -> impl Iterator<Item = &Scope> {
        self.entries.iter().map(|(s, _)| s)
    }

    pub fn has_entry(&self, scope: &Scope) -> bool {
        self.entries().any(|s| s == scope)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scopes mapped from `from`. Fails when `from` has no entry.
    pub fn mapped_scopes(&self, from: &Scope) -> Result<&[Scope], DepotError> {
        self.entries
            .iter()
            .find(|(s, _)| s == from)
            .map(|(_, targets)| targets.as_slice())
            .ok_or_else(|| DepotError::Declaration {
                message: format!("no mapping declared for scope '{from}' in {self}"),
            })
    }

    /// Left and right scopes together.
    pub fn declared_scopes(&self) -> Vec<Scope> {
        let mut result: Vec<Scope> = Vec::new();
        for (from, targets) in &self.entries {
            for s in std::iter::once(from).chain(targets) {
                if !result.contains(s) {
                    result.push(s.clone());
                }
            }
        }
        result
    }

    /// Ancestor closure of the left-hand scopes.
    pub fn involved_scopes(&self) -> Vec<Scope> {
        let left: Vec<Scope> = self.entries().cloned().collect();
        involved_scopes(&left)
    }
}

impl fmt::Display for ScopeMapping {
    /// Ivy configuration-mapping syntax: `from->to1,to2;from2->to3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .entries
            .iter()
            .map(|(from, targets)| {
                let to: Vec<&str> = targets.iter().map(Scope::name).collect();
                format!("{from}->{}", to.join(","))
            })
            .collect::<Vec<_>>()
            .join(";");
        f.write_str(&text)
    }
}
