use depot_core::scope::scopes::{compile, provided, runtime, test};
use depot_core::scope::{involved_scopes, Scope, ScopeMapping};
use std::collections::HashSet;

#[test]
fn test_involved_scopes_of_test_is_full_closure() {
    let involved: HashSet<Scope> = involved_scopes(&[test()]).into_iter().collect();
    let expected: HashSet<Scope> = [test(), runtime(), provided(), compile()].into_iter().collect();
    assert_eq!(involved, expected);
}

#[test]
fn test_involved_scopes_keeps_input_order_and_dedups() {
    let involved = involved_scopes(&[runtime(), compile(), provided()]);
    let names: Vec<&str> = involved.iter().map(Scope::name).collect();
    assert_eq!(names, vec!["runtime", "compile", "provided"]);
}

#[test]
fn test_custom_scope_extending_standard_one() {
    let integration = Scope::new("integration", &[test()], true).unwrap();
    let involved = involved_scopes(&[integration.clone()]);
    assert_eq!(involved.len(), 5);
    assert!(integration.is_extending(&compile()));
}

#[test]
fn test_provided_is_not_transitive() {
    assert!(!provided().is_transitive());
    assert!(compile().is_transitive());
}

#[test]
fn test_scope_name_with_mapping_separator_rejected() {
    assert!(Scope::of("compile,runtime").is_err());
    assert!(Scope::of("compile->default").is_err());
}

#[test]
fn test_mapping_declared_scopes_are_left_and_right() {
    let mapping = ScopeMapping::new()
        .and(&[compile(), runtime()], &["default"])
        .unwrap();
    let names: Vec<String> = mapping
        .declared_scopes()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["compile", "default", "runtime"]);
    assert_eq!(mapping.entries().count(), 2);
}

#[test]
fn test_mapping_same_scope_twice_merges_targets() {
    let mapping = ScopeMapping::new()
        .and(&[compile()], &["a"])
        .unwrap()
        .and(&[compile()], &["b", "a"])
        .unwrap();
    assert_eq!(mapping.to_string(), "compile->a,b");
}

#[test]
fn test_mapping_involved_scopes() {
    let mapping = ScopeMapping::new().and(&[test()], &["default"]).unwrap();
    assert_eq!(mapping.involved_scopes().len(), 4);
}
