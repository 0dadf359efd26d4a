//! ivy.xml descriptor of a module published to an Ivy repository.

use chrono::{DateTime, Utc};
use depot_core::dependency::{Exclude, ModuleDependency, ScopeBinding, ScopedDependency};
use depot_core::dependency_set::DependencySet;
use depot_core::module::VersionedModule;
use depot_core::publication::Publication;
use depot_core::scope::{involved_scopes, Scope, ScopeMapping};

use crate::xml::XmlWriter;

const MAVEN_NAMESPACE: &str = "http://ant.apache.org/ivy/maven";

/// `yyyyMMddHHmmss`, the Ivy publication date format.
pub fn publication_date(date: DateTime<Utc>) -> String {
    date.format("%Y%m%d%H%M%S").to_string()
}

/// Writes the descriptor. `default_mapping` is declared as the module's
/// default conf mapping and applied to dependencies without scopes.
pub fn write_ivy_xml(
    module: &VersionedModule,
    publication: &Publication,
    dependencies: &DependencySet,
    default_mapping: &ScopeMapping,
    date: DateTime<Utc>,
) -> String {
    let status = if module.version().is_snapshot() {
        "integration"
    } else {
        "release"
    };
    let date = publication_date(date);
    let mut w = XmlWriter::new();
    w.open(
        "ivy-module",
        &[("version", "2.0"), ("xmlns:m", MAVEN_NAMESPACE)],
    );
    w.empty(
        "info",
        &[
            ("organisation", module.module_id().group()),
            ("module", module.module_id().name()),
            ("revision", module.version().as_str()),
            ("status", status),
            ("publication", date.as_str()),
        ],
    );

    write_configurations(&mut w, publication, dependencies, default_mapping);
    write_publications(&mut w, module, publication);

    let resolved = dependencies.to_resolved_module_versions();
    w.open("dependencies", &[]);
    for scoped in resolved.iter() {
        if let Some(dependency) = scoped.module_dependency() {
            write_dependency(&mut w, scoped, dependency, default_mapping);
        }
    }
    for exclude in resolved.global_exclusions() {
        write_exclude(&mut w, exclude);
    }
    w.close();
    w.finish()
}

fn configurations(
    publication: &Publication,
    dependencies: &DependencySet,
    default_mapping: &ScopeMapping,
) -> Vec<Scope> {
    let mut declared = dependencies.involved_scopes();
    declared.extend(default_mapping.entries().cloned());
    for artifact in publication.artifacts() {
        declared.extend(artifact.scopes().iter().cloned());
    }
    involved_scopes(&declared)
}

fn write_configurations(
    w: &mut XmlWriter,
    publication: &Publication,
    dependencies: &DependencySet,
    default_mapping: &ScopeMapping,
) {
    let confs = configurations(publication, dependencies, default_mapping);
    let mapping_expr = default_mapping.to_string();
    if default_mapping.is_empty() {
        w.open("configurations", &[]);
    } else {
        w.open("configurations", &[("defaultconfmapping", mapping_expr.as_str())]);
    }
    for scope in &confs {
        let extends = join_names(scope.extended_scopes());
        let mut attributes = vec![("name", scope.name()), ("visibility", "public")];
        if !scope.description().is_empty() {
            attributes.push(("description", scope.description()));
        }
        if !extends.is_empty() {
            attributes.push(("extends", extends.as_str()));
        }
        if !scope.is_transitive() {
            attributes.push(("transitive", "false"));
        }
        w.empty("conf", &attributes);
    }
    w.close();
}

fn write_publications(w: &mut XmlWriter, module: &VersionedModule, publication: &Publication) {
    w.open("publications", &[]);
    for artifact in publication.artifacts() {
        let conf = join_names(&involved_scopes(artifact.scopes()));
        let mut attributes = vec![
            ("name", module.module_id().name()),
            ("type", artifact.artifact_type()),
            ("ext", artifact.ext()),
        ];
        if !conf.is_empty() {
            attributes.push(("conf", conf.as_str()));
        }
        if let Some(classifier) = artifact.classifier() {
            attributes.push(("m:classifier", classifier));
        }
        w.empty("artifact", &attributes);
    }
    w.close();
}

/// Ivy conf expression `from->to1,to2;from2->to3` for one dependency.
fn conf_expression(scoped: &ScopedDependency, default_mapping: &ScopeMapping) -> String {
    let pairs: Vec<(Scope, Vec<Scope>)> = match scoped.binding() {
        ScopeBinding::Unset => mapping_pairs(default_mapping),
        ScopeBinding::Mapping(mapping) => mapping_pairs(mapping),
        ScopeBinding::Scopes(scopes) => scopes
            .iter()
            .map(|scope| match default_mapping.mapped_scopes(scope) {
                Ok(targets) => (scope.clone(), targets.to_vec()),
                Err(_) => (scope.clone(), vec![scope.clone()]),
            })
            .collect(),
    };
    pairs
        .iter()
        .map(|(from, to)| format!("{}->{}", from.name(), join_names(to)))
        .collect::<Vec<_>>()
        .join(";")
}

fn mapping_pairs(mapping: &ScopeMapping) -> Vec<(Scope, Vec<Scope>)> {
    mapping
        .entries()
        .filter_map(|from| {
            mapping
                .mapped_scopes(from)
                .ok()
                .map(|to| (from.clone(), to.to_vec()))
        })
        .collect()
}

fn write_dependency(
    w: &mut XmlWriter,
    scoped: &ScopedDependency,
    dependency: &ModuleDependency,
    default_mapping: &ScopeMapping,
) {
    let id = dependency.module_id();
    let conf = conf_expression(scoped, default_mapping);
    let mut attributes = vec![("org", id.group()), ("name", id.name())];
    if !dependency.version().is_unspecified() {
        attributes.push(("rev", dependency.version().as_str()));
    }
    if !conf.is_empty() {
        attributes.push(("conf", conf.as_str()));
    }
    if dependency.version().is_snapshot() {
        attributes.push(("changing", "true"));
    }
    if !dependency.is_transitive() {
        attributes.push(("transitive", "false"));
    }

    let has_artifact = dependency.classifier().is_some() || dependency.ext().is_some();
    if !has_artifact && dependency.exclusions().is_empty() {
        w.empty("dependency", &attributes);
        return;
    }
    w.open("dependency", &attributes);
    if has_artifact {
        let ext = dependency.ext().unwrap_or("jar");
        let mut artifact = vec![("name", id.name()), ("type", ext), ("ext", ext)];
        if let Some(classifier) = dependency.classifier() {
            artifact.push(("m:classifier", classifier));
        }
        w.empty("artifact", &artifact);
    }
    for exclude in dependency.exclusions() {
        write_exclude(w, exclude);
    }
    w.close();
}

fn write_exclude(w: &mut XmlWriter, exclude: &Exclude) {
    let conf = join_names(exclude.scopes());
    let mut attributes = vec![
        ("org", exclude.module_id().group()),
        ("module", exclude.module_id().name()),
    ];
    if let Some(t) = exclude.artifact_type() {
        attributes.push(("type", t));
    }
    if let Some(ext) = exclude.ext() {
        attributes.push(("ext", ext));
    }
    if !conf.is_empty() {
        attributes.push(("conf", conf.as_str()));
    }
    w.empty("exclude", &attributes);
}

fn join_names(scopes: &[Scope]) -> String {
    scopes.iter().map(Scope::name).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use depot_core::scope::scopes;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn publication_date_format() {
        assert_eq!(publication_date(date()), "20240305140709");
    }

    #[test]
    fn descriptor_contents() {
        let module = VersionedModule::parse("org.example:lib:1.0").unwrap();
        let publication = Publication::of("build/lib.jar")
            .unwrap()
            .and("build/lib-sources.jar", "sources")
            .unwrap();
        let deps = DependencySet::new()
            .and_module("org.example:core:2.0", &[scopes::compile()])
            .unwrap()
            .and_module("junit:junit:4.13", &[scopes::test()])
            .unwrap()
            .with_global_exclusion(Exclude::parse("log:log").unwrap());
        let xml = write_ivy_xml(&module, &publication, &deps, &scopes::default_mapping(), date());

        assert!(xml.contains(
            r#"<info organisation="org.example" module="lib" revision="1.0" status="release" publication="20240305140709"/>"#
        ));
        assert!(xml.contains(r#"extends="runtime,provided""#));
        assert!(xml.contains(r#"<conf name="provided" visibility="public""#));
        assert!(xml.contains(r#"transitive="false""#));
        assert!(xml.contains(r#"m:classifier="sources""#));
        assert!(xml.contains(
            r#"<dependency org="org.example" name="core" rev="2.0" conf="compile->archives(master),compile(default)"/>"#
        ));
        assert!(xml.contains(r#"<exclude org="log" module="log"/>"#));
    }

    #[test]
    fn snapshot_is_integration_and_changing() {
        let module = VersionedModule::parse("g:a:1.0-SNAPSHOT").unwrap();
        let deps = DependencySet::new()
            .and_module("g:b:2.0-SNAPSHOT", &[scopes::runtime()])
            .unwrap();
        let xml = write_ivy_xml(
            &module,
            &Publication::of("a.jar").unwrap(),
            &deps,
            &ScopeMapping::new(),
            date(),
        );
        assert!(xml.contains(r#"status="integration""#));
        assert!(xml.contains(r#"conf="runtime->runtime" changing="true""#));
    }
}
