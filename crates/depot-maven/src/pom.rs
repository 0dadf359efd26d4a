//! POM files: reading the dependency declarations of published modules
//! (parent inheritance, property interpolation, BOM imports) and writing
//! the POM of a module being published.

use std::collections::BTreeMap;

use depot_core::dependency::{Exclude, ModuleDependency, ScopeBinding, ScopedDependency};
use depot_core::dependency_set::DependencySet;
use depot_core::module::VersionedModule;
use depot_core::publication::PublicationInfo;
use depot_core::scope::{scopes, Scope};
use depot_util::errors::{DepotError, DepotResult};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::xml::XmlWriter;

const DEPENDENCY: &str = "project>dependencies>dependency";
const MANAGED_DEPENDENCY: &str = "project>dependencyManagement>dependencies>dependency";
const PARENT: &str = "project>parent";
const LICENSE: &str = "project>licenses>license";
const EXCLUSION_SUFFIX: &str = ">exclusions>exclusion";

/// Nested `${...}` references are expanded this many times at most.
const MAX_INTERPOLATION_PASSES: usize = 16;

/// The parts of a POM that resolution and publication look at.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
    pub licenses: Vec<PomLicense>,
}

#[derive(Debug, Clone, Default)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// A `<dependency>` entry, from `<dependencies>` or `<dependencyManagement>`.
#[derive(Debug, Clone, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub exclusions: Vec<PomExclusion>,
}

/// `artifact_id` is `None` when the exclusion covers the whole group.
#[derive(Debug, Clone, Default)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PomLicense {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl Pom {
    /// Declared group, else the parent's.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Declared version, else the parent's.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Expands `${property}` references from the POM properties and the
    /// built-in `project.*` variables. Unknown references are left as is.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = input.to_string();
        for _ in 0..MAX_INTERPOLATION_PASSES {
            if !result.contains("${") {
                break;
            }
            let expanded = self.expand_once(&result);
            if expanded == result {
                break;
            }
            result = expanded;
        }
        result
    }

    fn expand_once(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            match self.property(&rest[start + 2..start + len]) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..=start + len]),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    fn property(&self, key: &str) -> Option<String> {
        let key = key.strip_prefix("pom.").map_or(key.to_string(), |k| format!("project.{k}"));
        match key.as_str() {
            "project.groupId" => self.effective_group_id().map(str::to_string),
            "project.artifactId" => self.artifact_id.clone(),
            "project.version" => self.effective_version().map(str::to_string),
            "project.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent.as_ref().map(|p| p.group_id.clone()),
            "project.parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(&key).cloned(),
        }
    }

    /// Interpolates the coordinates of declared and managed dependencies.
    pub fn resolve_properties(&mut self) {
        let snapshot = self.clone();
        for dependency in self
            .dependencies
            .iter_mut()
            .chain(self.dependency_management.iter_mut())
        {
            dependency.group_id = snapshot.interpolate(&dependency.group_id);
            dependency.artifact_id = snapshot.interpolate(&dependency.artifact_id);
            dependency.version = dependency.version.as_deref().map(|v| snapshot.interpolate(v));
            dependency.classifier = dependency.classifier.as_deref().map(|c| snapshot.interpolate(c));
        }
    }

    /// Inherits the properties and managed dependencies `parent` declares
    /// and this POM does not, plus a missing group or version.
    pub fn apply_parent(&mut self, parent: &Pom) {
        for (key, value) in &parent.properties {
            self.properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(str::to_string);
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(str::to_string);
        }
        for managed in &parent.dependency_management {
            if self.managed(&managed.group_id, &managed.artifact_id).is_none() {
                self.dependency_management.push(managed.clone());
            }
        }
    }

    fn managed(&self, group_id: &str, artifact_id: &str) -> Option<&PomDependency> {
        self.dependency_management
            .iter()
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
    }

    /// Version `<dependencyManagement>` gives to `group_id:artifact_id`.
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.managed(group_id, artifact_id)?.version.as_deref()
    }

    /// Managed entries importing a BOM (`type` pom, `scope` import).
    pub fn bom_imports(&self) -> Vec<&PomDependency> {
        self.dependency_management
            .iter()
            .filter(|d| d.scope.as_deref() == Some("import") && d.type_.as_deref() == Some("pom"))
            .collect()
    }
}

/// Accumulates the elements of a POM as the reader walks it.
#[derive(Default)]
struct PomBuilder {
    pom: Pom,
    dependency: Option<PomDependency>,
    exclusion: Option<PomExclusion>,
    parent: Option<ParentRef>,
    license: Option<PomLicense>,
}

impl PomBuilder {
    fn start(&mut self, ctx: &str) {
        match ctx {
            DEPENDENCY | MANAGED_DEPENDENCY => self.dependency = Some(PomDependency::default()),
            PARENT => self.parent = Some(ParentRef::default()),
            LICENSE => self.license = Some(PomLicense::default()),
            _ if self.dependency.is_some() && ctx.ends_with(EXCLUSION_SUFFIX) => {
                self.exclusion = Some(PomExclusion::default());
            }
            _ => {}
        }
    }

    fn end(&mut self, ctx: &str, text: String) {
        if let Some((owner, field)) = ctx.rsplit_once('>') {
            self.field(owner, field, text);
        }
        match ctx {
            DEPENDENCY => self.pom.dependencies.extend(self.dependency.take()),
            MANAGED_DEPENDENCY => self.pom.dependency_management.extend(self.dependency.take()),
            PARENT => self.pom.parent = self.parent.take(),
            LICENSE => self.pom.licenses.extend(self.license.take()),
            _ if ctx.ends_with(EXCLUSION_SUFFIX) => {
                if let (Some(dependency), Some(exclusion)) = (&mut self.dependency, self.exclusion.take()) {
                    dependency.exclusions.push(exclusion);
                }
            }
            _ => {}
        }
    }

    fn field(&mut self, owner: &str, field: &str, text: String) {
        match owner {
            "project" => {
                let slot = match field {
                    "groupId" => &mut self.pom.group_id,
                    "artifactId" => &mut self.pom.artifact_id,
                    "version" => &mut self.pom.version,
                    "packaging" => &mut self.pom.packaging,
                    "name" => &mut self.pom.name,
                    "description" => &mut self.pom.description,
                    _ => return,
                };
                *slot = Some(text);
            }
            "project>properties" => {
                self.pom.properties.insert(field.to_string(), text);
            }
            PARENT => {
                if let Some(parent) = &mut self.parent {
                    match field {
                        "groupId" => parent.group_id = text,
                        "artifactId" => parent.artifact_id = text,
                        "version" => parent.version = text,
                        _ => {}
                    }
                }
            }
            LICENSE => {
                if let Some(license) = &mut self.license {
                    match field {
                        "name" => license.name = Some(text),
                        "url" => license.url = Some(text),
                        _ => {}
                    }
                }
            }
            DEPENDENCY | MANAGED_DEPENDENCY => {
                if let Some(dependency) = &mut self.dependency {
                    match field {
                        "groupId" => dependency.group_id = text,
                        "artifactId" => dependency.artifact_id = text,
                        "version" => dependency.version = Some(text),
                        "scope" => dependency.scope = Some(text),
                        "optional" => dependency.optional = text.trim() == "true",
                        "classifier" => dependency.classifier = Some(text),
                        "type" => dependency.type_ = Some(text),
                        _ => {}
                    }
                }
            }
            _ if owner.ends_with(EXCLUSION_SUFFIX) => {
                if let Some(exclusion) = &mut self.exclusion {
                    match field {
                        "groupId" => exclusion.group_id = text,
                        "artifactId" if text != "*" => exclusion.artifact_id = Some(text),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

/// Parses a POM document. Unknown elements are ignored.
pub fn parse_pom(xml: &str) -> DepotResult<Pom> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = PomBuilder::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                text.clear();
                builder.start(&path.join(">"));
            }
            Ok(Event::Text(e)) => {
                text = e.unescape().unwrap_or_default().into_owned();
            }
            Ok(Event::End(_)) => {
                builder.end(&path.join(">"), std::mem::take(&mut text));
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DepotError::Generic {
                    message: format!("Failed to parse POM XML: {e}"),
                }
                .into());
            }
            _ => {}
        }
    }
    Ok(builder.pom)
}

/// Maven scope a declared dependency is published with; `None` is compile.
fn maven_scope(dependency: &ScopedDependency) -> Option<&'static str> {
    let bound: Vec<Scope> = match dependency.binding() {
        ScopeBinding::Unset => return None,
        ScopeBinding::Scopes(scopes) => scopes.clone(),
        ScopeBinding::Mapping(mapping) => mapping.entries().cloned().collect(),
    };
    let has = |scope: Scope| bound.iter().any(|s| *s == scope);
    let (compile, provided, runtime) = (
        has(scopes::compile()),
        has(scopes::provided()),
        has(scopes::runtime()),
    );
    if compile || (provided && runtime) {
        None
    } else if provided {
        Some("provided")
    } else if runtime {
        Some("runtime")
    } else if has(scopes::test()) {
        Some("test")
    } else {
        None
    }
}

/// Writes the POM of `module`.
///
/// Only module dependencies are listed; unspecified versions are taken
/// from the set's version provider, and global exclusions are repeated
/// under every dependency.
pub fn write_pom(
    module: &VersionedModule,
    packaging: &str,
    dependencies: &DependencySet,
    info: Option<&PublicationInfo>,
) -> String {
    let mut w = XmlWriter::new();
    w.open(
        "project",
        &[
            ("xmlns", "http://maven.apache.org/POM/4.0.0"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            (
                "xsi:schemaLocation",
                "http://maven.apache.org/POM/4.0.0 http://maven.apache.org/maven-v4_0_0.xsd",
            ),
        ],
    );
    w.element("modelVersion", "4.0.0")
        .element("groupId", module.module_id().group())
        .element("artifactId", module.module_id().name())
        .element("version", module.version().as_str())
        .element("packaging", packaging);

    if let Some(info) = info {
        write_info(&mut w, info);
    }

    let resolved = dependencies.to_resolved_module_versions();
    let modules: Vec<(&ScopedDependency, &ModuleDependency)> = resolved
        .iter()
        .filter_map(|d| d.module_dependency().map(|m| (d, m)))
        .collect();
    if !modules.is_empty() {
        w.open("dependencies", &[]);
        for (scoped, dependency) in modules {
            write_dependency(&mut w, scoped, dependency, resolved.global_exclusions());
        }
        w.close();
    }
    w.finish()
}

fn write_info(w: &mut XmlWriter, info: &PublicationInfo) {
    w.optional("name", info.project.name.as_deref())
        .optional("description", info.project.description.as_deref())
        .optional("url", info.project.url.as_deref());
    if !info.licenses.is_empty() {
        w.open("licenses", &[]);
        for license in &info.licenses {
            w.open("license", &[])
                .element("name", &license.name)
                .element("url", &license.url)
                .close();
        }
        w.close();
    }
    if !info.developers.is_empty() {
        w.open("developers", &[]);
        for developer in &info.developers {
            w.open("developer", &[])
                .element("name", &developer.name)
                .optional("email", developer.email.as_deref())
                .optional("organization", developer.organisation.as_deref())
                .optional("organizationUrl", developer.organisation_url.as_deref())
                .close();
        }
        w.close();
    }
    if let Some(scm) = &info.scm {
        w.open("scm", &[])
            .optional("connection", scm.connection.as_deref())
            .optional("developerConnection", scm.developer_connection.as_deref())
            .optional("url", scm.url.as_deref())
            .close();
    }
}

fn write_dependency(
    w: &mut XmlWriter,
    scoped: &ScopedDependency,
    dependency: &ModuleDependency,
    global_exclusions: &[Exclude],
) {
    let id = dependency.module_id();
    w.open("dependency", &[])
        .element("groupId", id.group())
        .element("artifactId", id.name());
    if !dependency.version().is_unspecified() {
        w.element("version", dependency.version().as_str());
    }
    w.optional("classifier", dependency.classifier());
    if let Some(ext) = dependency.ext().filter(|e| *e != "jar") {
        w.element("type", ext);
    }
    w.optional("scope", maven_scope(scoped));
    if !dependency.is_transitive() {
        w.element("optional", "true");
    }
    let exclusions: Vec<&Exclude> = dependency
        .exclusions()
        .iter()
        .chain(global_exclusions)
        .collect();
    if !exclusions.is_empty() {
        w.open("exclusions", &[]);
        for exclude in exclusions {
            w.open("exclusion", &[])
                .element("groupId", exclude.module_id().group())
                .element("artifactId", exclude.module_id().name())
                .close();
        }
        w.close();
    }
    w.close();
}
