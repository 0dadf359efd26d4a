//! Destination paths inside Maven and Ivy repositories.
//!
//! Maven: `org/example/lib/1.0/lib-1.0-sources.jar`, group dots become
//! slashes. Ivy: token patterns such as
//! `[organisation]/[module]/[type]s/[artifact]-[revision](-[classifier]).[ext]`
//! where a parenthesised group disappears when one of its tokens is empty.

use depot_core::module::{ModuleId, VersionedModule};

pub const MAVEN_METADATA_FILE: &str = "maven-metadata.xml";

pub const DEFAULT_IVY_ARTIFACT_PATTERN: &str =
    "[organisation]/[module]/[type]s/[artifact]-[revision](-[classifier]).[ext]";

pub const DEFAULT_IVY_DESCRIPTOR_PATTERN: &str = "[organisation]/[module]/ivy-[revision].xml";

/// `group/artifact/version/artifact-{file_version}[-classifier].ext`.
///
/// `file_version` is the module version, or the timestamped form for a
/// unique snapshot.
pub fn maven_artifact_path(
    module: &VersionedModule,
    file_version: &str,
    classifier: Option<&str>,
    ext: &str,
) -> String {
    let id = module.module_id();
    let mut path = format!(
        "{}/{}/{}/{}-{}",
        id.group_path(),
        id.name(),
        module.version(),
        id.name(),
        file_version
    );
    if let Some(classifier) = classifier {
        path.push('-');
        path.push_str(classifier);
    }
    path.push('.');
    path.push_str(ext);
    path
}

/// Path of an artifact whose file name carries the plain module version.
pub fn maven_release_path(module: &VersionedModule, classifier: Option<&str>, ext: &str) -> String {
    maven_artifact_path(module, module.version().as_str(), classifier, ext)
}

/// Module-level metadata listing every published version.
pub fn maven_module_metadata_path(module_id: &ModuleId) -> String {
    format!(
        "{}/{}/{MAVEN_METADATA_FILE}",
        module_id.group_path(),
        module_id.name()
    )
}

/// Version-level metadata carrying snapshot timestamps and build numbers.
pub fn maven_version_metadata_path(module: &VersionedModule) -> String {
    let id = module.module_id();
    format!(
        "{}/{}/{}/{MAVEN_METADATA_FILE}",
        id.group_path(),
        id.name(),
        module.version()
    )
}

/// `1.0-SNAPSHOT` with `20240101.120000` and build 3 gives
/// `1.0-20240101.120000-3`. Versions without the snapshot suffix are
/// returned unchanged.
pub fn unique_snapshot_version(version: &str, timestamp: &str, build_number: u32) -> String {
    match version.strip_suffix("-SNAPSHOT") {
        Some(base) => format!("{base}-{timestamp}-{build_number}"),
        None => version.to_string(),
    }
}

/// Values substituted into an Ivy pattern.
#[derive(Debug, Clone, Default)]
pub struct IvyTokens<'a> {
    pub organisation: &'a str,
    pub module: &'a str,
    pub revision: &'a str,
    pub artifact: &'a str,
    pub classifier: Option<&'a str>,
    pub ext: &'a str,
    pub artifact_type: &'a str,
}

impl<'a> IvyTokens<'a> {
    /// Tokens describing `module` itself; artifact name defaults to the module name.
    pub fn of(module: &'a VersionedModule) -> Self {
        Self {
            organisation: module.module_id().group(),
            module: module.module_id().name(),
            revision: module.version().as_str(),
            artifact: module.module_id().name(),
            classifier: None,
            ext: "",
            artifact_type: "",
        }
    }

    pub fn with_file(mut self, ext: &'a str, artifact_type: &'a str, classifier: Option<&'a str>) -> Self {
        self.ext = ext;
        self.artifact_type = artifact_type;
        self.classifier = classifier;
        self
    }

    fn get(&self, token: &str) -> Option<Option<&'a str>> {
        let value = match token {
            "organisation" | "organization" => Some(self.organisation),
            "module" => Some(self.module),
            "revision" => Some(self.revision),
            "artifact" => Some(self.artifact),
            "classifier" => self.classifier,
            "ext" => Some(self.ext),
            "type" => Some(self.artifact_type),
            _ => return None,
        };
        Some(value.filter(|v| !v.is_empty()))
    }
}

/// Expands an Ivy pattern.
pub fn ivy_path(pattern: &str, tokens: &IvyTokens<'_>) -> String {
    let mut out = String::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('(') {
        out.push_str(&replace_tokens(&rest[..start], tokens).0);
        let group = &rest[start + 1..];
        match group.find(')') {
            Some(end) => {
                let (text, complete) = replace_tokens(&group[..end], tokens);
                if complete {
                    out.push_str(&text);
                }
                rest = &group[end + 1..];
            }
            None => {
                out.push_str(&replace_tokens(&rest[start..], tokens).0);
                rest = "";
            }
        }
    }
    out.push_str(&replace_tokens(rest, tokens).0);
    out
}

/// Returns the expanded text and whether every known token had a value.
/// Unknown tokens are kept literally.
fn replace_tokens(segment: &str, tokens: &IvyTokens<'_>) -> (String, bool) {
    let mut out = String::new();
    let mut complete = true;
    let mut rest = segment;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            out.push_str(&rest[open..]);
            return (out, complete);
        };
        let name = &after[..close];
        match tokens.get(name) {
            Some(Some(value)) => out.push_str(value),
            Some(None) => complete = false,
            None => {
                out.push('[');
                out.push_str(name);
                out.push(']');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    (out, complete)
}
