use std::fmt;

use depot_util::errors::DepotError;

use crate::version::Version;

/// `group:name` identity of a module, version excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId {
    group: String,
    name: String,
}

impl ModuleId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Result<Self, DepotError> {
        let group = group.into().trim().to_string();
        let name = name.into().trim().to_string();
        if group.is_empty() || name.is_empty() {
            return Err(DepotError::Declaration {
                message: format!("module id needs both a group and a name, got '{group}:{name}'"),
            });
        }
        Ok(Self { group, name })
    }

    /// Parse `"group:name"`.
    pub fn parse(s: &str) -> Result<Self, DepotError> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, name] => Self::new(*group, *name),
            _ => Err(DepotError::Declaration {
                message: format!("'{s}' is not a module id, expected group:name"),
            }),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `group` with dots replaced by slashes, as laid out in Maven repositories.
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }

    pub fn with_version(&self, version: impl Into<Version>) -> VersionedModule {
        VersionedModule {
            module_id: self.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// A module at one concrete version: the identity published or resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionedModule {
    module_id: ModuleId,
    version: Version,
}

impl VersionedModule {
    /// Parse `"group:name:version"`.
    pub fn parse(s: &str) -> Result<Self, DepotError> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, name, version] if !version.trim().is_empty() => {
                Ok(ModuleId::new(*group, *name)?.with_version(Version::new(version.trim())))
            }
            _ => Err(DepotError::Declaration {
                message: format!("'{s}' is not a versioned module, expected group:name:version"),
            }),
        }
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for VersionedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_id, self.version)
    }
}
