//! `maven-metadata.xml`, at module level (version listing) and at version
//! level (snapshot timestamps and build numbers).

use depot_core::module::{ModuleId, VersionedModule};
use depot_core::version::Version;
use depot_util::errors::{DepotError, DepotResult};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::layout::unique_snapshot_version;
use crate::xml::XmlWriter;

const MODEL_VERSION: &str = "1.1.0";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MavenMetadata {
    pub model_version: Option<String>,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub versioning: Versioning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioning {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub versions: Vec<String>,
    pub snapshot_versions: Vec<SnapshotVersion>,
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// `yyyyMMdd.HHmmss`, UTC.
    pub timestamp: String,
    pub build_number: u32,
}

/// One file produced for a unique snapshot build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: String,
    pub value: String,
    pub updated: Option<String>,
}

impl MavenMetadata {
    /// Fresh module-level metadata with no versions.
    pub fn for_module(module_id: &ModuleId) -> Self {
        Self {
            model_version: Some(MODEL_VERSION.to_string()),
            group_id: Some(module_id.group().to_string()),
            artifact_id: Some(module_id.name().to_string()),
            version: None,
            versioning: Versioning::default(),
        }
    }

    /// Fresh version-level metadata for a snapshot, build number 0.
    pub fn for_snapshot(module: &VersionedModule, timestamp: &str) -> Self {
        let mut metadata = Self::for_module(module.module_id());
        metadata.version = Some(module.version().to_string());
        metadata.versioning.snapshot = Some(Snapshot {
            timestamp: timestamp.to_string(),
            build_number: 0,
        });
        metadata
    }

    pub fn current_build_number(&self) -> u32 {
        self.versioning
            .snapshot
            .as_ref()
            .map_or(0, |s| s.build_number)
    }

    /// Starts a new snapshot build: increments the build number, stamps it
    /// with `timestamp` and forgets the files of the previous build.
    pub fn update_snapshot(&mut self, timestamp: &str) {
        let build_number = self.current_build_number() + 1;
        self.versioning.snapshot = Some(Snapshot {
            timestamp: timestamp.to_string(),
            build_number,
        });
        self.versioning.last_update = Some(timestamp.replace('.', ""));
        self.versioning.snapshot_versions.clear();
    }

    /// `1.0-20240101.120000-3` for the current snapshot build of `1.0-SNAPSHOT`.
    pub fn unique_version(&self) -> Option<String> {
        let version = self.version.as_deref()?;
        let snapshot = self.versioning.snapshot.as_ref()?;
        Some(unique_snapshot_version(
            version,
            &snapshot.timestamp,
            snapshot.build_number,
        ))
    }

    /// Records a file of the current snapshot build.
    pub fn add_snapshot_version(&mut self, extension: &str, classifier: Option<&str>) {
        let Some(value) = self.unique_version() else {
            return;
        };
        self.versioning.snapshot_versions.push(SnapshotVersion {
            classifier: classifier.map(str::to_string),
            extension: extension.to_string(),
            value,
            updated: self.versioning.last_update.clone(),
        });
    }

    /// Lists `version`, which becomes `latest` (and `release` unless it is a
    /// snapshot). `last_update` is refreshed even when already listed.
    pub fn add_version(&mut self, version: &str, last_update: &str) {
        let versioning = &mut self.versioning;
        if !versioning.versions.iter().any(|v| v == version) {
            versioning.versions.push(version.to_string());
            versioning
                .versions
                .sort_by(|a, b| Version::from(a.as_str()).cmp(&Version::from(b.as_str())));
            versioning.latest = Some(version.to_string());
            if !version.ends_with("-SNAPSHOT") {
                versioning.release = Some(version.to_string());
            }
        }
        versioning.last_update = Some(last_update.to_string());
    }

    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        match &self.model_version {
            Some(model) => w.open("metadata", &[("modelVersion", model.as_str())]),
            None => w.open("metadata", &[]),
        };
        w.optional("groupId", self.group_id.as_deref())
            .optional("artifactId", self.artifact_id.as_deref())
            .optional("version", self.version.as_deref());

        let v = &self.versioning;
        w.open("versioning", &[]);
        w.optional("latest", v.latest.as_deref());
        if let Some(snapshot) = &v.snapshot {
            w.open("snapshot", &[])
                .element("timestamp", &snapshot.timestamp)
                .element("buildNumber", &snapshot.build_number.to_string())
                .close();
        }
        w.optional("release", v.release.as_deref());
        if !v.versions.is_empty() {
            w.open("versions", &[]);
            for version in &v.versions {
                w.element("version", version);
            }
            w.close();
        }
        if !v.snapshot_versions.is_empty() {
            w.open("snapshotVersions", &[]);
            for sv in &v.snapshot_versions {
                w.open("snapshotVersion", &[])
                    .optional("classifier", sv.classifier.as_deref())
                    .element("extension", &sv.extension)
                    .optional("updated", sv.updated.as_deref())
                    .element("value", &sv.value)
                    .close();
            }
            w.close();
        }
        w.optional("lastUpdate", v.last_update.as_deref());
        w.finish()
    }

    /// Accepts both `lastUpdate` and the standard `lastUpdated`.
    pub fn parse(xml: &str) -> DepotResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut meta = MavenMetadata::default();
        let mut path: Vec<String> = Vec::new();
        let mut text_buf = String::new();
        let mut snapshot_timestamp: Option<String> = None;
        let mut snapshot_build: Option<u32> = None;
        let mut current_sv: Option<SnapshotVersion> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                    text_buf.clear();
                    let ctx = path.join(">");
                    if ctx == "metadata" {
                        if let Ok(Some(attr)) = e.try_get_attribute("modelVersion") {
                            meta.model_version = attr.unescape_value().ok().map(|v| v.to_string());
                        }
                    } else if ctx == "metadata>versioning>snapshotVersions>snapshotVersion" {
                        current_sv = Some(SnapshotVersion::default());
                    }
                }
                Ok(Event::Text(ref e)) => {
                    text_buf = e.unescape().unwrap_or_default().to_string();
                }
                Ok(Event::End(_)) => {
                    let ctx = path.join(">");
                    let text = std::mem::take(&mut text_buf);
                    match ctx.as_str() {
                        "metadata>groupId" => meta.group_id = Some(text),
                        "metadata>artifactId" => meta.artifact_id = Some(text),
                        "metadata>version" => meta.version = Some(text),
                        "metadata>versioning>latest" => meta.versioning.latest = Some(text),
                        "metadata>versioning>release" => meta.versioning.release = Some(text),
                        "metadata>versioning>versions>version" => {
                            meta.versioning.versions.push(text);
                        }
                        "metadata>versioning>lastUpdate" | "metadata>versioning>lastUpdated" => {
                            meta.versioning.last_update = Some(text);
                        }
                        "metadata>versioning>snapshot>timestamp" => {
                            snapshot_timestamp = Some(text);
                        }
                        "metadata>versioning>snapshot>buildNumber" => {
                            snapshot_build = text.trim().parse().ok();
                        }
                        "metadata>versioning>snapshotVersions>snapshotVersion" => {
                            if let Some(sv) = current_sv.take() {
                                meta.versioning.snapshot_versions.push(sv);
                            }
                        }
                        _ => {
                            if let Some(sv) = current_sv.as_mut() {
                                match path.last().map(String::as_str) {
                                    Some("classifier") => sv.classifier = Some(text),
                                    Some("extension") => sv.extension = text,
                                    Some("value") => sv.value = text,
                                    Some("updated") => sv.updated = Some(text),
                                    _ => {}
                                }
                            }
                        }
                    }
                    path.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DepotError::Generic {
                        message: format!("Failed to parse maven-metadata.xml: {e}"),
                    }
                    .into());
                }
                _ => {}
            }
        }

        if let Some(timestamp) = snapshot_timestamp {
            meta.versioning.snapshot = Some(Snapshot {
                timestamp,
                build_number: snapshot_build.unwrap_or(0),
            });
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_artifact_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>io.netty</groupId>
  <artifactId>netty-buffer</artifactId>
  <versioning>
    <latest>1.8.0</latest>
    <release>1.8.0</release>
    <versions>
      <version>1.6.0</version>
      <version>1.7.0</version>
      <version>1.7.3</version>
      <version>1.8.0</version>
    </versions>
    <lastUpdated>20240101120000</lastUpdated>
  </versioning>
</metadata>"#;
        let meta = MavenMetadata::parse(xml).unwrap();
        assert_eq!(meta.group_id.as_deref(), Some("io.netty"));
        assert_eq!(meta.versioning.latest.as_deref(), Some("1.8.0"));
        assert_eq!(meta.versioning.versions.len(), 4);
        assert_eq!(meta.versioning.last_update.as_deref(), Some("20240101120000"));
    }

    #[test]
    fn parse_snapshot_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>com.example</groupId>
  <artifactId>my-lib</artifactId>
  <version>1.0-SNAPSHOT</version>
  <versioning>
    <snapshot>
      <timestamp>20240615.143022</timestamp>
      <buildNumber>42</buildNumber>
    </snapshot>
    <snapshotVersions>
      <snapshotVersion>
        <classifier>sources</classifier>
        <extension>jar</extension>
        <value>1.0-20240615.143022-42</value>
        <updated>20240615143022</updated>
      </snapshotVersion>
    </snapshotVersions>
    <lastUpdate>20240615143022</lastUpdate>
  </versioning>
</metadata>"#;
        let meta = MavenMetadata::parse(xml).unwrap();
        assert_eq!(meta.model_version.as_deref(), Some("1.1.0"));
        assert_eq!(meta.current_build_number(), 42);
        assert_eq!(meta.unique_version().as_deref(), Some("1.0-20240615.143022-42"));
        assert_eq!(meta.versioning.snapshot_versions.len(), 1);
        assert_eq!(
            meta.versioning.snapshot_versions[0].classifier.as_deref(),
            Some("sources")
        );
    }

    #[test]
    fn snapshot_build_numbers_increment() {
        let module = VersionedModule::parse("g:a:1.0-SNAPSHOT").unwrap();
        let mut meta = MavenMetadata::for_snapshot(&module, "20240101.000000");
        meta.update_snapshot("20240101.120000");
        assert_eq!(meta.current_build_number(), 1);
        meta.add_snapshot_version("jar", None);

        let mut reread = MavenMetadata::parse(&meta.to_xml()).unwrap();
        assert_eq!(reread, meta);
        reread.update_snapshot("20240102.080000");
        assert_eq!(reread.current_build_number(), 2);
        assert!(reread.versioning.snapshot_versions.is_empty());
        assert_eq!(reread.versioning.last_update.as_deref(), Some("20240102080000"));
    }

    #[test]
    fn add_version_orders_and_tracks_release() {
        let mut meta = MavenMetadata::for_module(&ModuleId::parse("g:a").unwrap());
        meta.add_version("1.10", "1");
        meta.add_version("1.9", "2");
        meta.add_version("2.0-SNAPSHOT", "3");
        assert_eq!(meta.versioning.versions, vec!["1.9", "1.10", "2.0-SNAPSHOT"]);
        assert_eq!(meta.versioning.latest.as_deref(), Some("2.0-SNAPSHOT"));
        assert_eq!(meta.versioning.release.as_deref(), Some("1.9"));
        meta.add_version("1.9", "4");
        assert_eq!(meta.versioning.versions.len(), 3);
        assert_eq!(meta.versioning.last_update.as_deref(), Some("4"));
    }

    #[test]
    fn written_layout() {
        let mut meta = MavenMetadata::for_module(&ModuleId::parse("g:a").unwrap());
        meta.add_version("1.0", "20240101120000");
        let xml = meta.to_xml();
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>g</groupId>
  <artifactId>a</artifactId>
  <versioning>
    <latest>1.0</latest>
    <release>1.0</release>
    <versions>
      <version>1.0</version>
    </versions>
    <lastUpdate>20240101120000</lastUpdate>
  </versioning>
</metadata>
"#;
        assert_eq!(xml, expected);
    }
}
