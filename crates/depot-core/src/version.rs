//! Versions and version ranges.
//!
//! Versions follow Maven ordering, which differs from semver:
//! - Segments are split on `.` and `-`
//! - Numeric segments compare as numbers
//! - String qualifiers have a special ordering:
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`
//! - SNAPSHOT versions sort before their release equivalent
//!
//! A [`VersionRange`] is what a dependency declares. It is either
//! unspecified, static (`1.2`), a snapshot (`1.2-SNAPSHOT`, dynamic but not
//! resolvable to a fixed version) or dynamic-resolvable (`1.+`, `[1.0,2.0[`,
//! `latest.release`).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use depot_util::errors::DepotError;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// A concrete version with Maven comparison semantics.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    segments: Vec<Segment>,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    /// Consistent with the Maven equality: trailing `0`/release segments and
    /// text case are ignored.
    fn hash<H: Hasher>(&self, state: &mut H) {
        let significant = self
            .segments
            .iter()
            .rposition(|s| compare_segment_to_empty(s) != Ordering::Equal)
            .map_or(0, |i| i + 1);
        for segment in &self.segments[..significant] {
            match segment {
                Segment::Numeric(n) => (0u8, *n).hash(state),
                Segment::Qualifier(q) => (1u8, *q as u8).hash(state),
                Segment::Text(t) => (2u8, t.to_lowercase()).hash(state),
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known Maven qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        let original = version.into();
        let segments = parse_segments(&original);
        Self { original, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with(SNAPSHOT_SUFFIX)
    }

    /// The version without the `-SNAPSHOT` suffix.
    pub fn base_version(&self) -> &str {
        self.original
            .strip_suffix(SNAPSHOT_SUFFIX)
            .unwrap_or(&self.original)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(0) => Ordering::Equal,
        Segment::Numeric(_) => Ordering::Greater,
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) => a.cmp(b),
        (Segment::Numeric(_), _) => Ordering::Greater,
        (_, Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Segment::Qualifier(q), Segment::Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Segment::Text(_), Segment::Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(classify)
        .collect()
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

/// A declared version: static, snapshot, dynamic or unspecified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionRange {
    definition: Option<String>,
}

impl VersionRange {
    /// No version declared; expected to come from a version provider.
    pub fn unspecified() -> Self {
        Self { definition: None }
    }

    /// Parse a declared range. Blank definitions are rejected.
    pub fn of(definition: &str) -> Result<Self, DepotError> {
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(DepotError::Declaration {
                message: "version range cannot be blank".to_string(),
            });
        }
        Ok(Self {
            definition: Some(definition.to_string()),
        })
    }

    /// `"unspecified"` when nothing is declared.
    pub fn as_str(&self) -> &str {
        self.definition.as_deref().unwrap_or("unspecified")
    }

    pub fn is_unspecified(&self) -> bool {
        self.definition.is_none()
    }

    pub fn is_snapshot(&self) -> bool {
        self.definition
            .as_deref()
            .is_some_and(|d| d.ends_with(SNAPSHOT_SUFFIX))
    }

    /// Snapshot or dynamic-resolvable.
    pub fn is_dynamic(&self) -> bool {
        self.is_snapshot() || self.is_dynamic_and_resolvable()
    }

    /// Ranges a resolver can turn into one concrete version.
    pub fn is_dynamic_and_resolvable(&self) -> bool {
        let Some(d) = self.definition.as_deref() else {
            return false;
        };
        d.ends_with('+')
            || d.starts_with("latest.")
            || (d.starts_with(['[', '(', ']']) && d.ends_with([']', ')', '[']))
    }

    /// The concrete version this range designates, if it is static.
    pub fn to_version(&self) -> Option<Version> {
        match &self.definition {
            Some(d) if !self.is_dynamic_and_resolvable() => Some(Version::new(d.as_str())),
            _ => None,
        }
    }

    /// Whether `version` satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        let Some(d) = self.definition.as_deref() else {
            return true;
        };
        if let Some(prefix) = d.strip_suffix('+') {
            return version.as_str().starts_with(prefix);
        }
        match d {
            "latest.integration" => return true,
            "latest.release" => return !version.is_snapshot(),
            _ => {}
        }
        if let Some(interval) = Interval::parse(d) {
            return interval.contains(version);
        }
        Version::new(d) == *version
    }

    /// Highest candidate satisfying this range.
    pub fn select<'a>(&self, candidates: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
        candidates.into_iter().filter(|v| self.contains(v)).max()
    }
}

impl From<Version> for VersionRange {
    fn from(version: Version) -> Self {
        Self {
            definition: Some(version.original),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bracketed interval such as `[1.0,2.0)`, `[1.0,2.0[`, `]1.0,]` or `[1.5]`.
#[derive(Debug, Clone)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

#[derive(Debug, Clone)]
struct Bound {
    version: Version,
    inclusive: bool,
}

impl Interval {
    fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        if s.len() < 2 || !s.starts_with(['[', '(', ']']) || !s.ends_with([']', ')', '[']) {
            return None;
        }
        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: Version::new(text),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lower, upper)) => Some(Interval {
                lower: bound(lower, open_inclusive),
                upper: bound(upper, close_inclusive),
            }),
            None => Some(Interval {
                lower: bound(inner, true),
                upper: bound(inner, true),
            }),
        }
    }

    fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            match version.cmp(&lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(ref upper) = self.upper {
            match version.cmp(&upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}
