//! Versioned type identifiers.
//!
//! A type is named by module and type name (`KBaseGenomes.Genome`) and
//! optionally narrowed by a major and minor version
//! (`KBaseGenomes.Genome-8.2`). A [`TypeDefId`] may leave the version open;
//! an [`AbsoluteTypeDefId`] is what the type registry resolves it to.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("bad name regex: {e}"))
});

static TYPE_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^.\-]+)\.([^.\-]+)(?:-(\d+)(?:\.(\d+))?)?$")
        .unwrap_or_else(|e| panic!("bad type string regex: {e}"))
});

/// Errors produced when parsing or building type identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeIdError {
    /// The module or type name contains illegal characters.
    #[error("illegal {part} name '{value}'")]
    IllegalName {
        /// Which part was illegal (`module` or `type`).
        part: &'static str,
        /// The offending value.
        value: String,
    },

    /// The string does not follow `Module.Type[-major[.minor]]`.
    #[error("type string '{0}' does not match Module.Type[-major[.minor]]")]
    Malformed(String),

    /// A version component does not fit in 32 bits.
    #[error("version component '{0}' is out of range")]
    VersionOutOfRange(String),
}

/// A module-qualified type name without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeDefName {
    module: String,
    name: String,
}

impl TypeDefName {
    /// Creates a type name, checking both parts.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeIdError> {
        let module = module.into();
        let name = name.into();
        check_part("module", &module)?;
        check_part("type", &name)?;
        Ok(Self { module, name })
    }

    /// The module the type belongs to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The type's own name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for TypeDefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

impl FromStr for TypeDefName {
    type Err = TypeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, name) = s
            .split_once('.')
            .ok_or_else(|| TypeIdError::Malformed(s.to_string()))?;
        Self::new(module, name)
    }
}

fn check_part(part: &'static str, value: &str) -> Result<(), TypeIdError> {
    if NAME_PART.is_match(value) {
        Ok(())
    } else {
        Err(TypeIdError::IllegalName {
            part,
            value: value.to_string(),
        })
    }
}

/// A type identifier whose version may be partially or wholly unspecified.
///
/// # Example
///
/// ```rust
/// use typedobj::TypeDefId;
///
/// let latest: TypeDefId = "KBaseGenomes.Genome".parse().unwrap();
/// assert_eq!(latest.major(), None);
///
/// let pinned: TypeDefId = "KBaseGenomes.Genome-8.2".parse().unwrap();
/// assert_eq!(pinned.major(), Some(8));
/// assert_eq!(pinned.minor(), Some(2));
/// assert_eq!(pinned.to_string(), "KBaseGenomes.Genome-8.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeDefId {
    name: TypeDefName,
    major: Option<u32>,
    minor: Option<u32>,
}

impl TypeDefId {
    /// A type id resolving to the most recent version.
    pub fn latest(name: TypeDefName) -> Self {
        Self {
            name,
            major: None,
            minor: None,
        }
    }

    /// A type id resolving to the most recent minor version of `major`.
    pub fn with_major(name: TypeDefName, major: u32) -> Self {
        Self {
            name,
            major: Some(major),
            minor: None,
        }
    }

    /// A type id naming one exact version.
    pub fn exact(name: TypeDefName, major: u32, minor: u32) -> Self {
        Self {
            name,
            major: Some(major),
            minor: Some(minor),
        }
    }

    /// The versionless type name.
    pub fn type_name(&self) -> &TypeDefName {
        &self.name
    }

    /// The requested major version, if any.
    pub fn major(&self) -> Option<u32> {
        self.major
    }

    /// The requested minor version, if any.
    pub fn minor(&self) -> Option<u32> {
        self.minor
    }

    /// True when both version components are given.
    pub fn is_absolute(&self) -> bool {
        self.major.is_some() && self.minor.is_some()
    }
}

impl Display for TypeDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(major) = self.major {
            write!(f, "-{}", major)?;
            if let Some(minor) = self.minor {
                write!(f, ".{}", minor)?;
            }
        }
        Ok(())
    }
}

impl FromStr for TypeDefId {
    type Err = TypeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TYPE_STRING
            .captures(s)
            .ok_or_else(|| TypeIdError::Malformed(s.to_string()))?;
        let name = TypeDefName::new(&caps[1], &caps[2])?;
        let major = caps.get(3).map(|m| parse_version(m.as_str())).transpose()?;
        let minor = caps.get(4).map(|m| parse_version(m.as_str())).transpose()?;
        Ok(Self { name, major, minor })
    }
}

impl TryFrom<String> for TypeDefId {
    type Error = TypeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeDefId> for String {
    fn from(id: TypeDefId) -> Self {
        id.to_string()
    }
}

fn parse_version(digits: &str) -> Result<u32, TypeIdError> {
    digits
        .parse()
        .map_err(|_| TypeIdError::VersionOutOfRange(digits.to_string()))
}

/// A fully resolved type identifier: module, name, major and minor version.
///
/// Produced by a [`TypeRegistry`](crate::typedb::TypeRegistry); names exactly
/// one schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbsoluteTypeDefId {
    name: TypeDefName,
    major: u32,
    minor: u32,
}

impl AbsoluteTypeDefId {
    /// Creates an absolute type id.
    pub fn new(name: TypeDefName, major: u32, minor: u32) -> Self {
        Self { name, major, minor }
    }

    /// The versionless type name.
    pub fn type_name(&self) -> &TypeDefName {
        &self.name
    }

    /// The major version.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The minor version.
    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl Display for AbsoluteTypeDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.major, self.minor)
    }
}

impl FromStr for AbsoluteTypeDefId {
    type Err = TypeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: TypeDefId = s.parse()?;
        match (id.major, id.minor) {
            (Some(major), Some(minor)) => Ok(Self::new(id.name, major, minor)),
            _ => Err(TypeIdError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for AbsoluteTypeDefId {
    type Error = TypeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AbsoluteTypeDefId> for String {
    fn from(id: AbsoluteTypeDefId) -> Self {
        id.to_string()
    }
}

impl From<AbsoluteTypeDefId> for TypeDefId {
    fn from(id: AbsoluteTypeDefId) -> Self {
        TypeDefId::exact(id.name, id.major, id.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let id: TypeDefId = "Mod.Type".parse().unwrap();
        assert_eq!((id.major(), id.minor()), (None, None));

        let id: TypeDefId = "Mod.Type-3".parse().unwrap();
        assert_eq!((id.major(), id.minor()), (Some(3), None));
        assert_eq!(id.to_string(), "Mod.Type-3");

        let id: TypeDefId = "Mod.Type-3.1".parse().unwrap();
        assert!(id.is_absolute());
        assert_eq!(id.type_name().module(), "Mod");
        assert_eq!(id.type_name().name(), "Type");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "NoDot".parse::<TypeDefId>(),
            Err(TypeIdError::Malformed(_))
        ));
        assert!(matches!(
            "Mod.Type-".parse::<TypeDefId>(),
            Err(TypeIdError::Malformed(_))
        ));
        assert!(matches!(
            "1Mod.Type".parse::<TypeDefId>(),
            Err(TypeIdError::IllegalName { part: "module", .. })
        ));
        assert!(matches!(
            "Mod.Type-99999999999".parse::<TypeDefId>(),
            Err(TypeIdError::VersionOutOfRange(_))
        ));
    }

    #[test]
    fn test_absolute_requires_both_versions() {
        assert!("Mod.Type-1".parse::<AbsoluteTypeDefId>().is_err());
        let abs: AbsoluteTypeDefId = "Mod.Type-1.0".parse().unwrap();
        assert_eq!(abs.to_string(), "Mod.Type-1.0");
        assert_eq!(TypeDefId::from(abs).to_string(), "Mod.Type-1.0");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let abs: AbsoluteTypeDefId = "Mod.Type-2.4".parse().unwrap();
        let json = serde_json::to_value(&abs).unwrap();
        assert_eq!(json, serde_json::json!("Mod.Type-2.4"));

        let back: AbsoluteTypeDefId = serde_json::from_value(json).unwrap();
        assert_eq!(back, abs);
    }
}
