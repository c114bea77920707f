//! Handler for workspace object references.
//!
//! A reference names a workspace and an object in it, optionally with a
//! version: `MyWorkspace/MyObject`, `12/7/3`. At processing time every
//! distinct reference in the batch is handed to an [`ObjectResolver`] at
//! once; the resolved objects' types are checked against the attributes the
//! schema attached to the field (the type names the reference may point to),
//! and each reference is remapped to its absolute `wsid/objid/ver` form.

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::{IdRefError, IdReferenceHandler, IdReferenceHandlerError, IdReferenceType};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w.|\-]+)/([\w.|\-]+)(?:/(\d+))?$")
        .unwrap_or_else(|e| panic!("bad reference regex: {e}"))
});

/// A parsed, not yet resolved, workspace object reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectReference {
    workspace: String,
    object: String,
    version: Option<u64>,
}

impl ObjectReference {
    /// The workspace name or numeric id.
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    /// The object name or numeric id.
    pub fn object(&self) -> &str {
        &self.object
    }

    /// The requested version; `None` means the latest.
    pub fn version(&self) -> Option<u64> {
        self.version
    }
}

impl Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workspace, self.object)?;
        if let Some(version) = self.version {
            write!(f, "/{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = REFERENCE
            .captures(s)
            .ok_or_else(|| format!("illegal object reference '{s}'"))?;
        let version = caps
            .get(3)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map_err(|_| format!("version in '{s}' is out of range"))?;
        if version == Some(0) {
            return Err(format!("object versions start at 1 in '{s}'"));
        }
        Ok(Self {
            workspace: caps[1].to_string(),
            object: caps[2].to_string(),
            version,
        })
    }
}

/// What a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    /// Numeric workspace id.
    pub workspace_id: u64,
    /// Numeric object id.
    pub object_id: u64,
    /// Concrete version.
    pub version: u64,
    /// The object's absolute type, e.g. `Mod.Genome-3.1`.
    pub type_string: String,
}

impl ResolvedObject {
    /// The absolute `wsid/objid/ver` form.
    pub fn absolute_reference(&self) -> String {
        format!("{}/{}/{}", self.workspace_id, self.object_id, self.version)
    }

    fn matches_type(&self, allowed: &[String]) -> bool {
        if allowed.is_empty() {
            return true;
        }
        let versionless = self
            .type_string
            .split_once('-')
            .map_or(self.type_string.as_str(), |(name, _)| name);
        allowed
            .iter()
            .any(|t| t == &self.type_string || t == versionless)
    }
}

/// Batch lookup of workspace objects.
pub trait ObjectResolver: Send {
    /// Resolves every reference in one call.
    ///
    /// References missing from the returned map are treated as nonexistent.
    ///
    /// # Errors
    ///
    /// A failure of the lookup as a whole.
    fn resolve(
        &self,
        references: &[ObjectReference],
    ) -> Result<HashMap<ObjectReference, ResolvedObject>, Box<dyn Error + Send + Sync>>;
}

/// One distinct identifier with the first carrier and attributes seen for it.
struct Pending<T> {
    reference: ObjectReference,
    associated: T,
    attributes: Vec<String>,
}

/// [`IdReferenceHandler`] for workspace object references.
pub struct WorkspaceIdHandler<T, R> {
    resolver: R,
    seen: HashSet<(T, String)>,
    pending: IndexMap<String, Vec<Pending<T>>>,
    remapped: HashMap<String, String>,
    locked: bool,
}

impl<T, R> WorkspaceIdHandler<T, R> {
    /// Creates a handler resolving through `resolver`.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            seen: HashSet::new(),
            pending: IndexMap::new(),
            remapped: HashMap::new(),
            locked: false,
        }
    }
}

impl<T, R> IdReferenceHandler<T> for WorkspaceIdHandler<T, R>
where
    T: Clone + Eq + Hash + Debug + Send,
    R: ObjectResolver,
{
    fn add_id(&mut self, associated: &T, id: &str, attributes: &[String]) -> Result<bool, IdRefError> {
        if self.locked {
            return Err(IdRefError::HandlerLocked(IdReferenceType::workspace()));
        }
        let reference: ObjectReference = id.parse().map_err(|message: String| {
            IdReferenceHandlerError::new(
                message,
                IdReferenceType::workspace(),
                format!("{associated:?}"),
                id,
                attributes,
            )
        })?;

        let key = (associated.clone(), id.to_string());
        if self.seen.contains(&key) {
            return Ok(false);
        }
        self.seen.insert(key);
        self.pending.entry(id.to_string()).or_default().push(Pending {
            reference,
            associated: associated.clone(),
            attributes: attributes.to_vec(),
        });
        Ok(true)
    }

    fn contains(&self, associated: &T, id: &str) -> bool {
        self.seen.contains(&(associated.clone(), id.to_string()))
    }

    fn process_ids(&mut self) -> Result<(), IdRefError> {
        let references: Vec<ObjectReference> = self
            .pending
            .values()
            .filter_map(|entries| entries.first().map(|p| p.reference.clone()))
            .collect();
        tracing::debug!(count = references.len(), "resolving workspace references");

        let resolved = self.resolver.resolve(&references).map_err(|e| {
            let first = self.pending.values().flatten().next();
            IdReferenceHandlerError::new(
                "workspace reference lookup failed",
                IdReferenceType::workspace(),
                first.map(|p| format!("{:?}", p.associated)).unwrap_or_default(),
                first.map(|p| p.reference.to_string()).unwrap_or_default(),
                first.map(|p| p.attributes.as_slice()).unwrap_or_default(),
            )
            .with_source(e)
        })?;

        let mut remapped = HashMap::with_capacity(self.pending.len());
        for (id, entries) in &self.pending {
            for entry in entries {
                let fail = |message: String| {
                    IdReferenceHandlerError::new(
                        message,
                        IdReferenceType::workspace(),
                        format!("{:?}", entry.associated),
                        id.as_str(),
                        &entry.attributes,
                    )
                };
                let object = resolved
                    .get(&entry.reference)
                    .ok_or_else(|| fail(format!("no object found for reference {id}")))?;
                if !object.matches_type(&entry.attributes) {
                    return Err(fail(format!(
                        "object {id} has type {}, which is not one of the allowed types",
                        object.type_string
                    ))
                    .into());
                }
                remapped.insert(id.clone(), object.absolute_reference());
            }
        }
        self.remapped = remapped;
        Ok(())
    }

    fn remapped_id(&self, old_id: &str) -> Result<String, IdRefError> {
        self.remapped
            .get(old_id)
            .cloned()
            .ok_or_else(|| IdRefError::NoSuchId {
                id_type: IdReferenceType::workspace(),
                id: old_id.to_string(),
            })
    }

    fn lock(&mut self) {
        self.locked = true;
    }
}
