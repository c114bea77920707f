//! Integration tests for resolving workspace object references in a batch.

use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use typedobj::{
    engine, CompiledSchema, IdRefError, IdReference, IdReferenceRegistry, ObjectReference,
    ObjectResolver, ResolvedObject, WorkspaceIdHandler,
};

/// Resolves from a fixed table and counts lookups.
#[derive(Clone, Default)]
struct Catalog {
    objects: HashMap<String, ResolvedObject>,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl Catalog {
    fn with(mut self, reference: &str, ws: u64, obj: u64, ver: u64, type_string: &str) -> Self {
        self.objects.insert(
            reference.to_string(),
            ResolvedObject {
                workspace_id: ws,
                object_id: obj,
                version: ver,
                type_string: type_string.to_string(),
            },
        );
        self
    }
}

impl ObjectResolver for Catalog {
    fn resolve(
        &self,
        references: &[ObjectReference],
    ) -> Result<HashMap<ObjectReference, ResolvedObject>, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("workspace service unavailable".into());
        }
        Ok(references
            .iter()
            .filter_map(|r| {
                self.objects
                    .get(&r.to_string())
                    .map(|o| (r.clone(), o.clone()))
            })
            .collect())
    }
}

fn catalog() -> Catalog {
    Catalog::default()
        .with("genomes/ecoli", 5, 1, 3, "KBase.Genome-2.1")
        .with("genomes/ecoli/2", 5, 1, 2, "KBase.Genome-2.0")
        .with("12/7", 12, 7, 1, "KBase.Assembly-1.0")
}

fn registry(catalog: Catalog) -> IdReferenceRegistry<String> {
    IdReferenceRegistry::builder(100)
        .handler("ws", WorkspaceIdHandler::new(catalog))
        .build()
}

fn genome_ref(id: &str) -> IdReference {
    IdReference::new("ws", id, vec!["KBase.Genome".to_string()])
}

#[test]
fn test_batch_resolution_uses_one_lookup() {
    let catalog = catalog();
    let calls = Arc::clone(&catalog.calls);
    let mut registry = registry(catalog);

    registry.associate("obj1".to_string());
    registry.add_id(&genome_ref("genomes/ecoli")).unwrap();
    registry.add_id(&genome_ref("genomes/ecoli/2")).unwrap();
    registry.associate("obj2".to_string());
    registry.add_id(&genome_ref("genomes/ecoli")).unwrap();
    registry
        .add_id(&IdReference::new("ws", "12/7", vec!["KBase.Assembly-1.0".to_string()]))
        .unwrap();
    assert_eq!(registry.size(), 4);

    registry.process_ids().unwrap();
    registry.process_ids().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let ws = "ws".into();
    assert_eq!(registry.remapped_id(&ws, "genomes/ecoli").unwrap(), "5/1/3");
    assert_eq!(registry.remapped_id(&ws, "genomes/ecoli/2").unwrap(), "5/1/2");
    assert_eq!(registry.remapped_id(&ws, "12/7").unwrap(), "12/7/1");
}

#[test]
fn test_syntax_checked_on_insertion() {
    let mut registry = registry(catalog());
    registry.associate("obj1".to_string());

    let err = registry.add_id(&genome_ref("not a reference")).unwrap_err();
    let IdRefError::Handler(details) = err else {
        panic!("expected a handler error");
    };
    assert_eq!(details.id(), "not a reference");
    assert_eq!(details.id_type().as_str(), "ws");
    assert_eq!(details.attributes(), ["KBase.Genome".to_string()]);
    assert!(details.associated().contains("obj1"));
    assert!(registry.is_empty());
}

#[test]
fn test_wrong_type_fails_processing_and_stays_locked() {
    let mut registry = registry(catalog());
    registry.associate("obj1".to_string());
    registry.add_id(&genome_ref("12/7")).unwrap();

    let err = registry.process_ids().unwrap_err();
    assert!(err.to_string().contains("KBase.Assembly-1.0"), "{err}");
    assert!(registry.is_locked());
    assert!(!registry.ids_processed());
    assert!(matches!(registry.add_id(&genome_ref("genomes/ecoli")), Err(IdRefError::Locked)));
}

#[test]
fn test_lookup_failure_is_reported_with_cause() {
    let catalog = Catalog {
        fail: true,
        ..catalog()
    };
    let mut registry = registry(catalog);
    registry.associate("obj1".to_string());
    registry.add_id(&genome_ref("genomes/ecoli")).unwrap();

    let err = registry.process_ids().unwrap_err();
    let cause = err.source().map(ToString::to_string);
    assert_eq!(cause.as_deref(), Some("workspace service unavailable"));
}

#[test]
fn test_references_from_a_report() {
    let schema = CompiledSchema::compile(
        "Test.Feature-1.0".parse().unwrap(),
        &json!({
            "type": "object",
            "properties": {
                "genome": {
                    "type": "string",
                    "id-reference": {"id-type": "ws", "attributes": ["KBase.Genome"]}
                }
            }
        })
        .to_string(),
    )
    .unwrap();
    let mut doc = json!({"genome": "genomes/ecoli"});
    let mut report = engine::validate(&doc, &schema, 10).unwrap();

    let mut registry = registry(catalog());
    registry.add_report("feature-1".to_string(), &report).unwrap();
    registry.process_ids().unwrap();

    report.set_absolute_id_references(registry.remap_report(&report).unwrap());
    assert_eq!(report.relabel(&mut doc).unwrap(), 1);
    assert_eq!(doc, json!({"genome": "5/1/3"}));
}
