use crate::common::eref::ERef;
use crate::common::uuid::{ModelUuid, ViewUuid};
use super::uml_factory::ElementFactory;
use super::uml_items::{Diagram, ItemKind};
use super::uml_models::{
    UmlAggregation, UmlAssociation, UmlClass, UmlElement, UmlGeneralization, UmlOperation,
    UmlProperty, UmlVisibility,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, derive_more::From)]
pub enum ImportError {
    Manifest(toml::de::Error),
    StructureError(String),
}

fn default_external_bases() -> Vec<String> {
    ["object", "type", "dict", "list", "tuple", "int", "float"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

/// One batch of reverse-engineered class records. The source-language parser
/// producing these stays outside the core; a record set can also be read
/// from a TOML manifest.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ImportManifest {
    /// Base-class names that belong to the source language runtime and must
    /// not become generalization targets.
    #[serde(default = "default_external_bases")]
    pub external_bases: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ParsedClass>,
}

impl ImportManifest {
    pub fn from_toml(source: &str) -> Result<Self, ImportError> {
        Ok(toml::from_str(source)?)
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ParsedClass {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<ParsedAttribute>,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct ParsedAttribute {
    pub name: String,
    /// Name of the attribute's class type, when the parser could tell. An
    /// attribute with a resolvable type becomes a composite association,
    /// anything else a plain owned property.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub is_static: bool,
}

pub struct ImportOutcome {
    pub diagram: Diagram,
    pub classes: usize,
    pub generalizations: usize,
    pub associations: usize,
    pub attributes: usize,
    pub operations: usize,
}

fn visibility_for(name: &str) -> UmlVisibility {
    if name.starts_with("__") {
        UmlVisibility::Private
    } else if name.starts_with('_') {
        UmlVisibility::Protected
    } else {
        UmlVisibility::Public
    }
}

struct ImportContext<'a> {
    factory: &'a mut ElementFactory,
    diagram: Diagram,
    by_name: HashMap<String, ERef<UmlClass>>,
    root_package: Option<ModelUuid>,
    generalizations: usize,
    associations: usize,
    attributes: usize,
    operations: usize,
}

impl<'a> ImportContext<'a> {
    fn adopt(&mut self, element: UmlElement) -> Result<(), ImportError> {
        self.factory.insert(element).map_err(|e| {
            ImportError::StructureError(format!("duplicate element id {}", e.uuid()))
        })
    }

    fn create_class(&mut self, record: &ParsedClass) -> Result<(), ImportError> {
        if self.by_name.contains_key(&record.name) {
            log::warn!("duplicate class record {}, skipping", record.name);
            return Ok(());
        }
        let mut class = UmlClass::new(ModelUuid::now_v7(), record.name.clone());
        class.namespace = self.root_package;
        let class = ERef::new(class);
        self.adopt(class.clone().into())?;
        self.diagram.create_item(ItemKind::Class, Some(class.clone().into()));
        self.by_name.insert(record.name.clone(), class);
        Ok(())
    }

    /// Resolve a class name among the imported records first, then among
    /// pre-existing classes in the store (which get a diagram item of their
    /// own, so new relationships have something to attach to).
    fn resolve(&mut self, name: &str) -> Option<ERef<UmlClass>> {
        if let Some(class) = self.by_name.get(name) {
            return Some(class.clone());
        }
        let class = self
            .factory
            .select(|e| matches!(e, UmlElement::UmlClass(c) if *c.read().name == name))
            .into_iter()
            .next()
            .and_then(|e| e.as_class())?;
        log::debug!("found pre-existing class {} in the store", name);
        self.diagram.create_item(ItemKind::Class, Some(class.clone().into()));
        self.by_name.insert(name.to_owned(), class.clone());
        Some(class)
    }

    fn create_generalizations(
        &mut self,
        record: &ParsedClass,
        external_bases: &[String],
    ) -> Result<(), ImportError> {
        let Some(specific) = self.by_name.get(&record.name).cloned() else {
            return Ok(());
        };
        for base in &record.bases {
            if external_bases.contains(base) {
                continue;
            }
            let Some(general) = self.resolve(base) else {
                log::debug!("no class named {}, skipping generalization", base);
                continue;
            };
            let generalization = ERef::new(UmlGeneralization::new(
                ModelUuid::now_v7(),
                general,
                specific.clone(),
            ));
            self.adopt(generalization.clone().into())?;
            self.diagram
                .create_item(ItemKind::Generalization, Some(generalization.into()));
            self.generalizations += 1;
        }
        Ok(())
    }

    fn create_attributes(&mut self, record: &ParsedClass) -> Result<(), ImportError> {
        let Some(class) = self.by_name.get(&record.name).cloned() else {
            return Ok(());
        };
        for attr in &record.attributes {
            let tail_type = attr.type_name.as_deref().and_then(|n| self.resolve(n));
            if let Some(tail_type) = tail_type {
                self.create_association(&class, &tail_type, attr)?;
            } else {
                let property = ERef::new(Self::new_property(attr));
                class.write().owned_attribute.push(property.clone());
                self.adopt(property.into())?;
                self.attributes += 1;
            }
        }
        Ok(())
    }

    fn new_property(attr: &ParsedAttribute) -> UmlProperty {
        let mut property = UmlProperty::new(ModelUuid::now_v7(), attr.name.clone());
        property.visibility = visibility_for(&attr.name);
        property.is_static = attr.is_static;
        if attr.many {
            property.multiplicity = Arc::new("0..*".to_owned());
        }
        property
    }

    /// The property on the tail of the association is owned by the class
    /// connected on the head end, and vice versa.
    fn create_association(
        &mut self,
        head_type: &ERef<UmlClass>,
        tail_type: &ERef<UmlClass>,
        attr: &ParsedAttribute,
    ) -> Result<(), ImportError> {
        let mut head_end = UmlProperty::new(ModelUuid::now_v7(), "".to_owned());
        head_end.type_ = Some(head_type.clone().into());
        let head_end = ERef::new(head_end);

        let mut tail_end = Self::new_property(attr);
        tail_end.aggregation = UmlAggregation::Composite;
        tail_end.type_ = Some(tail_type.clone().into());
        let tail_end = ERef::new(tail_end);

        let mut relation = UmlAssociation::new(
            ModelUuid::now_v7(),
            "".to_owned(),
            vec![head_end.clone(), tail_end.clone()],
        );
        relation.namespace = self.root_package;
        let relation = ERef::new(relation);

        head_type.write().owned_attribute.push(tail_end.clone());
        tail_type.write().owned_attribute.push(head_end.clone());

        self.adopt(head_end.into())?;
        self.adopt(tail_end.into())?;
        self.adopt(relation.clone().into())?;
        self.diagram
            .create_item(ItemKind::Association, Some(relation.into()));
        self.associations += 1;
        Ok(())
    }

    fn create_operations(&mut self, record: &ParsedClass) -> Result<(), ImportError> {
        let Some(class) = self.by_name.get(&record.name).cloned() else {
            return Ok(());
        };
        for name in &record.operations {
            let mut operation = UmlOperation::new(ModelUuid::now_v7(), name.clone());
            operation.visibility = visibility_for(name);
            let operation = ERef::new(operation);
            class.write().owned_operation.push(operation.clone());
            self.adopt(operation.into())?;
            self.operations += 1;
        }
        Ok(())
    }
}

/// One-shot import of a reverse-engineered record set. Creates classes,
/// generalizations, attributes/associations and operations in the store,
/// plus a fresh diagram with one item per created element.
pub fn process(
    factory: &mut ElementFactory,
    manifest: &ImportManifest,
) -> Result<ImportOutcome, ImportError> {
    let root_package = factory
        .select(|e| matches!(e, UmlElement::UmlPackage(p) if p.read().namespace.is_none()))
        .into_iter()
        .next()
        .map(|e| e.uuid());

    let mut ctx = ImportContext {
        factory,
        diagram: Diagram::new(ViewUuid::now_v7(), "New classes".to_owned()),
        by_name: HashMap::new(),
        root_package,
        generalizations: 0,
        associations: 0,
        attributes: 0,
        operations: 0,
    };

    for record in &manifest.classes {
        ctx.create_class(record)?;
    }
    for record in &manifest.classes {
        ctx.create_generalizations(record, &manifest.external_bases)?;
    }
    for record in &manifest.classes {
        ctx.create_attributes(record)?;
    }
    for record in &manifest.classes {
        ctx.create_operations(record)?;
    }

    let classes = ctx.by_name.len();
    log::info!(
        "imported {} classes, {} generalizations, {} associations",
        classes,
        ctx.generalizations,
        ctx.associations,
    );
    Ok(ImportOutcome {
        diagram: ctx.diagram,
        classes,
        generalizations: ctx.generalizations,
        associations: ctx.associations,
        attributes: ctx.attributes,
        operations: ctx.operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::uml_models::{UmlElementKind, UmlPackage};

    fn generate_modeluuid(id: u32) -> ModelUuid {
        uuid::Uuid::from_u128(id as u128).into()
    }

    const MANIFEST: &str = r#"
        [[classes]]
        name = "Animal"
        operations = ["speak"]

        [[classes.attributes]]
        name = "_legs"

        [[classes]]
        name = "Dog"
        bases = ["Animal", "object"]

        [[classes.attributes]]
        name = "toys"
        type_name = "Toy"
        many = true

        [[classes]]
        name = "Toy"
    "#;

    #[test]
    fn test_import_classes_and_generalizations() {
        let mut factory = ElementFactory::new();
        let manifest = ImportManifest::from_toml(MANIFEST).unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(outcome.classes, 3);
        // "object" is an external base and never becomes a generalization
        assert_eq!(outcome.generalizations, 1);
        assert_eq!(factory.kindof(UmlElementKind::Class).len(), 3);
        assert_eq!(factory.kindof(UmlElementKind::Generalization).len(), 1);

        let generalization = factory.kindof(UmlElementKind::Generalization)[0].clone();
        let UmlElement::UmlGeneralization(generalization) = generalization else {
            panic!("expected a generalization");
        };
        assert_eq!(*generalization.read().general.read().name, "Animal");
        assert_eq!(*generalization.read().specific.read().name, "Dog");
    }

    #[test]
    fn test_import_attributes_and_associations() {
        let mut factory = ElementFactory::new();
        let manifest = ImportManifest::from_toml(MANIFEST).unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(outcome.associations, 1);
        assert_eq!(outcome.attributes, 1);
        assert_eq!(outcome.operations, 1);

        let animal = factory
            .select(|e| matches!(e, UmlElement::UmlClass(c) if *c.read().name == "Animal"))
            .into_iter().next().and_then(|e| e.as_class()).unwrap();
        assert_eq!(animal.read().owned_attribute.len(), 1);
        let legs = animal.read().owned_attribute[0].clone();
        assert_eq!(*legs.read().name, "_legs");
        assert_eq!(legs.read().visibility, UmlVisibility::Protected);
        assert_eq!(animal.read().owned_operation.len(), 1);

        let dog = factory
            .select(|e| matches!(e, UmlElement::UmlClass(c) if *c.read().name == "Dog"))
            .into_iter().next().and_then(|e| e.as_class()).unwrap();
        let toy = factory
            .select(|e| matches!(e, UmlElement::UmlClass(c) if *c.read().name == "Toy"))
            .into_iter().next().and_then(|e| e.as_class()).unwrap();

        let association = factory.kindof(UmlElementKind::Association)[0].clone();
        let UmlElement::UmlAssociation(association) = association else {
            panic!("expected an association");
        };
        let head_end = association.read().member_end[0].clone();
        let tail_end = association.read().member_end[1].clone();

        assert_eq!(*tail_end.read().name, "toys");
        assert!(tail_end.read().is_composite());
        assert_eq!(*tail_end.read().multiplicity, "0..*");
        assert_eq!(tail_end.read().type_.as_ref().map(|t| t.uuid()), Some(*toy.read().uuid));
        assert_eq!(head_end.read().type_.as_ref().map(|t| t.uuid()), Some(*dog.read().uuid));

        // end ownership is crossed
        assert!(dog.read().owned_attribute.iter().any(|a| *a.read().uuid == *tail_end.read().uuid));
        assert!(toy.read().owned_attribute.iter().any(|a| *a.read().uuid == *head_end.read().uuid));
    }

    #[test]
    fn test_import_diagram_items() {
        let mut factory = ElementFactory::new();
        let manifest = ImportManifest::from_toml(MANIFEST).unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(*outcome.diagram.name, "New classes");
        // 3 classes + 1 generalization + 1 association
        assert_eq!(outcome.diagram.items.len(), 5);
        assert!(outcome.diagram.items.iter().all(|i| i.read().subject.is_some()));
    }

    #[test]
    fn test_import_resolves_pre_existing_classes() {
        let mut factory = ElementFactory::new();
        let base = ERef::new(UmlClass::new(generate_modeluuid(1), "Base".to_owned()));
        factory.insert(base.clone().into()).unwrap();

        let manifest = ImportManifest::from_toml(
            r#"
            [[classes]]
            name = "Sub"
            bases = ["Base"]
            "#,
        )
        .unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(outcome.generalizations, 1);
        // no second "Base" class is created
        assert_eq!(factory.kindof(UmlElementKind::Class).len(), 2);
        // but the pre-existing class gets an item on the new diagram
        assert_eq!(outcome.diagram.items.len(), 3);

        let generalization = factory.kindof(UmlElementKind::Generalization)[0].clone();
        let UmlElement::UmlGeneralization(generalization) = generalization else {
            panic!("expected a generalization");
        };
        assert_eq!(*generalization.read().general.read().uuid, *base.read().uuid);
    }

    #[test]
    fn test_import_skips_unresolvable_bases() {
        let mut factory = ElementFactory::new();
        let manifest = ImportManifest::from_toml(
            r#"
            [[classes]]
            name = "Orphan"
            bases = ["Ghost"]
            "#,
        )
        .unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(outcome.classes, 1);
        assert_eq!(outcome.generalizations, 0);
        assert_eq!(factory.kindof(UmlElementKind::Generalization).len(), 0);
    }

    #[test]
    fn test_import_skips_duplicate_records() {
        let mut factory = ElementFactory::new();
        let manifest = ImportManifest::from_toml(
            r#"
            [[classes]]
            name = "Twin"

            [[classes]]
            name = "Twin"
            "#,
        )
        .unwrap();
        let outcome = process(&mut factory, &manifest).unwrap();

        assert_eq!(outcome.classes, 1);
        assert_eq!(factory.kindof(UmlElementKind::Class).len(), 1);
    }

    #[test]
    fn test_import_uses_root_package_as_namespace() {
        let mut factory = ElementFactory::new();
        let package = ERef::new(UmlPackage::new(generate_modeluuid(1), "root".to_owned()));
        factory.insert(package.clone().into()).unwrap();

        let manifest = ImportManifest::from_toml(
            r#"
            [[classes]]
            name = "Homed"
            "#,
        )
        .unwrap();
        process(&mut factory, &manifest).unwrap();

        let class = factory
            .select(|e| matches!(e, UmlElement::UmlClass(c) if *c.read().name == "Homed"))
            .into_iter().next().and_then(|e| e.as_class()).unwrap();
        assert_eq!(class.read().namespace, Some(*package.read().uuid));
    }

    #[test]
    fn test_visibility_for() {
        assert_eq!(visibility_for("name"), UmlVisibility::Public);
        assert_eq!(visibility_for("_name"), UmlVisibility::Protected);
        assert_eq!(visibility_for("__name"), UmlVisibility::Private);
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(matches!(
            ImportManifest::from_toml("classes = 3"),
            Err(ImportError::Manifest(..)),
        ));
    }
}
