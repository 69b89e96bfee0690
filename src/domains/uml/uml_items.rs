use crate::common::entity::{Entity, EntityUuid};
use crate::common::eref::ERef;
use crate::common::uuid::{ModelUuid, ViewUuid};
use super::uml_models::UmlElement;
use std::sync::Arc;

/// Presentation-layer kind tags, one per tool-palette shape. Grouping rules
/// are registered against these, either exactly or against a base kind.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ItemKind {
    Classifier,
    Class,
    Node,
    Component,
    Subsystem,
    Artifact,
    UseCase,
    Generalization,
    Association,
}

impl ItemKind {
    pub fn base(self) -> Option<ItemKind> {
        match self {
            ItemKind::Subsystem => Some(ItemKind::Component),
            ItemKind::Class
            | ItemKind::Node
            | ItemKind::Component
            | ItemKind::Artifact
            | ItemKind::UseCase => Some(ItemKind::Classifier),
            ItemKind::Classifier
            | ItemKind::Generalization
            | ItemKind::Association => None,
        }
    }

    /// The kind itself followed by its base kinds, most specific first.
    pub fn self_and_bases(self) -> SelfAndBases {
        SelfAndBases(Some(self))
    }
}

pub struct SelfAndBases(Option<ItemKind>);

impl Iterator for SelfAndBases {
    type Item = ItemKind;

    fn next(&mut self) -> Option<ItemKind> {
        let current = self.0.take()?;
        self.0 = current.base();
        Some(current)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A visual proxy referencing at most one model element. Geometry is opaque
/// to the semantic core.
pub struct DiagramItem {
    pub uuid: Arc<ViewUuid>,
    pub kind: ItemKind,
    pub subject: Option<UmlElement>,
    pub bounds: Bounds,
}

impl DiagramItem {
    pub fn new(uuid: ViewUuid, kind: ItemKind, subject: Option<UmlElement>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            kind,
            subject,
            bounds: Bounds::default(),
        }
    }

    pub fn subject_uuid(&self) -> Option<ModelUuid> {
        self.subject.as_ref().map(|e| e.uuid())
    }
}

impl Entity for DiagramItem {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct Diagram {
    pub uuid: Arc<ViewUuid>,
    pub name: Arc<String>,
    pub items: Vec<ERef<DiagramItem>>,
}

impl Diagram {
    pub fn new(uuid: ViewUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            items: Vec::new(),
        }
    }

    pub fn create_item(&mut self, kind: ItemKind, subject: Option<UmlElement>) -> ERef<DiagramItem> {
        let item = ERef::new(DiagramItem::new(ViewUuid::now_v7(), kind, subject));
        self.items.push(item.clone());
        item
    }

    pub fn find_item(&self, uuid: &ViewUuid) -> Option<ERef<DiagramItem>> {
        self.items.iter().find(|i| *i.read().uuid == *uuid).cloned()
    }
}

impl Entity for Diagram {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_chains() {
        assert_eq!(
            ItemKind::Subsystem.self_and_bases().collect::<Vec<_>>(),
            vec![ItemKind::Subsystem, ItemKind::Component, ItemKind::Classifier],
        );
        assert_eq!(
            ItemKind::Node.self_and_bases().collect::<Vec<_>>(),
            vec![ItemKind::Node, ItemKind::Classifier],
        );
        assert_eq!(
            ItemKind::Classifier.self_and_bases().collect::<Vec<_>>(),
            vec![ItemKind::Classifier],
        );
        assert_eq!(
            ItemKind::Association.self_and_bases().collect::<Vec<_>>(),
            vec![ItemKind::Association],
        );
    }

    #[test]
    fn test_diagram_items() {
        let mut d = Diagram::new(uuid::Uuid::nil().into(), "Test".to_owned());
        let item = d.create_item(ItemKind::Node, None);
        let item_uuid = *item.read().uuid;

        assert_eq!(d.items.len(), 1);
        assert!(d.find_item(&item_uuid).is_some());
        assert!(item.read().subject_uuid().is_none());
    }
}
