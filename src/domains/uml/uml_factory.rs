use crate::common::entity::Entity;
use crate::common::uuid::ModelUuid;
use super::uml_models::{UmlElement, UmlElementKind};

/// The element graph store of one editing session. Owns every metamodel
/// element from insertion until explicit removal; there is no implicit
/// cascading deletion. Passed explicitly wherever elements are created or
/// destroyed, one factory per session.
pub struct ElementFactory {
    // insertion-ordered so that select() results are stable
    elements: Vec<UmlElement>,
}

impl ElementFactory {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn insert(&mut self, element: UmlElement) -> Result<(), UmlElement> {
        if self.contains(&element.uuid()) {
            return Err(element);
        }
        log::trace!("factory: insert {:?}", element.tagged_uuid());
        self.elements.push(element);
        Ok(())
    }

    pub fn remove(&mut self, uuid: &ModelUuid) -> Option<UmlElement> {
        let idx = self.elements.iter().position(|e| e.uuid() == *uuid)?;
        log::trace!("factory: remove {}", uuid);
        Some(self.elements.remove(idx))
    }

    pub fn get(&self, uuid: &ModelUuid) -> Option<UmlElement> {
        self.elements.iter().find(|e| e.uuid() == *uuid).cloned()
    }

    pub fn contains(&self, uuid: &ModelUuid) -> bool {
        self.elements.iter().any(|e| e.uuid() == *uuid)
    }

    pub fn select(&self, predicate: impl Fn(&UmlElement) -> bool) -> Vec<UmlElement> {
        self.elements.iter().filter(|e| predicate(e)).cloned().collect()
    }

    pub fn kindof(&self, kind: UmlElementKind) -> Vec<UmlElement> {
        self.select(|e| e.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UmlElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::eref::ERef;
    use super::super::uml_models::{UmlArtifact, UmlNode};

    fn generate_modeluuid(id: u32) -> ModelUuid {
        uuid::Uuid::from_u128(id as u128).into()
    }

    fn new_node(id: u32, name: &str) -> UmlElement {
        ERef::new(UmlNode::new(generate_modeluuid(id), name.to_owned())).into()
    }

    fn new_artifact(id: u32, name: &str) -> UmlElement {
        ERef::new(UmlArtifact::new(generate_modeluuid(id), name.to_owned())).into()
    }

    #[test]
    fn test_insert_and_get() {
        let mut factory = ElementFactory::new();
        assert!(factory.insert(new_node(1, "n1")).is_ok());
        assert!(factory.insert(new_artifact(2, "a1")).is_ok());

        assert_eq!(factory.len(), 2);
        assert!(factory.contains(&generate_modeluuid(1)));
        assert!(factory.get(&generate_modeluuid(2)).is_some());
        assert!(factory.get(&generate_modeluuid(3)).is_none());
    }

    #[test]
    fn test_insert_duplicate_is_rejected() {
        let mut factory = ElementFactory::new();
        assert!(factory.insert(new_node(1, "n1")).is_ok());

        let rejected = factory.insert(new_node(1, "other"));
        assert!(rejected.is_err());
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut factory = ElementFactory::new();
        factory.insert(new_node(1, "n1")).unwrap();

        assert!(factory.remove(&generate_modeluuid(1)).is_some());
        assert!(factory.remove(&generate_modeluuid(1)).is_none());
        assert!(factory.is_empty());
    }

    #[test]
    fn test_select_preserves_insertion_order() {
        let mut factory = ElementFactory::new();
        factory.insert(new_node(1, "n1")).unwrap();
        factory.insert(new_artifact(2, "a1")).unwrap();
        factory.insert(new_node(3, "n2")).unwrap();

        let nodes = factory.kindof(UmlElementKind::Node);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].uuid(), generate_modeluuid(1));
        assert_eq!(nodes[1].uuid(), generate_modeluuid(3));
        assert_eq!(factory.kindof(UmlElementKind::Artifact).len(), 1);
        assert_eq!(factory.kindof(UmlElementKind::Deployment).len(), 0);
    }
}
