use crate::common::entity::Entity;
use crate::common::eref::ERef;
use crate::common::uuid::ModelUuid;
use super::uml_factory::ElementFactory;
use super::uml_items::{DiagramItem, ItemKind};
use super::uml_models::{
    UmlAggregation, UmlComponent, UmlConnector, UmlConnectorEnd, UmlDeployment, UmlElement,
    UmlNode, UmlProperty,
};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupingError {
    /// No rule is registered for the kind pair. Not fatal: the interaction
    /// layer uses it to suppress the drop affordance.
    NoApplicableRule { parent: ItemKind, child: ItemKind },
    /// A rule rejected the pair; carries the reason for diagnostics.
    PreconditionFailed(String),
    /// Ungroup was invoked for a pair that is not currently grouped.
    NotGrouped,
}

/// Records exactly what one `group` call created or linked, so that
/// `ungroup` can reverse it without re-deriving anything from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupingHandle {
    NestedNode {
        parent: ModelUuid,
        child: ModelUuid,
    },
    Composition {
        parent: ModelUuid,
        child: ModelUuid,
        parent_attribute: ModelUuid,
        child_attribute: ModelUuid,
        connector: ModelUuid,
        connector_ends: [ModelUuid; 2],
    },
    Deployment {
        parent: ModelUuid,
        child: ModelUuid,
        deployment: ModelUuid,
    },
    SubsystemMembership {
        subsystem: ModelUuid,
        use_case: ModelUuid,
    },
}

impl GroupingHandle {
    pub fn parent_subject(&self) -> ModelUuid {
        match self {
            GroupingHandle::NestedNode { parent, .. } => *parent,
            GroupingHandle::Composition { parent, .. } => *parent,
            GroupingHandle::Deployment { parent, .. } => *parent,
            GroupingHandle::SubsystemMembership { subsystem, .. } => *subsystem,
        }
    }

    pub fn child_subject(&self) -> ModelUuid {
        match self {
            GroupingHandle::NestedNode { child, .. } => *child,
            GroupingHandle::Composition { child, .. } => *child,
            GroupingHandle::Deployment { child, .. } => *child,
            GroupingHandle::SubsystemMembership { use_case, .. } => *use_case,
        }
    }

    /// Elements created by the `group` call, for the interaction layer to
    /// refresh affected visuals. Membership-only groupings create none.
    pub fn created(&self) -> Vec<ModelUuid> {
        match self {
            GroupingHandle::NestedNode { .. } => vec![],
            GroupingHandle::Composition {
                parent_attribute,
                child_attribute,
                connector,
                connector_ends,
                ..
            } => vec![
                *parent_attribute,
                *child_attribute,
                *connector,
                connector_ends[0],
                connector_ends[1],
            ],
            GroupingHandle::Deployment { deployment, .. } => vec![*deployment],
            GroupingHandle::SubsystemMembership { .. } => vec![],
        }
    }
}

/// One metamodel transformation per legal parent/child kind pair.
pub trait GroupingRule {
    /// Side-effect-free precondition; the error carries the rejection
    /// reason for diagnostics.
    fn check(
        &self,
        factory: &ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<(), String>;

    fn can_group(&self, factory: &ElementFactory, parent: &DiagramItem, child: &DiagramItem) -> bool {
        self.check(factory, parent, child).is_ok()
    }

    fn group(
        &self,
        factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError>;

    fn ungroup(
        &self,
        factory: &mut ElementFactory,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError>;
}

fn node_subject(item: &DiagramItem) -> Option<ERef<UmlNode>> {
    item.subject.as_ref().and_then(UmlElement::as_node)
}

fn component_subject(item: &DiagramItem) -> Option<ERef<UmlComponent>> {
    item.subject.as_ref().and_then(UmlElement::as_component)
}

fn insert_new(factory: &mut ElementFactory, element: UmlElement) {
    let unique = factory.insert(element).is_ok();
    debug_assert!(unique, "freshly created element id already present in the store");
}

/// Whether `needle` is reachable from `node` through `nested_node`.
fn nests_transitively(node: &ERef<UmlNode>, needle: ModelUuid) -> bool {
    fn walk(visited: &mut HashSet<ModelUuid>, node: &ERef<UmlNode>, needle: ModelUuid) -> bool {
        if !visited.insert(*node.read().uuid) {
            return false;
        }
        node.read()
            .nested_node
            .iter()
            .any(|n| *n.read().uuid == needle || walk(visited, n, needle))
    }

    walk(&mut HashSet::new(), node, needle)
}

/// Node within node composition: the child node is appended to the parent's
/// `nested_node` collection. Containment stays directed.
pub struct NodeGroup;

impl GroupingRule for NodeGroup {
    fn check(
        &self,
        _factory: &ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<(), String> {
        let parent_node = node_subject(parent).ok_or("parent item has no node subject")?;
        let child_node = node_subject(child).ok_or("child item has no node subject")?;

        if *parent_node.read().uuid == *child_node.read().uuid {
            return Err("a node cannot be nested within itself".to_owned());
        }
        if parent_node
            .read()
            .nested_node
            .iter()
            .any(|n| *n.read().uuid == *child_node.read().uuid)
        {
            return Err("child node is already nested within the parent".to_owned());
        }
        if nests_transitively(&child_node, *parent_node.read().uuid) {
            return Err("nesting would create a containment cycle".to_owned());
        }
        Ok(())
    }

    fn group(
        &self,
        _factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError> {
        let parent_node = node_subject(parent)
            .ok_or_else(|| GroupingError::PreconditionFailed("parent item has no node subject".to_owned()))?;
        let child_node = node_subject(child)
            .ok_or_else(|| GroupingError::PreconditionFailed("child item has no node subject".to_owned()))?;

        parent_node.write().nested_node.push(child_node.clone());
        Ok(GroupingHandle::NestedNode {
            parent: *parent_node.read().uuid,
            child: *child_node.read().uuid,
        })
    }

    fn ungroup(
        &self,
        factory: &mut ElementFactory,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError> {
        let GroupingHandle::NestedNode { parent, child } = handle else {
            return Err(GroupingError::NotGrouped);
        };
        let parent_node = factory
            .get(parent)
            .and_then(|e| e.as_node())
            .ok_or(GroupingError::NotGrouped)?;

        let idx = parent_node
            .read()
            .nested_node
            .iter()
            .position(|n| *n.read().uuid == *child)
            .ok_or(GroupingError::NotGrouped)?;
        parent_node.write().nested_node.remove(idx);
        Ok(())
    }
}

/// Component within node composition: a composite attribute on the node and
/// a plain attribute on the component, linked by a connector with two ends
/// whose roles point back at the attributes. The connector is owned by the
/// node.
pub struct NodeComponentGroup;

impl GroupingRule for NodeComponentGroup {
    fn check(
        &self,
        _factory: &ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<(), String> {
        node_subject(parent).ok_or("parent item has no node subject")?;
        component_subject(child).ok_or("child item has no component subject")?;
        Ok(())
    }

    fn group(
        &self,
        factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError> {
        let node = node_subject(parent)
            .ok_or_else(|| GroupingError::PreconditionFailed("parent item has no node subject".to_owned()))?;
        let component = component_subject(child)
            .ok_or_else(|| GroupingError::PreconditionFailed("child item has no component subject".to_owned()))?;

        // Construct the whole element set first; only then link it into the
        // node, the component and the store.
        let mut node_attribute = UmlProperty::new(ModelUuid::now_v7(), "".to_owned());
        node_attribute.aggregation = UmlAggregation::Composite;
        node_attribute.type_ = Some(component.clone().into());
        let node_attribute = ERef::new(node_attribute);

        let mut component_attribute = UmlProperty::new(ModelUuid::now_v7(), "".to_owned());
        component_attribute.type_ = Some(node.clone().into());
        let component_attribute = ERef::new(component_attribute);

        let node_end = ERef::new(UmlConnectorEnd::new(
            ModelUuid::now_v7(),
            Some(node_attribute.clone()),
        ));
        let component_end = ERef::new(UmlConnectorEnd::new(
            ModelUuid::now_v7(),
            Some(component_attribute.clone()),
        ));
        let connector = ERef::new(UmlConnector::new(
            ModelUuid::now_v7(),
            vec![node_end.clone(), component_end.clone()],
        ));

        let handle = GroupingHandle::Composition {
            parent: *node.read().uuid,
            child: *component.read().uuid,
            parent_attribute: *node_attribute.read().uuid,
            child_attribute: *component_attribute.read().uuid,
            connector: *connector.read().uuid,
            connector_ends: [*node_end.read().uuid, *component_end.read().uuid],
        };

        node.write().owned_attribute.push(node_attribute.clone());
        node.write().owned_connector.push(connector.clone());
        component.write().owned_attribute.push(component_attribute.clone());

        insert_new(factory, node_attribute.into());
        insert_new(factory, component_attribute.into());
        insert_new(factory, node_end.into());
        insert_new(factory, component_end.into());
        insert_new(factory, connector.into());

        Ok(handle)
    }

    fn ungroup(
        &self,
        factory: &mut ElementFactory,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError> {
        let GroupingHandle::Composition {
            parent,
            child,
            parent_attribute,
            child_attribute,
            connector,
            connector_ends,
        } = handle
        else {
            return Err(GroupingError::NotGrouped);
        };
        let node = factory
            .get(parent)
            .and_then(|e| e.as_node())
            .ok_or(GroupingError::NotGrouped)?;
        let component = factory
            .get(child)
            .and_then(|e| e.as_component())
            .ok_or(GroupingError::NotGrouped)?;

        // Validate liveness of the whole recorded set before touching
        // anything; a stale handle must leave the store untouched.
        let connector_idx = node
            .read()
            .owned_connector
            .iter()
            .position(|c| *c.read().uuid == *connector)
            .ok_or(GroupingError::NotGrouped)?;
        let node_attribute_idx = node
            .read()
            .owned_attribute
            .iter()
            .position(|a| *a.read().uuid == *parent_attribute)
            .ok_or(GroupingError::NotGrouped)?;
        let component_attribute_idx = component
            .read()
            .owned_attribute
            .iter()
            .position(|a| *a.read().uuid == *child_attribute)
            .ok_or(GroupingError::NotGrouped)?;
        if connector_ends.iter().any(|e| !factory.contains(e)) {
            return Err(GroupingError::NotGrouped);
        }

        node.write().owned_connector.remove(connector_idx);
        node.write().owned_attribute.remove(node_attribute_idx);
        component.write().owned_attribute.remove(component_attribute_idx);

        for uuid in [parent_attribute, child_attribute, connector]
            .into_iter()
            .chain(connector_ends.iter())
        {
            let removed = factory.remove(uuid);
            debug_assert!(removed.is_some(), "composition element already removed from the store");
        }
        Ok(())
    }
}

/// Artifact within node deployment: one Deployment element on the node
/// referencing the artifact.
pub struct NodeArtifactGroup;

impl GroupingRule for NodeArtifactGroup {
    fn check(
        &self,
        _factory: &ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<(), String> {
        let node = node_subject(parent).ok_or("parent item has no node subject")?;
        let artifact = child
            .subject
            .as_ref()
            .and_then(UmlElement::as_artifact)
            .ok_or("child item has no artifact subject")?;

        let artifact_uuid = *artifact.read().uuid;
        if node.read().deployment.iter().any(|d| {
            d.read()
                .deployed_artifact
                .iter()
                .any(|a| *a.read().uuid == artifact_uuid)
        }) {
            return Err("artifact is already deployed on this node".to_owned());
        }
        Ok(())
    }

    fn group(
        &self,
        factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError> {
        let node = node_subject(parent)
            .ok_or_else(|| GroupingError::PreconditionFailed("parent item has no node subject".to_owned()))?;
        let artifact = child
            .subject
            .as_ref()
            .and_then(UmlElement::as_artifact)
            .ok_or_else(|| GroupingError::PreconditionFailed("child item has no artifact subject".to_owned()))?;

        let deployment = ERef::new(UmlDeployment::new(
            ModelUuid::now_v7(),
            vec![artifact.clone()],
        ));
        let handle = GroupingHandle::Deployment {
            parent: *node.read().uuid,
            child: *artifact.read().uuid,
            deployment: *deployment.read().uuid,
        };

        node.write().deployment.push(deployment.clone());
        insert_new(factory, deployment.into());
        Ok(handle)
    }

    fn ungroup(
        &self,
        factory: &mut ElementFactory,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError> {
        let GroupingHandle::Deployment { parent, deployment, .. } = handle else {
            return Err(GroupingError::NotGrouped);
        };
        let node = factory
            .get(parent)
            .and_then(|e| e.as_node())
            .ok_or(GroupingError::NotGrouped)?;

        let idx = node
            .read()
            .deployment
            .iter()
            .position(|d| *d.read().uuid == *deployment)
            .ok_or(GroupingError::NotGrouped)?;
        node.write().deployment.remove(idx);

        let removed = factory.remove(deployment);
        debug_assert!(removed.is_some(), "deployment already removed from the store");
        Ok(())
    }
}

/// Use case within subsystem: the subsystem's classifier is appended to the
/// use case's `subject` collection. The use case's namespace is left alone,
/// and the classifier gains no back-reference.
pub struct SubsystemUseCaseGroup;

impl GroupingRule for SubsystemUseCaseGroup {
    fn check(
        &self,
        _factory: &ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<(), String> {
        let classifier = parent
            .subject
            .as_ref()
            .and_then(UmlElement::as_classifier)
            .ok_or("parent item has no classifier subject")?;
        let use_case = child
            .subject
            .as_ref()
            .and_then(UmlElement::as_use_case)
            .ok_or("child item has no use case subject")?;

        let classifier_uuid = classifier.uuid();
        if use_case
            .read()
            .subject
            .iter()
            .any(|c| c.uuid() == classifier_uuid)
        {
            return Err("use case already applies to this subsystem".to_owned());
        }
        Ok(())
    }

    fn group(
        &self,
        _factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError> {
        let classifier = parent
            .subject
            .as_ref()
            .and_then(UmlElement::as_classifier)
            .ok_or_else(|| GroupingError::PreconditionFailed("parent item has no classifier subject".to_owned()))?;
        let use_case = child
            .subject
            .as_ref()
            .and_then(UmlElement::as_use_case)
            .ok_or_else(|| GroupingError::PreconditionFailed("child item has no use case subject".to_owned()))?;

        let handle = GroupingHandle::SubsystemMembership {
            subsystem: classifier.uuid(),
            use_case: *use_case.read().uuid,
        };
        use_case.write().subject.push(classifier);
        Ok(handle)
    }

    fn ungroup(
        &self,
        factory: &mut ElementFactory,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError> {
        let GroupingHandle::SubsystemMembership { subsystem, use_case } = handle else {
            return Err(GroupingError::NotGrouped);
        };
        let use_case = factory
            .get(use_case)
            .and_then(|e| e.as_use_case())
            .ok_or(GroupingError::NotGrouped)?;

        let idx = use_case
            .read()
            .subject
            .iter()
            .position(|c| c.uuid() == *subsystem)
            .ok_or(GroupingError::NotGrouped)?;
        use_case.write().subject.remove(idx);
        Ok(())
    }
}

/// Maps (parent kind, child kind) pairs to grouping rules. Lookup is
/// polymorphic over each kind's base chain: the exact pair is tried first,
/// then progressively more general pairs (parent-major), and within one
/// pair the first registered rule wins.
pub struct KindRegistry {
    rules: Vec<(ItemKind, ItemKind, Box<dyn GroupingRule>)>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, parent: ItemKind, child: ItemKind, rule: Box<dyn GroupingRule>) {
        self.rules.push((parent, child, rule));
    }

    pub fn lookup(&self, parent: &DiagramItem, child: &DiagramItem) -> Option<&dyn GroupingRule> {
        for parent_kind in parent.kind.self_and_bases() {
            for child_kind in child.kind.self_and_bases() {
                if let Some((_, _, rule)) = self
                    .rules
                    .iter()
                    .find(|(p, c, _)| *p == parent_kind && *c == child_kind)
                {
                    return Some(rule.as_ref());
                }
            }
        }
        None
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The registry with every rule of the deployment/use-case domain.
pub fn standard_registry() -> KindRegistry {
    let mut registry = KindRegistry::new();
    registry.register(ItemKind::Node, ItemKind::Node, Box::new(NodeGroup));
    registry.register(ItemKind::Node, ItemKind::Component, Box::new(NodeComponentGroup));
    registry.register(ItemKind::Node, ItemKind::Artifact, Box::new(NodeArtifactGroup));
    registry.register(ItemKind::Subsystem, ItemKind::UseCase, Box::new(SubsystemUseCaseGroup));
    registry
}

/// Orchestrates rule lookup and delegation. Performs no metamodel mutation
/// itself.
pub struct GroupingEngine {
    registry: KindRegistry,
}

impl GroupingEngine {
    pub fn new(registry: KindRegistry) -> Self {
        Self { registry }
    }

    pub fn standard() -> Self {
        Self::new(standard_registry())
    }

    pub fn can_group(&self, factory: &ElementFactory, parent: &DiagramItem, child: &DiagramItem) -> bool {
        self.registry
            .lookup(parent, child)
            .is_some_and(|rule| rule.can_group(factory, parent, child))
    }

    pub fn group(
        &self,
        factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
    ) -> Result<GroupingHandle, GroupingError> {
        let Some(rule) = self.registry.lookup(parent, child) else {
            return Err(GroupingError::NoApplicableRule {
                parent: parent.kind,
                child: child.kind,
            });
        };
        if let Err(reason) = rule.check(factory, parent, child) {
            log::debug!(
                "rejected grouping of {:?} under {:?}: {}",
                child.tagged_uuid(),
                parent.tagged_uuid(),
                reason,
            );
            return Err(GroupingError::PreconditionFailed(reason));
        }
        let handle = rule.group(factory, parent, child)?;
        log::debug!(
            "grouped {:?} under {:?} ({} elements created)",
            child.tagged_uuid(),
            parent.tagged_uuid(),
            handle.created().len(),
        );
        Ok(handle)
    }

    pub fn ungroup(
        &self,
        factory: &mut ElementFactory,
        parent: &DiagramItem,
        child: &DiagramItem,
        handle: &GroupingHandle,
    ) -> Result<(), GroupingError> {
        let Some(rule) = self.registry.lookup(parent, child) else {
            return Err(GroupingError::NotGrouped);
        };
        // The handle must name this very pair's subjects.
        let pair = (parent.subject_uuid(), child.subject_uuid());
        if pair != (Some(handle.parent_subject()), Some(handle.child_subject())) {
            log::warn!(
                "ungroup requested with a handle for a different pair than {:?}/{:?}",
                parent.tagged_uuid(),
                child.tagged_uuid(),
            );
            return Err(GroupingError::NotGrouped);
        }
        if let Err(e) = rule.ungroup(factory, handle) {
            log::warn!(
                "ungroup of {:?} from {:?} failed: {:?}",
                child.tagged_uuid(),
                parent.tagged_uuid(),
                e,
            );
            return Err(e);
        }
        log::debug!(
            "ungrouped {:?} from {:?}",
            child.tagged_uuid(),
            parent.tagged_uuid(),
        );
        Ok(())
    }
}
