use crate::common::entity::{Entity, EntityUuid};
use crate::common::eref::ERef;
use crate::common::uuid::ModelUuid;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum UmlElementKind {
    Package,
    Class,
    Node,
    Component,
    Artifact,
    UseCase,
    Property,
    Association,
    Connector,
    ConnectorEnd,
    Generalization,
    Deployment,
    Operation,
}

#[derive(Clone, derive_more::From)]
pub enum UmlElement {
    UmlPackage(ERef<UmlPackage>),
    UmlClass(ERef<UmlClass>),
    UmlNode(ERef<UmlNode>),
    UmlComponent(ERef<UmlComponent>),
    UmlArtifact(ERef<UmlArtifact>),
    UmlUseCase(ERef<UmlUseCase>),
    UmlProperty(ERef<UmlProperty>),
    UmlAssociation(ERef<UmlAssociation>),
    UmlConnector(ERef<UmlConnector>),
    UmlConnectorEnd(ERef<UmlConnectorEnd>),
    UmlGeneralization(ERef<UmlGeneralization>),
    UmlDeployment(ERef<UmlDeployment>),
    UmlOperation(ERef<UmlOperation>),
}

impl UmlElement {
    pub fn uuid(&self) -> ModelUuid {
        match self {
            UmlElement::UmlPackage(inner) => *inner.read().uuid,
            UmlElement::UmlClass(inner) => *inner.read().uuid,
            UmlElement::UmlNode(inner) => *inner.read().uuid,
            UmlElement::UmlComponent(inner) => *inner.read().uuid,
            UmlElement::UmlArtifact(inner) => *inner.read().uuid,
            UmlElement::UmlUseCase(inner) => *inner.read().uuid,
            UmlElement::UmlProperty(inner) => *inner.read().uuid,
            UmlElement::UmlAssociation(inner) => *inner.read().uuid,
            UmlElement::UmlConnector(inner) => *inner.read().uuid,
            UmlElement::UmlConnectorEnd(inner) => *inner.read().uuid,
            UmlElement::UmlGeneralization(inner) => *inner.read().uuid,
            UmlElement::UmlDeployment(inner) => *inner.read().uuid,
            UmlElement::UmlOperation(inner) => *inner.read().uuid,
        }
    }

    pub fn kind(&self) -> UmlElementKind {
        match self {
            UmlElement::UmlPackage(..) => UmlElementKind::Package,
            UmlElement::UmlClass(..) => UmlElementKind::Class,
            UmlElement::UmlNode(..) => UmlElementKind::Node,
            UmlElement::UmlComponent(..) => UmlElementKind::Component,
            UmlElement::UmlArtifact(..) => UmlElementKind::Artifact,
            UmlElement::UmlUseCase(..) => UmlElementKind::UseCase,
            UmlElement::UmlProperty(..) => UmlElementKind::Property,
            UmlElement::UmlAssociation(..) => UmlElementKind::Association,
            UmlElement::UmlConnector(..) => UmlElementKind::Connector,
            UmlElement::UmlConnectorEnd(..) => UmlElementKind::ConnectorEnd,
            UmlElement::UmlGeneralization(..) => UmlElementKind::Generalization,
            UmlElement::UmlDeployment(..) => UmlElementKind::Deployment,
            UmlElement::UmlOperation(..) => UmlElementKind::Operation,
        }
    }

    pub fn as_classifier(&self) -> Option<UmlClassifier> {
        match self {
            UmlElement::UmlClass(inner) => Some(inner.clone().into()),
            UmlElement::UmlNode(inner) => Some(inner.clone().into()),
            UmlElement::UmlComponent(inner) => Some(inner.clone().into()),
            UmlElement::UmlArtifact(inner) => Some(inner.clone().into()),
            UmlElement::UmlUseCase(inner) => Some(inner.clone().into()),
            UmlElement::UmlPackage(..)
            | UmlElement::UmlProperty(..)
            | UmlElement::UmlAssociation(..)
            | UmlElement::UmlConnector(..)
            | UmlElement::UmlConnectorEnd(..)
            | UmlElement::UmlGeneralization(..)
            | UmlElement::UmlDeployment(..)
            | UmlElement::UmlOperation(..) => None,
        }
    }

    pub fn as_class(&self) -> Option<ERef<UmlClass>> {
        match self {
            UmlElement::UmlClass(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<ERef<UmlNode>> {
        match self {
            UmlElement::UmlNode(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<ERef<UmlComponent>> {
        match self {
            UmlElement::UmlComponent(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    pub fn as_artifact(&self) -> Option<ERef<UmlArtifact>> {
        match self {
            UmlElement::UmlArtifact(inner) => Some(inner.clone()),
            _ => None,
        }
    }

    pub fn as_use_case(&self) -> Option<ERef<UmlUseCase>> {
        match self {
            UmlElement::UmlUseCase(inner) => Some(inner.clone()),
            _ => None,
        }
    }
}

impl Entity for UmlElement {
    fn tagged_uuid(&self) -> EntityUuid {
        self.uuid().into()
    }
}

impl std::fmt::Debug for UmlElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.uuid())
    }
}

/// Classifiers are the element kinds which can type a structural feature
/// or own use case memberships.
#[derive(Clone, derive_more::From)]
pub enum UmlClassifier {
    UmlClass(ERef<UmlClass>),
    UmlNode(ERef<UmlNode>),
    UmlComponent(ERef<UmlComponent>),
    UmlArtifact(ERef<UmlArtifact>),
    UmlUseCase(ERef<UmlUseCase>),
}

impl UmlClassifier {
    pub fn uuid(&self) -> ModelUuid {
        match self {
            UmlClassifier::UmlClass(inner) => *inner.read().uuid,
            UmlClassifier::UmlNode(inner) => *inner.read().uuid,
            UmlClassifier::UmlComponent(inner) => *inner.read().uuid,
            UmlClassifier::UmlArtifact(inner) => *inner.read().uuid,
            UmlClassifier::UmlUseCase(inner) => *inner.read().uuid,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum UmlAggregation {
    #[default]
    None,
    Shared,
    Composite,
}

#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum UmlVisibility {
    #[default]
    Public,
    Package,
    Protected,
    Private,
}

pub struct UmlPackage {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub namespace: Option<ModelUuid>,
}

impl UmlPackage {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            namespace: None,
        }
    }
}

impl Entity for UmlPackage {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlClass {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub namespace: Option<ModelUuid>,
    pub owned_attribute: Vec<ERef<UmlProperty>>,
    pub owned_operation: Vec<ERef<UmlOperation>>,
}

impl UmlClass {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            namespace: None,
            owned_attribute: Vec::new(),
            owned_operation: Vec::new(),
        }
    }
}

impl Entity for UmlClass {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlNode {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub nested_node: Vec<ERef<UmlNode>>,
    pub owned_attribute: Vec<ERef<UmlProperty>>,
    pub owned_connector: Vec<ERef<UmlConnector>>,
    pub deployment: Vec<ERef<UmlDeployment>>,
}

impl UmlNode {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            nested_node: Vec::new(),
            owned_attribute: Vec::new(),
            owned_connector: Vec::new(),
            deployment: Vec::new(),
        }
    }

    /// The composite subset of `owned_attribute`. Derived, never stored.
    pub fn part(&self) -> Vec<ERef<UmlProperty>> {
        self.owned_attribute
            .iter()
            .filter(|p| p.read().is_composite())
            .cloned()
            .collect()
    }
}

impl Entity for UmlNode {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlComponent {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub namespace: Option<ModelUuid>,
    pub owned_attribute: Vec<ERef<UmlProperty>>,
}

impl UmlComponent {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            namespace: None,
            owned_attribute: Vec::new(),
        }
    }
}

impl Entity for UmlComponent {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlArtifact {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
}

impl UmlArtifact {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
        }
    }
}

impl Entity for UmlArtifact {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlUseCase {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub namespace: Option<ModelUuid>,
    /// Classifiers this use case applies to. The reverse direction
    /// (`Classifier.useCase`) is not navigable.
    pub subject: Vec<UmlClassifier>,
}

impl UmlUseCase {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            namespace: None,
            subject: Vec::new(),
        }
    }
}

impl Entity for UmlUseCase {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlProperty {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub visibility: UmlVisibility,
    pub aggregation: UmlAggregation,
    pub is_static: bool,
    pub multiplicity: Arc<String>,
    pub type_: Option<UmlClassifier>,
}

impl UmlProperty {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            visibility: UmlVisibility::Public,
            aggregation: UmlAggregation::None,
            is_static: false,
            multiplicity: Arc::new("".to_owned()),
            type_: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.aggregation, UmlAggregation::Composite)
    }
}

impl Entity for UmlProperty {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlAssociation {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub namespace: Option<ModelUuid>,
    pub member_end: Vec<ERef<UmlProperty>>,
}

impl UmlAssociation {
    pub fn new(uuid: ModelUuid, name: String, member_end: Vec<ERef<UmlProperty>>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            namespace: None,
            member_end,
        }
    }
}

impl Entity for UmlAssociation {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlConnector {
    pub uuid: Arc<ModelUuid>,
    pub end: Vec<ERef<UmlConnectorEnd>>,
}

impl UmlConnector {
    pub fn new(uuid: ModelUuid, end: Vec<ERef<UmlConnectorEnd>>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            end,
        }
    }
}

impl Entity for UmlConnector {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlConnectorEnd {
    pub uuid: Arc<ModelUuid>,
    pub role: Option<ERef<UmlProperty>>,
}

impl UmlConnectorEnd {
    pub fn new(uuid: ModelUuid, role: Option<ERef<UmlProperty>>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            role,
        }
    }
}

impl Entity for UmlConnectorEnd {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlGeneralization {
    pub uuid: Arc<ModelUuid>,
    pub general: ERef<UmlClass>,
    pub specific: ERef<UmlClass>,
}

impl UmlGeneralization {
    pub fn new(uuid: ModelUuid, general: ERef<UmlClass>, specific: ERef<UmlClass>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            general,
            specific,
        }
    }
}

impl Entity for UmlGeneralization {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlDeployment {
    pub uuid: Arc<ModelUuid>,
    pub deployed_artifact: Vec<ERef<UmlArtifact>>,
}

impl UmlDeployment {
    pub fn new(uuid: ModelUuid, deployed_artifact: Vec<ERef<UmlArtifact>>) -> Self {
        Self {
            uuid: Arc::new(uuid),
            deployed_artifact,
        }
    }
}

impl Entity for UmlDeployment {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}

pub struct UmlOperation {
    pub uuid: Arc<ModelUuid>,
    pub name: Arc<String>,
    pub visibility: UmlVisibility,
}

impl UmlOperation {
    pub fn new(uuid: ModelUuid, name: String) -> Self {
        Self {
            uuid: Arc::new(uuid),
            name: Arc::new(name),
            visibility: UmlVisibility::Public,
        }
    }
}

impl Entity for UmlOperation {
    fn tagged_uuid(&self) -> EntityUuid {
        (*self.uuid).into()
    }
}
