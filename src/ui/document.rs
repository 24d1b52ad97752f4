use indexmap::{IndexMap, IndexSet};

use crate::error::ControlError;

/// Named elements of the control surface. The GUI renders each of these from its
/// [`ElementState`]; an id without an entry in the [`Document`] is simply not shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    ConnectionStatus,
    WeightDisplay,
    BatteryLevel,
    ThresholdInput,
    ControlMini,
    MiniStatus,
    MiniWeight,
    ControlPanel,
    Overlay,
    PanelHandle,
    ConnectButton,
    TareButton,
    DisconnectButton,
}

pub const ELEMENT_IDS: [ElementId; 13] = [
    ElementId::ConnectionStatus,
    ElementId::WeightDisplay,
    ElementId::BatteryLevel,
    ElementId::ThresholdInput,
    ElementId::ControlMini,
    ElementId::MiniStatus,
    ElementId::MiniWeight,
    ElementId::ControlPanel,
    ElementId::Overlay,
    ElementId::PanelHandle,
    ElementId::ConnectButton,
    ElementId::TareButton,
    ElementId::DisconnectButton,
];

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            ElementId::ConnectionStatus => "connectionStatus",
            ElementId::WeightDisplay => "weightDisplay",
            ElementId::BatteryLevel => "batteryLevel",
            ElementId::ThresholdInput => "thresholdInput",
            ElementId::ControlMini => "controlMini",
            ElementId::MiniStatus => "miniStatus",
            ElementId::MiniWeight => "miniWeight",
            ElementId::ControlPanel => "controlPanel",
            ElementId::Overlay => "overlay",
            ElementId::PanelHandle => "panelHandle",
            ElementId::ConnectButton => "connectBtn",
            ElementId::TareButton => "tareBtn",
            ElementId::DisconnectButton => "disconnectBtn",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub text: String,
    pub classes: IndexSet<String>,
    pub disabled: bool,
}

impl ElementState {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.shift_remove(class);
    }

    /// Replaces all classes with the whitespace separated names in `classes`.
    pub fn set_class_name(&mut self, classes: &str) {
        self.classes = classes.split_whitespace().map(String::from).collect();
    }
}

/// Retained model of the control surface, keyed by [`ElementId`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    elements: IndexMap<ElementId, ElementState>,
}

impl Document {
    pub fn empty() -> Self {
        Document { elements: IndexMap::new() }
    }

    /// A document containing every known element, all enabled and blank.
    pub fn with_all_elements() -> Self {
        let mut document = Document::empty();
        for id in ELEMENT_IDS {
            document.insert(id);
        }
        document
    }

    pub fn insert(&mut self, id: ElementId) {
        self.elements.entry(id).or_default();
    }

    pub fn remove(&mut self, id: ElementId) -> Option<ElementState> {
        self.elements.shift_remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementState> {
        self.elements.get(&id)
    }

    pub fn element(&mut self, id: ElementId) -> Result<&mut ElementState, ControlError> {
        self.elements.get_mut(&id).ok_or(ControlError::ElementMissing(id))
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.get(id).map(|element| element.text.as_str())
    }

    pub fn is_disabled(&self, id: ElementId) -> Option<bool> {
        self.get(id).map(|element| element.disabled)
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.get(id).map(|element| element.has_class(class)).unwrap_or(false)
    }
}
