//! Presentation contract and the in-memory page document
//!
//! Controllers never touch rendered output directly. Every mutation goes
//! through a [`Presenter`], addressed by an [`ElementId`] whose selector is
//! the stable contract with the surrounding document.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::broadcast;

/// Placeholder shown in result fields before a value is known
pub const PLACEHOLDER: &str = "--";

/// Every element a controller may address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementId {
    /// Preview region (upload prompt or image preview)
    ImageContainer,
    ImageSize,
    LeafCount,
    Accuracy,
    Timestamp,
    /// File input inside the upload prompt
    ImageInput,
    WaterStatus,
    WaterIcon,
    VentStatus,
    VentIcon,
    VentToggle,
    LightStatus,
    LightIcon,
    LightToggle,
}

impl ElementId {
    pub const ALL: [ElementId; 14] = [
        ElementId::ImageContainer,
        ElementId::ImageSize,
        ElementId::LeafCount,
        ElementId::Accuracy,
        ElementId::Timestamp,
        ElementId::ImageInput,
        ElementId::WaterStatus,
        ElementId::WaterIcon,
        ElementId::VentStatus,
        ElementId::VentIcon,
        ElementId::VentToggle,
        ElementId::LightStatus,
        ElementId::LightIcon,
        ElementId::LightToggle,
    ];

    /// Selector of this element in the dashboard document
    pub fn selector(&self) -> &'static str {
        match self {
            ElementId::ImageContainer => "#imageContainer",
            ElementId::ImageSize => "#imageSize",
            ElementId::LeafCount => "#leafCount",
            ElementId::Accuracy => "#accuracy",
            ElementId::Timestamp => "#timestamp",
            ElementId::ImageInput => "#imageInput",
            ElementId::WaterStatus => "#water-status",
            ElementId::WaterIcon => ".status-item i.bx-water",
            ElementId::VentStatus => "#vent-status",
            ElementId::VentIcon => ".status-item i.bx-wind",
            ElementId::VentToggle => "#vent-toggle",
            ElementId::LightStatus => "#light-status",
            ElementId::LightIcon => ".status-item i.bx-bulb",
            ElementId::LightToggle => "#light-toggle",
        }
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.selector())
    }
}

/// Content of an element: plain text or inner markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Text(String),
    Markup(String),
}

impl Content {
    pub fn as_str(&self) -> &str {
        match self {
            Content::Text(s) | Content::Markup(s) => s,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

/// Rendered state of a single element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub content: Content,
    /// Class attribute, if one was ever assigned
    pub class: Option<String>,
}

/// Change notifications emitted by a [`Page`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PageEvent {
    ElementChanged { id: ElementId, element: Element },
    /// Blocking user notification
    Alert { message: String },
}

/// Output boundary of the controllers
pub trait Presenter: Send + Sync + 'static {
    fn set_text(&self, id: ElementId, text: &str);
    fn set_markup(&self, id: ElementId, markup: &str);
    fn set_class(&self, id: ElementId, class: &str);
    fn alert(&self, message: &str);
}

/// In-memory dashboard document
pub struct Page {
    elements: RwLock<HashMap<ElementId, Element>>,
    events: broadcast::Sender<PageEvent>,
}

impl Page {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            elements: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to element changes and alerts
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    /// Current element state (default if never written)
    pub fn element(&self, id: ElementId) -> Element {
        self.elements.read().get(&id).cloned().unwrap_or_default()
    }

    /// Text or markup currently shown in an element
    pub fn text(&self, id: ElementId) -> String {
        self.elements
            .read()
            .get(&id)
            .map(|e| e.content.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn class(&self, id: ElementId) -> Option<String> {
        self.elements.read().get(&id).and_then(|e| e.class.clone())
    }

    /// All written elements, ordered by id
    pub fn snapshot(&self) -> BTreeMap<ElementId, Element> {
        self.elements
            .read()
            .iter()
            .map(|(id, e)| (*id, e.clone()))
            .collect()
    }

    fn update(&self, id: ElementId, f: impl FnOnce(&mut Element)) {
        let element = {
            let mut elements = self.elements.write();
            let element = elements.entry(id).or_default();
            f(element);
            element.clone()
        };
        let _ = self.events.send(PageEvent::ElementChanged { id, element });
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for Page {
    fn set_text(&self, id: ElementId, text: &str) {
        self.update(id, |e| e.content = Content::Text(text.to_string()));
    }

    fn set_markup(&self, id: ElementId, markup: &str) {
        self.update(id, |e| e.content = Content::Markup(markup.to_string()));
    }

    fn set_class(&self, id: ElementId, class: &str) {
        self.update(id, |e| e.class = Some(class.to_string()));
    }

    fn alert(&self, message: &str) {
        tracing::debug!(alert = message, "Alert raised");
        let _ = self.events.send(PageEvent::Alert {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_element_is_empty() {
        let page = Page::new();
        assert_eq!(page.text(ElementId::LeafCount), "");
        assert_eq!(page.class(ElementId::WaterIcon), None);
        assert!(page.snapshot().is_empty());
    }

    #[test]
    fn test_text_and_markup_replace_content() {
        let page = Page::new();
        page.set_markup(ElementId::LeafCount, "<span>x</span>");
        assert_eq!(
            page.element(ElementId::LeafCount).content,
            Content::Markup("<span>x</span>".to_string())
        );

        page.set_text(ElementId::LeafCount, "42");
        assert_eq!(page.element(ElementId::LeafCount).content, Content::Text("42".to_string()));
    }

    #[test]
    fn test_class_kept_across_content_changes() {
        let page = Page::new();
        page.set_class(ElementId::VentIcon, "bx bx-wind status-active");
        page.set_text(ElementId::VentIcon, "");
        assert_eq!(page.class(ElementId::VentIcon).as_deref(), Some("bx bx-wind status-active"));
    }

    #[test]
    fn test_events_broadcast() {
        let page = Page::new();
        let mut rx = page.subscribe();

        page.set_text(ElementId::Timestamp, PLACEHOLDER);
        page.alert("hello");

        match rx.try_recv().unwrap() {
            PageEvent::ElementChanged { id, element } => {
                assert_eq!(id, ElementId::Timestamp);
                assert_eq!(element.content.as_str(), PLACEHOLDER);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            PageEvent::Alert {
                message: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = PageEvent::Alert {
            message: "hi".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "alert");
        assert_eq!(json["data"]["message"], "hi");
    }

    #[test]
    fn test_selectors_unique() {
        let mut selectors: Vec<_> = ElementId::ALL.iter().map(|id| id.selector()).collect();
        selectors.sort();
        selectors.dedup();
        assert_eq!(selectors.len(), ElementId::ALL.len());
    }
}
