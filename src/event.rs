use serde::Serialize;

use crate::{domain::BadgeState, router::Response};

/// Outbound message to the extension
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostEvent {
    Response(Response),
    Badge(BadgeFrame),
}

/// `{"type":"badge","text":..,"color":..}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "badge")]
pub struct BadgeFrame {
    #[serde(flatten)]
    pub badge: BadgeState,
}

impl HostEvent {
    /// Get the variant name as a string slice (without "HostEvent::" prefix)
    pub fn variant_name(&self) -> &'static str {
        match self {
            HostEvent::Response(_) => "Response",
            HostEvent::Badge(_) => "Badge",
        }
    }
}

impl From<Response> for HostEvent {
    fn from(response: Response) -> Self {
        HostEvent::Response(response)
    }
}

impl From<BadgeState> for HostEvent {
    fn from(badge: BadgeState) -> Self {
        HostEvent::Badge(BadgeFrame { badge })
    }
}
