use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::{domain::BadgeState, event::HostEvent, rate_limit::BadgeSink};

pub trait Dispatcher {
    fn dispatch(&self, event: HostEvent);
}

impl Dispatcher for UnboundedSender<HostEvent> {
    fn dispatch(&self, event: HostEvent) {
        let name = event.variant_name();
        if self.send(event).is_err() {
            debug!(event = name, "Writer closed, dropping outbound event");
        }
    }
}

/// Badge updates travel to the extension as outbound frames
#[derive(Debug, Clone)]
pub struct ChannelBadgeSink {
    sender: UnboundedSender<HostEvent>,
}

impl ChannelBadgeSink {
    pub fn new(sender: UnboundedSender<HostEvent>) -> Self {
        Self { sender }
    }
}

impl BadgeSink for ChannelBadgeSink {
    fn show(&self, badge: BadgeState) {
        self.sender.dispatch(badge.into());
    }
}
