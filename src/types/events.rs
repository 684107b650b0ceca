use std::sync::Arc;
use tokio::sync::broadcast;

use crate::content::ContentHandle;

// The size of the broadcast channel buffer.
const CHANNEL_CAPACITY: usize = 100;

/// The session finished connecting and the viewer's own name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub actor: String,
    /// The viewer's username, or their raw id if they have none.
    pub display_name: String,
}

/// A raw actor id now has a username. Renderers that showed the fallback
/// should replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameResolved {
    pub actor: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct ContentReady {
    pub handle: ContentHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFailed {
    pub magnet: String,
    pub reason: String,
}

// Macro to generate EventBus fields and constructor
macro_rules! define_event_bus {
    ($(($field:ident, $type:ty)),* $(,)?) => {
        /// Typed event bus that provides separate broadcast channels for each event type.
        #[derive(Debug)]
        pub struct EventBus {
            $(
                pub $field: broadcast::Sender<$type>,
            )*
        }

        impl EventBus {
            pub fn new() -> Self {
                Self {
                    $(
                        $field: broadcast::channel(CHANNEL_CAPACITY).0,
                    )*
                }
            }
        }
    };
}

define_event_bus! {
    (connected, Arc<Connected>),
    (username_resolved, Arc<UsernameResolved>),
    (content_ready, Arc<ContentReady>),
    (content_failed, Arc<ContentFailed>),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
