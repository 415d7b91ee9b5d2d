//! Follow-the-tail versus reading-history tracking for the message
//! list.
use crate::gateway::GroupId;

/// Distance from the bottom of the content, in the viewport's units,
/// inside which the view counts as being at the tail.
pub const FOLLOW_THRESHOLD: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttentionState {
    /// New content scrolls into view automatically.
    #[default]
    Following,
    /// The user scrolled away from the tail; leave the view alone.
    Reading,
}

/// Next attention state after a scroll position or content change.
///
/// `force_follow` is set when the change came from the user's own
/// outgoing message, which always brings the view back to the tail.
pub fn attention_state(
    prev: AttentionState,
    distance_from_bottom: f32,
    force_follow: bool,
) -> AttentionState {
    let next = if force_follow || distance_from_bottom < FOLLOW_THRESHOLD {
        AttentionState::Following
    } else {
        AttentionState::Reading
    };
    if next != prev {
        tracing::debug!(
            "Attention {:?} -> {:?} (distance {})",
            prev,
            next,
            distance_from_bottom
        );
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub client_height: f32,
}

impl Viewport {
    pub fn new(client_height: f32) -> Self {
        Self {
            scroll_top: 0.0,
            scroll_height: 0.0,
            client_height,
        }
    }

    /// Zero when the content fits inside the viewport.
    pub fn distance_from_bottom(&self) -> f32 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    pub fn max_scroll_top(&self) -> f32 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    pub fn scrolled_to(self, scroll_top: f32) -> Self {
        Self {
            scroll_top: scroll_top.clamp(0.0, self.max_scroll_top()),
            ..self
        }
    }

    pub fn scrolled_to_end(self) -> Self {
        let end = self.max_scroll_top();
        self.scrolled_to(end)
    }
}

/// What the view should do after the message list changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEffect {
    ScrollToEnd { smooth: bool },
    Hold,
}

/// Handle for the scroll listener of one selected group. Events
/// carrying an older handle are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerBinding {
    id: u64,
    pub group_id: GroupId,
}

#[derive(Debug, Default)]
pub struct ScrollTracker {
    state: AttentionState,
    viewport: Viewport,
    binding: Option<ListenerBinding>,
    next_listener_id: u64,
    unseen: usize,
}

impl ScrollTracker {
    pub fn new(client_height: f32) -> Self {
        Self {
            viewport: Viewport::new(client_height),
            ..Default::default()
        }
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Messages that arrived while reading history.
    pub fn unseen(&self) -> usize {
        self.unseen
    }

    /// True while the view should offer a way back to the tail.
    pub fn show_jump_to_latest(&self) -> bool {
        self.state == AttentionState::Reading
    }

    /// Start listening for the newly selected group. Any previous
    /// listener is dropped and the view starts at the tail again.
    pub fn bind(&mut self, group_id: GroupId) -> ListenerBinding {
        self.next_listener_id += 1;
        let binding = ListenerBinding {
            id: self.next_listener_id,
            group_id,
        };
        self.binding = Some(binding);
        self.state = AttentionState::Following;
        self.viewport = Viewport::new(self.viewport.client_height);
        self.unseen = 0;
        binding
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }

    pub fn is_bound(&self, listener: ListenerBinding) -> bool {
        self.binding == Some(listener)
    }

    /// Scroll event from `listener`. Returns `None` when the listener
    /// is stale.
    pub fn on_scroll(
        &mut self,
        listener: ListenerBinding,
        viewport: Viewport,
    ) -> Option<AttentionState> {
        if !self.is_bound(listener) {
            tracing::trace!("Dropping scroll event from stale listener {:?}", listener);
            return None;
        }
        self.viewport = viewport;
        self.transition(false);
        Some(self.state)
    }

    /// The message list was replaced. `content_height` is the new
    /// total height and `arrived` the number of messages not shown
    /// before.
    pub fn on_messages_changed(
        &mut self,
        content_height: f32,
        arrived: usize,
        force_follow: bool,
    ) -> ScrollEffect {
        self.viewport.scroll_height = content_height;
        self.viewport = self.viewport.scrolled_to(self.viewport.scroll_top);
        if force_follow {
            self.transition(true);
        } else if self.state == AttentionState::Reading {
            // Shrinking content can bring the tail back into view
            self.transition(false);
        }

        match self.state {
            AttentionState::Following => {
                self.viewport = self.viewport.scrolled_to_end();
                ScrollEffect::ScrollToEnd { smooth: true }
            }
            AttentionState::Reading => {
                self.unseen += arrived;
                ScrollEffect::Hold
            }
        }
    }

    /// Explicit "jump to latest" from the user.
    pub fn jump_to_latest(&mut self) -> ScrollEffect {
        self.transition(true);
        self.viewport = self.viewport.scrolled_to_end();
        ScrollEffect::ScrollToEnd { smooth: true }
    }

    /// The visible area changed size. A view at the tail stays there.
    pub fn set_client_height(&mut self, client_height: f32) {
        self.viewport.client_height = client_height;
        match self.state {
            AttentionState::Following => self.viewport = self.viewport.scrolled_to_end(),
            AttentionState::Reading => {
                self.viewport = self.viewport.scrolled_to(self.viewport.scroll_top);
                self.transition(false);
            }
        }
    }

    fn transition(&mut self, force_follow: bool) {
        self.state = attention_state(
            self.state,
            self.viewport.distance_from_bottom(),
            force_follow,
        );
        if self.state == AttentionState::Following {
            self.unseen = 0;
        }
    }
}
