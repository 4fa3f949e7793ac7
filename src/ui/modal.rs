/// Modal overlay with outside-click dismissal
///
/// A `Modal` is open from the moment it is mounted until it closes, and
/// it never reopens: showing the dialog again means mounting a new one.
///
/// While open it owns three things:
/// - its nodes in the document (container, backdrop, content panel)
/// - a document-level pointer-down listener
/// - the cancel target that the close button navigates to
///
/// The panel node stops propagation, so presses inside the dialog never
/// reach the document listener. Everything is released by one teardown
/// routine, which runs on outside click, on the close button, on
/// `unmount` and on drop.
use iced::widget::{
    button, center, column, container, horizontal_space, mouse_area, opaque, row, stack, text,
    tooltip,
};
use iced::widget::MouseArea;
use iced::{Color, Element, Length};

use crate::dom::{Document, ListenerGuard, ListenerId, NodeId};

const PANEL_MAX_WIDTH: f32 = 576.0;

/// Result of feeding an event to the modal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Closed,
}

/// Events the rendered modal reports back to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Pointer pressed on the given node
    PointerDown(NodeId),
    /// The close button was activated
    CloseRequested,
}

#[derive(Debug)]
enum DialogState {
    Open {
        container: NodeId,
        backdrop: NodeId,
        panel: NodeId,
        listener: ListenerGuard,
    },
    Closed,
}

#[derive(Debug)]
pub struct Modal {
    document: Document,
    cancel_link: String,
    state: DialogState,
}

impl Modal {
    /// Mount an open modal under `parent`.
    ///
    /// A parent that is no longer in the document falls back to the root.
    pub fn mount(document: &Document, parent: NodeId, cancel_link: impl Into<String>) -> Self {
        let container = document.append(parent).unwrap_or_else(|| {
            log::warn!("Modal parent {:?} is detached, mounting at the root", parent);
            let root = document.root();
            document
                .append(root)
                .expect("the document root is always live")
        });

        let backdrop = document
            .append(container)
            .expect("container was created above");
        let panel = document
            .append_isolated(container)
            .expect("container was created above");
        let listener = document.listen();

        let cancel_link = cancel_link.into();
        log::debug!("Modal mounted (panel {:?}, cancel to {})", panel, cancel_link);

        Self {
            document: document.clone(),
            cancel_link,
            state: DialogState::Open {
                container,
                backdrop,
                panel,
                listener,
            },
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open { .. })
    }

    pub fn panel(&self) -> Option<NodeId> {
        match &self.state {
            DialogState::Open { panel, .. } => Some(*panel),
            DialogState::Closed => None,
        }
    }

    pub fn backdrop(&self) -> Option<NodeId> {
        match &self.state {
            DialogState::Open { backdrop, .. } => Some(*backdrop),
            DialogState::Closed => None,
        }
    }

    /// The document listener held while open
    pub fn listener(&self) -> Option<ListenerId> {
        match &self.state {
            DialogState::Open { listener, .. } => Some(listener.id()),
            DialogState::Closed => None,
        }
    }

    /// Does `target` lie inside the content panel?
    ///
    /// A panel that is missing from the document contains nothing.
    pub fn contains(&self, target: NodeId) -> bool {
        self.panel()
            .is_some_and(|panel| self.document.contains(panel, target))
    }

    /// A pointer-down raised somewhere in the document.
    ///
    /// The event bubbles from `target`; if it reaches this modal's
    /// listener, the outside-click check decides.
    pub fn dispatch_pointer_down(&mut self, target: NodeId) -> Transition {
        let Some(listener) = self.listener() else {
            return Transition::Unchanged;
        };

        if self.document.dispatch(target).reached(listener) {
            self.handle_pointer_down(target)
        } else {
            Transition::Unchanged
        }
    }

    /// Document listener body: close unless the press landed in the panel
    pub fn handle_pointer_down(&mut self, target: NodeId) -> Transition {
        if !self.is_open() || self.contains(target) {
            return Transition::Unchanged;
        }
        self.close()
    }

    /// Close the dialog. Closing twice is a no-op.
    pub fn close(&mut self) -> Transition {
        self.teardown()
    }

    /// The close button: closes and hands back where to navigate.
    ///
    /// Returns `None` when already closed, as the button is gone by then.
    pub fn activate_close(&mut self) -> Option<String> {
        match self.close() {
            Transition::Closed => Some(self.cancel_link.clone()),
            Transition::Unchanged => None,
        }
    }

    /// Remove the modal from the document
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) -> Transition {
        match std::mem::replace(&mut self.state, DialogState::Closed) {
            DialogState::Open {
                container,
                listener,
                ..
            } => {
                drop(listener);
                self.document.remove(container);
                log::debug!("Modal closed");
                Transition::Closed
            }
            DialogState::Closed => Transition::Unchanged,
        }
    }

    /// Draw `content` in a centered panel over `base`.
    ///
    /// Once closed only `base` is drawn.
    pub fn view<'a, M>(
        &self,
        base: impl Into<Element<'a, M>>,
        content: impl Into<Element<'a, M>>,
        on_event: impl Fn(Event) -> M,
    ) -> Element<'a, M>
    where
        M: Clone + 'a,
    {
        let (Some(backdrop), Some(panel)) = (self.backdrop(), self.panel()) else {
            return base.into();
        };

        let close = tooltip(
            button(text("✕").size(18))
                .on_press(on_event(Event::CloseRequested))
                .padding(8)
                .style(button::text),
            container(text("Close panel").size(12))
                .padding(6)
                .style(container::rounded_box),
            tooltip::Position::Bottom,
        );

        let content: Element<'a, M> = content.into();
        let header = row![horizontal_space(), close];
        let panel_body = container(column![header, content].spacing(12))
            .padding(24)
            .max_width(PANEL_MAX_WIDTH)
            .style(container::rounded_box);

        // Presses inside the panel are reported against the panel node,
        // and `opaque` keeps them away from the backdrop underneath.
        let panel_layer = opaque(any_press(mouse_area(panel_body), &on_event, panel));

        let dimmed = center(panel_layer).style(|_theme| container::Style {
            background: Some(
                Color {
                    a: 0.75,
                    ..Color::BLACK
                }
                .into(),
            ),
            ..container::Style::default()
        });
        let backdrop_layer = any_press(mouse_area(dimmed), &on_event, backdrop);

        let base: Element<'a, M> = base.into();
        stack![base, opaque(backdrop_layer)]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

/// Report a press of any mouse button on `node`
fn any_press<'a, M: Clone + 'a>(
    area: MouseArea<'a, M>,
    on_event: &impl Fn(Event) -> M,
    node: NodeId,
) -> MouseArea<'a, M> {
    area.on_press(on_event(Event::PointerDown(node)))
        .on_right_press(on_event(Event::PointerDown(node)))
        .on_middle_press(on_event(Event::PointerDown(node)))
}

impl Drop for Modal {
    fn drop(&mut self) {
        self.teardown();
    }
}
