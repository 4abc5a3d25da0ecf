//! Input events, event targets and layout rectangles.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::value::ElementId;

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventTarget {
    Window,
    Document,
    Element(ElementId),
}

/// `getBoundingClientRect()` result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Event payload by interface.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Mouse {
        client_x: i32,
        client_y: i32,
        button: i16,
    },
    /// `WheelEvent` extends `MouseEvent`, so it carries a position too.
    Wheel {
        client_x: i32,
        client_y: i32,
        delta_x: f64,
        delta_y: f64,
        delta_mode: u32,
    },
    Keyboard {
        key: String,
        code: String,
        repeat: bool,
    },
    Plain,
}

/// A dispatched DOM event.
///
/// Shared by reference between every handle the guest holds for it, so a
/// `preventDefault` through any of them is visible to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    event_type: String,
    kind: EventKind,
    default_prevented: Cell<bool>,
}

impl InputEvent {
    pub fn new(event_type: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_type: event_type.into(),
            kind,
            default_prevented: Cell::new(false),
        }
    }

    pub fn mouse(event_type: impl Into<String>, client_x: i32, client_y: i32, button: i16) -> Self {
        Self::new(
            event_type,
            EventKind::Mouse {
                client_x,
                client_y,
                button,
            },
        )
    }

    pub fn wheel(client_x: i32, client_y: i32, delta_x: f64, delta_y: f64, delta_mode: u32) -> Self {
        Self::new(
            "wheel",
            EventKind::Wheel {
                client_x,
                client_y,
                delta_x,
                delta_y,
                delta_mode,
            },
        )
    }

    pub fn keyboard(event_type: impl Into<String>, key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(
            event_type,
            EventKind::Keyboard {
                key: key.into(),
                code: code.into(),
                repeat: false,
            },
        )
    }

    pub fn plain(event_type: impl Into<String>) -> Self {
        Self::new(event_type, EventKind::Plain)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// `clientX`/`clientY` for mouse-derived events.
    pub fn client_position(&self) -> Option<(i32, i32)> {
        match self.kind {
            EventKind::Mouse {
                client_x, client_y, ..
            }
            | EventKind::Wheel {
                client_x, client_y, ..
            } => Some((client_x, client_y)),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<i16> {
        match self.kind {
            EventKind::Mouse { button, .. } => Some(button),
            // Wheel events report the primary button.
            EventKind::Wheel { .. } => Some(0),
            _ => None,
        }
    }

    pub fn wheel_delta(&self) -> Option<(f64, f64, u32)> {
        match self.kind {
            EventKind::Wheel {
                delta_x,
                delta_y,
                delta_mode,
                ..
            } => Some((delta_x, delta_y, delta_mode)),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Keyboard { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Keyboard { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn repeat(&self) -> Option<bool> {
        match self.kind {
            EventKind::Keyboard { repeat, .. } => Some(repeat),
            _ => None,
        }
    }

    /// Mark a keyboard event as auto-repeated.
    pub fn with_repeat(mut self, value: bool) -> Self {
        if let EventKind::Keyboard { repeat, .. } = &mut self.kind {
            *repeat = value;
        }
        self
    }

    /// DOM interface name.
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            EventKind::Mouse { .. } => "MouseEvent",
            EventKind::Wheel { .. } => "WheelEvent",
            EventKind::Keyboard { .. } => "KeyboardEvent",
            EventKind::Plain => "Event",
        }
    }
}
