//! Transient notifications

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::constants::MAX_TOASTS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

/// Newest last; the oldest is dropped once `MAX_TOASTS` is reached
#[derive(Clone, Debug)]
pub struct Toasts {
    items: VecDeque<Toast>,
    lifetime: Duration,
}

impl Toasts {
    pub fn new(lifetime: Duration) -> Self {
        Toasts {
            items: VecDeque::new(),
            lifetime,
        }
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        if self.items.len() == MAX_TOASTS {
            self.items.pop_front();
        }
        self.items.push_back(Toast {
            kind,
            message: message.into(),
            created: now,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message, Instant::now());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Success, message, Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message, Instant::now());
    }

    /// Drop expired toasts, returns true if anything changed
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        let lifetime = self.lifetime;
        self.items
            .retain(|t| now.saturating_duration_since(t.created) < lifetime);
        self.items.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
