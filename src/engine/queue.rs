//! FIFO of requests made while a transition was running.

use super::completion::{Completion, Resolver};
use crate::core::Args;
use std::collections::VecDeque;

/// A `demand` or `force_transition` call captured for later.
#[derive(Clone, Debug, PartialEq)]
pub enum DeferredCall {
    Demand { request: String, args: Args },
    Force { request: String, args: Args },
}

impl DeferredCall {
    pub fn request(&self) -> &str {
        match self {
            Self::Demand { request, .. } | Self::Force { request, .. } => request,
        }
    }
}

/// A deferred call with the signal its caller is waiting on.
#[derive(Debug)]
pub(crate) struct Pending {
    pub(crate) call: DeferredCall,
    pub(crate) resolver: Resolver,
}

/// Requests waiting for the running transition to settle, oldest first.
#[derive(Debug, Default)]
pub(crate) struct RequestQueue {
    entries: VecDeque<Pending>,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a call and hand back the signal that resolves once it ran.
    pub(crate) fn push(&mut self, call: DeferredCall) -> Completion {
        let (resolver, completion) = Completion::pending();
        self.entries.push_back(Pending { call, resolver });
        completion
    }

    pub(crate) fn pop(&mut self) -> Option<Pending> {
        self.entries.pop_front()
    }

    pub(crate) fn take_all(&mut self) -> Vec<Pending> {
        self.entries.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
