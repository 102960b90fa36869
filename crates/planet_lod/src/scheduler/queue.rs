//! FIFO request queue with front promotion and a pinnable head.

use std::collections::VecDeque;

use super::request::{PriorityKey, Request, RequestKind};
use crate::quadtree::NodeId;

/// Ordered list of pending requests.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
  items: VecDeque<Request>,
}

impl RequestQueue {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.items.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  #[inline]
  pub fn front(&self) -> Option<&Request> {
    self.items.front()
  }

  #[inline]
  pub fn pop_front(&mut self) -> Option<Request> {
    self.items.pop_front()
  }

  #[inline]
  pub fn push_back(&mut self, request: Request) {
    self.items.push_back(request);
  }

  /// Insert at the front, or right behind a pinned head.
  pub fn push_front(&mut self, request: Request, pinned_head: bool) {
    if pinned_head && !self.items.is_empty() {
      self.items.insert(1, request);
    } else {
      self.items.push_front(request);
    }
  }

  /// Move a queued request to the front and mark it urgent.
  ///
  /// Returns false if no such request is queued.
  pub fn promote(&mut self, node: NodeId, kind: RequestKind, pinned_head: bool) -> bool {
    let Some(index) = self
      .items
      .iter()
      .position(|r| r.node == node && r.kind == kind)
    else {
      return false;
    };
    if pinned_head && index == 0 {
      self.items[0].urgent = true;
      return true;
    }
    let Some(mut request) = self.items.remove(index) else {
      return false;
    };
    request.urgent = true;
    self.push_front(request, pinned_head);
    true
  }

  /// Remove every request for `node`. Returns how many were removed.
  pub fn retract(&mut self, node: NodeId) -> usize {
    let before = self.items.len();
    self.items.retain(|r| r.node != node);
    before - self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Request> {
    self.items.iter()
  }

  /// Remove and return every request matching `pred`.
  pub fn drain_where(&mut self, mut pred: impl FnMut(&Request) -> bool) -> Vec<Request> {
    let mut removed = Vec::new();
    self.items.retain(|r| {
      if pred(r) {
        removed.push(*r);
        false
      } else {
        true
      }
    });
    removed
  }

  /// Stable sort by priority. A pinned head keeps its place.
  ///
  /// Urgency only lasts until the resort that ranks it: every request leaves
  /// unmarked and has to be promoted again to stay ahead.
  pub fn resort(&mut self, pinned_head: bool, key: impl Fn(&Request) -> PriorityKey) {
    let skip = usize::from(pinned_head).min(self.items.len());
    let items = self.items.make_contiguous();
    let mut keyed: Vec<(PriorityKey, Request)> = items[skip..].iter().map(|r| (key(r), *r)).collect();
    keyed.sort_by(|a, b| a.0.compare(&b.0));
    for (slot, (_, request)) in items[skip..].iter_mut().zip(keyed) {
      *slot = request;
    }
    for request in items.iter_mut() {
      request.urgent = false;
    }
  }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
