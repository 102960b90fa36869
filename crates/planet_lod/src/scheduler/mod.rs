//! Budgeted dual-queue request scheduler.
//!
//! Traversal discovers what the tree needs and files requests; it never does
//! the work itself. Once per frame the planet drains both queues under the
//! weighted [`SchedulerBudget`]:
//!
//! - **Render queue**: tile synthesis. One job slot runs one pipeline step,
//!   so the job being synthesized stays at the head until its tile is done.
//! - **Inline queue**: patch builds, splits and merges.
//!
//! Requests are deduplicated through each node's [`RequestFlags`]; asking
//! again for something already queued only promotes it when urgent. A
//! promotion lasts until the next resort.

pub mod budget;
pub mod queue;
pub mod request;

pub use budget::{SchedulerBudget, SchedulerStats};
pub use queue::RequestQueue;
pub use request::{PriorityKey, QueueKind, Request, RequestFlags, RequestKind};

use crate::quadtree::NodeId;

/// Per-planet request scheduler.
#[derive(Clone, Debug, Default)]
pub struct RequestScheduler {
  render_queue: RequestQueue,
  inline_queue: RequestQueue,
  budget: SchedulerBudget,
  stats: SchedulerStats,
  /// Node whose synthesis is in flight at the render queue head.
  in_flight: Option<NodeId>,
}

impl RequestScheduler {
  pub fn new(budget: SchedulerBudget) -> Self {
    Self {
      budget,
      ..Default::default()
    }
  }

  #[inline]
  pub fn budget(&self) -> &SchedulerBudget {
    &self.budget
  }

  pub fn set_budget(&mut self, budget: SchedulerBudget) {
    self.budget = budget;
  }

  /// Work done so far this frame.
  #[inline]
  pub fn stats(&self) -> &SchedulerStats {
    &self.stats
  }

  #[inline]
  pub fn stats_mut(&mut self) -> &mut SchedulerStats {
    &mut self.stats
  }

  #[inline]
  pub fn queue(&self, queue: QueueKind) -> &RequestQueue {
    match queue {
      QueueKind::Render => &self.render_queue,
      QueueKind::Inline => &self.inline_queue,
    }
  }

  #[inline]
  fn queue_mut(&mut self, queue: QueueKind) -> &mut RequestQueue {
    match queue {
      QueueKind::Render => &mut self.render_queue,
      QueueKind::Inline => &mut self.inline_queue,
    }
  }

  /// Total queued requests.
  #[inline]
  pub fn pending(&self) -> usize {
    self.render_queue.len() + self.inline_queue.len()
  }

  #[inline]
  pub fn in_flight(&self) -> Option<NodeId> {
    self.in_flight
  }

  /// Mark the render queue head as being synthesized (or not).
  pub fn set_in_flight(&mut self, node: Option<NodeId>) {
    debug_assert!(
      node.is_none() || self.render_queue.front().map(|r| r.node) == node,
      "in-flight synthesis must be at the render queue head"
    );
    self.in_flight = node;
  }

  fn pinned(&self, queue: QueueKind) -> bool {
    queue == QueueKind::Render && self.in_flight.is_some()
  }

  /// File a request for `node` unless one of the same kind is pending.
  ///
  /// Urgent requests go to the queue front; an urgent repeat promotes the
  /// pending request. Returns true if a new request was queued.
  pub fn request(&mut self, node: NodeId, flags: &mut RequestFlags, kind: RequestKind, urgent: bool) -> bool {
    let queue = kind.queue();
    let pinned = self.pinned(queue);
    if flags.contains(kind) {
      if urgent && self.in_flight != Some(node) {
        self.queue_mut(queue).promote(node, kind, pinned);
      }
      return false;
    }
    flags.insert(kind);
    let request = Request { node, kind, urgent };
    if urgent {
      self.queue_mut(queue).push_front(request, pinned);
    } else {
      self.queue_mut(queue).push_back(request);
    }
    true
  }

  /// Retract every pending request of `node` and clear its flags.
  ///
  /// The caller resets the synthesizer first if `node` is in flight.
  pub fn unrequest(&mut self, node: NodeId, flags: &mut RequestFlags) -> usize {
    if self.in_flight == Some(node) {
      self.in_flight = None;
    }
    flags.clear();
    self.render_queue.retract(node) + self.inline_queue.retract(node)
  }

  /// Head of a queue.
  #[inline]
  pub fn peek(&self, queue: QueueKind) -> Option<Request> {
    self.queue(queue).front().copied()
  }

  /// Remove the head of a queue.
  pub fn pop(&mut self, queue: QueueKind) -> Option<Request> {
    let request = self.queue_mut(queue).pop_front()?;
    if queue == QueueKind::Render && self.in_flight == Some(request.node) {
      self.in_flight = None;
    }
    Some(request)
  }

  /// Charge one job of `kind` against its queue's budget.
  ///
  /// Returns false, charging nothing, when the frame's budget for that queue
  /// cannot cover it.
  pub fn try_spend(&mut self, kind: RequestKind) -> bool {
    let cost = self.budget.cost(kind);
    match kind.queue() {
      QueueKind::Render => {
        if !self.budget.can_render(self.stats.render_spent, cost) {
          return false;
        }
        self.stats.render_spent += cost;
      }
      QueueKind::Inline => {
        if !self.budget.can_inline(self.stats.inline_spent, cost) {
          return false;
        }
        self.stats.inline_spent += cost;
      }
    }
    true
  }

  /// Start a new frame's accounting.
  pub fn begin_frame(&mut self) {
    self.stats = SchedulerStats::default();
  }

  /// Retract every queued request matching `stale`.
  ///
  /// Returns the removed requests; flags on nodes are the caller's to clear,
  /// and so is resetting the synthesizer when the in-flight job was removed.
  pub fn retract_where(&mut self, mut stale: impl FnMut(&Request) -> bool) -> Vec<Request> {
    let mut removed = self.render_queue.drain_where(&mut stale);
    removed.extend(self.inline_queue.drain_where(&mut stale));
    if let Some(node) = self.in_flight {
      if removed.iter().any(|r| r.node == node && r.kind == RequestKind::BuildTile) {
        self.in_flight = None;
      }
    }
    removed
  }

  /// Re-sort both queues by a freshly computed priority key.
  pub fn resort(&mut self, key: impl Fn(&Request) -> PriorityKey) {
    let pinned = self.pinned(QueueKind::Render);
    self.render_queue.resort(pinned, &key);
    self.inline_queue.resort(false, &key);
  }

  /// Drop every request. Flags on nodes are the caller's to clear.
  pub fn clear(&mut self) {
    self.render_queue = RequestQueue::new();
    self.inline_queue = RequestQueue::new();
    self.in_flight = None;
  }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
