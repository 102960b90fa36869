use slotmap::SlotMap;

use super::*;

fn ids(count: usize) -> Vec<NodeId> {
  let mut arena = SlotMap::<NodeId, ()>::with_key();
  (0..count).map(|_| arena.insert(())).collect()
}

// =========================================================================
// Batch 1: Deduplication
// =========================================================================

/// Requesting the same (node, kind) twice queues one job.
#[test]
fn test_duplicate_request_queued_once() {
  let n = ids(1);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut flags = RequestFlags::EMPTY;

  assert!(scheduler.request(n[0], &mut flags, RequestKind::Split, false));
  assert!(!scheduler.request(n[0], &mut flags, RequestKind::Split, false));
  assert!(!scheduler.request(n[0], &mut flags, RequestKind::Split, true));
  assert_eq!(scheduler.queue(QueueKind::Inline).len(), 1);
  assert!(flags.contains(RequestKind::Split));

  // A different kind is a different request.
  assert!(scheduler.request(n[0], &mut flags, RequestKind::BuildTile, false));
  assert_eq!(scheduler.queue(QueueKind::Render).len(), 1);
  assert_eq!(scheduler.pending(), 2);
}

/// An urgent repeat promotes the pending request to the front.
#[test]
fn test_urgent_repeat_promotes() {
  let n = ids(3);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut flags = vec![RequestFlags::EMPTY; 3];
  for i in 0..3 {
    scheduler.request(n[i], &mut flags[i], RequestKind::BuildRenderable, false);
  }
  scheduler.request(n[2], &mut flags[2], RequestKind::BuildRenderable, true);

  let head = scheduler.peek(QueueKind::Inline).expect("queued");
  assert_eq!(head.node, n[2]);
  assert!(head.urgent);
  assert_eq!(scheduler.queue(QueueKind::Inline).len(), 3);
}

#[test]
fn test_unrequest_retracts_and_clears_flags() {
  let n = ids(2);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut a = RequestFlags::EMPTY;
  let mut b = RequestFlags::EMPTY;
  scheduler.request(n[0], &mut a, RequestKind::BuildTile, false);
  scheduler.request(n[0], &mut a, RequestKind::Split, false);
  scheduler.request(n[1], &mut b, RequestKind::Split, false);

  assert_eq!(scheduler.unrequest(n[0], &mut a), 2);
  assert!(a.is_empty());
  assert_eq!(scheduler.pending(), 1);
  assert_eq!(scheduler.peek(QueueKind::Inline).map(|r| r.node), Some(n[1]));

  // The node may request again afterwards.
  assert!(scheduler.request(n[0], &mut a, RequestKind::Split, false));
}

// =========================================================================
// Batch 2: In-flight synthesis
// =========================================================================

/// Urgent tile requests queue behind the job being synthesized.
#[test]
fn test_in_flight_head_is_pinned() {
  let n = ids(3);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut flags = vec![RequestFlags::EMPTY; 3];
  scheduler.request(n[0], &mut flags[0], RequestKind::BuildTile, false);
  scheduler.request(n[1], &mut flags[1], RequestKind::BuildTile, false);
  scheduler.set_in_flight(Some(n[0]));

  scheduler.request(n[2], &mut flags[2], RequestKind::BuildTile, true);
  let order: Vec<_> = scheduler.queue(QueueKind::Render).iter().map(|r| r.node).collect();
  assert_eq!(order, vec![n[0], n[2], n[1]]);

  // Resorting never displaces the in-flight head.
  scheduler.resort(|r| PriorityKey {
    uncovered: false,
    urgent: r.urgent,
    distance: if r.node == n[0] { 100.0 } else { 1.0 },
    lod: 0,
  });
  assert_eq!(scheduler.peek(QueueKind::Render).map(|r| r.node), Some(n[0]));

  // Popping the head ends the flight.
  scheduler.pop(QueueKind::Render);
  assert_eq!(scheduler.in_flight(), None);
}

#[test]
fn test_unrequest_in_flight_node_clears_flight() {
  let n = ids(1);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut flags = RequestFlags::EMPTY;
  scheduler.request(n[0], &mut flags, RequestKind::BuildTile, false);
  scheduler.set_in_flight(Some(n[0]));
  scheduler.unrequest(n[0], &mut flags);
  assert_eq!(scheduler.in_flight(), None);
  assert_eq!(scheduler.pending(), 0);
}

/// Retracting the in-flight job ends the flight and leaves other work queued.
#[test]
fn test_retract_where_ends_flight() {
  let n = ids(3);
  let mut scheduler = RequestScheduler::new(SchedulerBudget::DEFAULT);
  let mut flags = vec![RequestFlags::EMPTY; 3];
  scheduler.request(n[0], &mut flags[0], RequestKind::BuildTile, false);
  scheduler.request(n[1], &mut flags[1], RequestKind::BuildTile, false);
  scheduler.request(n[2], &mut flags[2], RequestKind::Split, false);
  scheduler.set_in_flight(Some(n[0]));

  let removed = scheduler.retract_where(|r| r.node != n[1]);
  assert_eq!(removed.len(), 2);
  assert!(removed.iter().any(|r| r.node == n[0] && r.kind == RequestKind::BuildTile));
  assert!(removed.iter().any(|r| r.node == n[2] && r.kind == RequestKind::Split));
  assert_eq!(scheduler.in_flight(), None);
  assert_eq!(scheduler.peek(QueueKind::Render).map(|r| r.node), Some(n[1]));
  assert_eq!(scheduler.pending(), 1);

  // Retracting something else keeps the flight.
  scheduler.set_in_flight(Some(n[1]));
  assert!(scheduler.retract_where(|r| r.kind == RequestKind::Merge).is_empty());
  assert_eq!(scheduler.in_flight(), Some(n[1]));
}

// =========================================================================
// Batch 3: Budget
// =========================================================================

#[test]
fn test_budget_caps_spending() {
  let mut scheduler = RequestScheduler::new(SchedulerBudget {
    render_units: 5,
    inline_units: 8,
    ..SchedulerBudget::DEFAULT
  });
  // Tile steps cost 2: two fit in 5 units.
  assert!(scheduler.try_spend(RequestKind::BuildTile));
  assert!(scheduler.try_spend(RequestKind::BuildTile));
  assert!(!scheduler.try_spend(RequestKind::BuildTile));
  assert_eq!(scheduler.stats().render_spent, 4);

  // Splits cost 4, patches 1; the queues have separate budgets.
  assert!(scheduler.try_spend(RequestKind::Split));
  assert!(scheduler.try_spend(RequestKind::Split));
  assert!(!scheduler.try_spend(RequestKind::BuildRenderable));
  assert_eq!(scheduler.stats().inline_spent, 8);

  scheduler.begin_frame();
  assert!(scheduler.try_spend(RequestKind::BuildRenderable));
}

/// A zero budget defers everything.
#[test]
fn test_paused_budget_defers() {
  let mut scheduler = RequestScheduler::new(SchedulerBudget::PAUSED);
  for kind in RequestKind::ALL {
    assert!(!scheduler.try_spend(kind));
  }
  assert_eq!(scheduler.stats().total_spent(), 0);
}
