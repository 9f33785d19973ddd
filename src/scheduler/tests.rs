use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use super::*;
use crate::engine::{Engine, StoreError};

const H: Ms = 3_600_000; // 1 hour in ms
const T0: Ms = 1_900_000_000_000;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("campusbook_test_scheduler");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

/// Scheduler with a clock the test can move.
fn scheduler_at(scope: ConflictScope, t: Ms) -> (Scheduler, Arc<AtomicI64>) {
    let clock = Arc::new(AtomicI64::new(t));
    let c = clock.clone();
    let scheduler = Scheduler::new(scope).with_clock(move || c.load(Ordering::SeqCst));
    (scheduler, clock)
}

async fn add_resource(engine: &Engine, policy: BookingPolicy, state: PublicationState) -> Ulid {
    let id = Ulid::new();
    engine
        .create_resource(Resource {
            id,
            owner_id: Ulid::new(),
            title: None,
            booking_policy: policy,
            publication_state: state,
        })
        .await
        .unwrap();
    id
}

async fn open_room(engine: &Engine) -> Ulid {
    add_resource(engine, BookingPolicy::Open, PublicationState::Published).await
}

async fn restricted_room(engine: &Engine) -> Ulid {
    add_resource(engine, BookingPolicy::Restricted, PublicationState::Published).await
}

// ── Admission ────────────────────────────────────────────

#[tokio::test]
async fn back_to_back_bookings_on_open_room() {
    let engine = Engine::new(test_wal_path("back_to_back.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;
    let (u1, u2, u3) = (Ulid::new(), Ulid::new(), Ulid::new());

    let a = s.create_booking(&engine, room, u1, T0 + 10 * H, T0 + 12 * H).await.unwrap();
    assert_eq!(a.status, BookingStatus::Approved);
    assert_eq!(a.created_at, T0);

    let err = s
        .create_booking(&engine, room, u2, T0 + 11 * H, T0 + 13 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == a.id));

    let c = s.create_booking(&engine, room, u3, T0 + 12 * H, T0 + 13 * H).await.unwrap();
    assert_eq!(c.status, BookingStatus::Approved);

    assert_eq!(engine.bookings_for_resource(room).await.unwrap().len(), 2);
    assert!(engine.bookings_for_requester(u2).await.is_empty());
}

#[tokio::test]
async fn restricted_room_queues_pending() {
    let engine = Engine::new(test_wal_path("restricted.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;

    let b = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    assert_eq!(b.status, BookingStatus::Pending);
    assert_eq!(engine.pending_queue().await.len(), 1);
}

#[tokio::test]
async fn unpublished_rooms_refuse_bookings() {
    let engine = Engine::new(test_wal_path("unpublished.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);

    for state in [PublicationState::Draft, PublicationState::Archived] {
        let room = add_resource(&engine, BookingPolicy::Open, state).await;
        let err = s
            .create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::NotBookable { state: got, .. } if got == state));
        assert!(engine.bookings_for_resource(room).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn malformed_or_past_intervals_rejected() {
    let engine = Engine::new(test_wal_path("bad_intervals.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;
    let user = Ulid::new();

    for (start, end) in [
        (T0 + 2 * H, T0 + H),  // inverted
        (T0 + H, T0 + H),      // empty
        (T0 - 2 * H, T0 - H),  // in the past
        (T0 - 1, T0 + H),      // starts just before now
    ] {
        let err = s.create_booking(&engine, room, user, start, end).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInterval(_)), "[{start}, {end}): {err}");
    }
    assert!(matches!(
        s.create_booking(&engine, room, user, T0 + H, T0 + 40 * 24 * H).await,
        Err(SchedulerError::LimitExceeded(_))
    ));
    assert!(engine.bookings_for_resource(room).await.unwrap().is_empty());

    // Starting exactly now is allowed.
    s.create_booking(&engine, room, user, T0, T0 + H).await.unwrap();
}

#[tokio::test]
async fn unknown_resource_not_found() {
    let engine = Engine::new(test_wal_path("unknown_resource.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let ghost = Ulid::new();
    let err = s
        .create_booking(&engine, ghost, Ulid::new(), T0 + H, T0 + 2 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NotFound(id) if id == ghost));
}

#[tokio::test]
async fn pending_booking_blocks_overlap() {
    let engine = Engine::new(test_wal_path("pending_blocks.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;

    let first = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 3 * H).await.unwrap();
    let err = s
        .create_booking(&engine, room, Ulid::new(), T0 + 2 * H, T0 + 4 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == first.id));
    assert_eq!(engine.bookings_for_resource(room).await.unwrap().len(), 1);
    assert!(s.has_conflict(&engine, room, Span::new(T0, T0 + 2 * H), None).await.unwrap());
    assert!(!s
        .has_conflict(&engine, room, Span::new(T0, T0 + 2 * H), Some(first.id))
        .await
        .unwrap());
}

#[tokio::test]
async fn terminal_bookings_free_the_slot() {
    let engine = Engine::new(test_wal_path("terminal_frees.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;

    let rejected = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    s.reject(&engine, rejected.id).await.unwrap();
    let again = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    assert_eq!(again.status, BookingStatus::Pending);
}

// ── Approval ─────────────────────────────────────────────

#[tokio::test]
async fn approve_pending_booking() {
    let engine = Engine::new(test_wal_path("approve.wal")).unwrap();
    let (s, clock) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;

    let b = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    clock.store(T0 + 60_000, Ordering::SeqCst);
    let approved = s.approve(&engine, b.id).await.unwrap();
    assert_eq!(approved.status, BookingStatus::Approved);
    assert_eq!(approved.updated_at, T0 + 60_000);
    assert!(engine.pending_queue().await.is_empty());

    let err = s.approve(&engine, b.id).await.unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::InvalidTransition { from: BookingStatus::Approved, to: BookingStatus::Approved, .. }
    ));
}

#[tokio::test]
async fn approval_race_leaves_loser_pending() {
    let engine = Engine::new(test_wal_path("approval_race.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::ApprovedOnly, T0);
    let room = restricted_room(&engine).await;

    let a = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 3 * H).await.unwrap();
    let b = s.create_booking(&engine, room, Ulid::new(), T0 + 2 * H, T0 + 4 * H).await.unwrap();
    assert_eq!(engine.pending_queue().await.len(), 2);

    s.approve(&engine, a.id).await.unwrap();
    let err = s.approve(&engine, b.id).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == a.id));
    assert_eq!(engine.get_booking(b.id).await.unwrap().status, BookingStatus::Pending);

    // The loser can still be rejected by hand.
    assert_eq!(s.reject(&engine, b.id).await.unwrap().status, BookingStatus::Rejected);
}

#[tokio::test]
async fn approved_only_scope_blocks_on_approved() {
    let engine = Engine::new(test_wal_path("approved_only.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::ApprovedOnly, T0);
    let room = open_room(&engine).await;

    let a = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 3 * H).await.unwrap();
    let err = s
        .create_booking(&engine, room, Ulid::new(), T0 + 2 * H, T0 + 4 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == a.id));
}

// ── Cancellation and completion ──────────────────────────

#[tokio::test]
async fn cancel_frees_slot_immediately() {
    let engine = Engine::new(test_wal_path("cancel.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;

    let a = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    assert_eq!(s.cancel(&engine, a.id).await.unwrap().status, BookingStatus::Cancelled);
    let b = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    assert_eq!(b.status, BookingStatus::Approved);

    let restricted = restricted_room(&engine).await;
    let p = s.create_booking(&engine, restricted, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    assert_eq!(s.cancel(&engine, p.id).await.unwrap().status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn complete_only_after_end_and_only_from_approved() {
    let engine = Engine::new(test_wal_path("complete.wal")).unwrap();
    let (s, clock) = scheduler_at(ConflictScope::Active, T0);
    let open = open_room(&engine).await;
    let restricted = restricted_room(&engine).await;

    let a = s.create_booking(&engine, open, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    let p = s.create_booking(&engine, restricted, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();

    clock.store(T0 + H + 1, Ordering::SeqCst);
    assert!(matches!(
        s.complete(&engine, a.id).await,
        Err(SchedulerError::InvalidTransition { .. })
    ));

    clock.store(T0 + 2 * H, Ordering::SeqCst);
    assert_eq!(s.complete(&engine, a.id).await.unwrap().status, BookingStatus::Completed);
    assert!(matches!(
        s.complete(&engine, p.id).await,
        Err(SchedulerError::InvalidTransition { from: BookingStatus::Pending, .. })
    ));
}

#[tokio::test]
async fn terminal_states_refuse_every_transition() {
    let engine = Engine::new(test_wal_path("terminal.wal")).unwrap();
    let (s, clock) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;
    let user = Ulid::new();

    let rejected = s.create_booking(&engine, room, user, T0 + H, T0 + 2 * H).await.unwrap();
    s.reject(&engine, rejected.id).await.unwrap();
    let cancelled = s.create_booking(&engine, room, user, T0 + 3 * H, T0 + 4 * H).await.unwrap();
    s.cancel(&engine, cancelled.id).await.unwrap();
    let completed = s.create_booking(&engine, room, user, T0 + 5 * H, T0 + 6 * H).await.unwrap();
    s.approve(&engine, completed.id).await.unwrap();
    clock.store(T0 + 7 * H, Ordering::SeqCst);
    s.complete(&engine, completed.id).await.unwrap();

    for b in [&rejected, &cancelled, &completed] {
        assert!(s.approve(&engine, b.id).await.is_err());
        assert!(s.reject(&engine, b.id).await.is_err());
        assert!(s.cancel(&engine, b.id).await.is_err());
        assert!(s.complete(&engine, b.id).await.is_err());
    }
    assert_eq!(engine.get_booking(rejected.id).await.unwrap().status, BookingStatus::Rejected);
    assert_eq!(engine.get_booking(cancelled.id).await.unwrap().status, BookingStatus::Cancelled);
    assert_eq!(engine.get_booking(completed.id).await.unwrap().status, BookingStatus::Completed);
}

#[tokio::test]
async fn transition_on_unknown_booking_not_found() {
    let engine = Engine::new(test_wal_path("unknown_booking.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let ghost = Ulid::new();
    assert!(matches!(s.cancel(&engine, ghost).await, Err(SchedulerError::NotFound(id)) if id == ghost));
}

// ── Concurrency ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_slot_admit_exactly_one() {
    let engine = Arc::new(Engine::new(test_wal_path("admission_race.wal")).unwrap());
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;

    let tasks = (0..32).map(|i| {
        let e = engine.clone();
        let s = s.clone();
        // Every request overlaps every other one.
        tokio::spawn(async move {
            s.create_booking(&*e, room, Ulid::new(), T0 + H + i, T0 + 3 * H + i).await
        })
    });
    let results = futures::future::join_all(tasks).await;

    let admitted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(SchedulerError::Conflict(_)))))
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(conflicts, 31);
    assert_eq!(engine.list_active_bookings(room).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_approve_exactly_one() {
    let engine = Arc::new(Engine::new(test_wal_path("approval_concurrent.wal")).unwrap());
    let (s, _) = scheduler_at(ConflictScope::ApprovedOnly, T0);
    let room = restricted_room(&engine).await;

    let mut pending = Vec::new();
    for i in 0..8 {
        let b = s
            .create_booking(&*engine, room, Ulid::new(), T0 + H + i, T0 + 2 * H + i)
            .await
            .unwrap();
        pending.push(b.id);
    }

    let tasks = pending.iter().map(|&id| {
        let e = engine.clone();
        let s = s.clone();
        tokio::spawn(async move { s.approve(&*e, id).await })
    });
    let results = futures::future::join_all(tasks).await;
    assert_eq!(results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count(), 1);

    let approved = engine
        .bookings_for_resource(room)
        .await
        .unwrap()
        .iter()
        .filter(|b| b.status == BookingStatus::Approved)
        .count();
    assert_eq!(approved, 1);
    assert_eq!(engine.pending_queue().await.len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_requests_all_admitted() {
    let engine = Arc::new(Engine::new(test_wal_path("disjoint.wal")).unwrap());
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;

    let tasks = (0..24).map(|i| {
        let e = engine.clone();
        let s = s.clone();
        tokio::spawn(async move {
            s.create_booking(&*e, room, Ulid::new(), T0 + i * H, T0 + (i + 1) * H).await
        })
    });
    for r in futures::future::join_all(tasks).await {
        r.unwrap().unwrap();
    }
    let active = engine.list_active_bookings(room).await.unwrap();
    assert_eq!(active.len(), 24);
    assert!(active.windows(2).all(|w| w[0].span.end <= w[1].span.start));
}

// ── Waitlist ─────────────────────────────────────────────

#[tokio::test]
async fn waitlist_join_and_leave() {
    let engine = Engine::new(test_wal_path("waitlist_join.wal")).unwrap();
    let (s, clock) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;
    let (first, second) = (Ulid::new(), Ulid::new());

    s.join_waitlist(&engine, room, first, None).await.unwrap();
    clock.store(T0 + 1, Ordering::SeqCst);
    s.join_waitlist(&engine, room, second, Some(Span::new(T0 + H, T0 + 2 * H)))
        .await
        .unwrap();

    let err = s.join_waitlist(&engine, room, first, None).await.unwrap_err();
    assert!(matches!(err, SchedulerError::AlreadyWaitlisted(u) if u == first));

    let users: Vec<Ulid> = s.waitlist(&engine, room).await.unwrap().iter().map(|e| e.user_id).collect();
    assert_eq!(users, vec![first, second]);

    s.leave_waitlist(&engine, room, first).await.unwrap();
    let users: Vec<Ulid> = s.waitlist(&engine, room).await.unwrap().iter().map(|e| e.user_id).collect();
    assert_eq!(users, vec![second]);
    assert!(matches!(
        s.leave_waitlist(&engine, room, first).await,
        Err(SchedulerError::NotFound(_))
    ));
}

#[tokio::test]
async fn waitlist_rejects_malformed_preference() {
    let engine = Engine::new(test_wal_path("waitlist_bad_pref.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;
    let err = s
        .join_waitlist(&engine, room, Ulid::new(), Some(Span { start: T0 + H, end: T0 }))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidInterval(_)));
    assert!(s.waitlist(&engine, room).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancellation_notifies_interested_waiters() {
    let engine = Engine::new(test_wal_path("waitlist_notify.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = open_room(&engine).await;

    let b = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    let anytime = Ulid::new();
    let same_slot = Ulid::new();
    let other_day = Ulid::new();
    s.join_waitlist(&engine, room, anytime, None).await.unwrap();
    s.join_waitlist(&engine, room, same_slot, Some(Span::new(T0 + H, T0 + 2 * H)))
        .await
        .unwrap();
    s.join_waitlist(&engine, room, other_day, Some(Span::new(T0 + 24 * H, T0 + 25 * H)))
        .await
        .unwrap();

    s.cancel(&engine, b.id).await.unwrap();

    let list = s.waitlist(&engine, room).await.unwrap();
    let notice_of = |user| list.iter().find(|e| e.user_id == user).unwrap().notice;
    assert_eq!(notice_of(anytime), WaitlistNotice::Notified);
    assert_eq!(notice_of(same_slot), WaitlistNotice::Notified);
    assert_eq!(notice_of(other_day), WaitlistNotice::Waiting);
}

#[tokio::test]
async fn approval_does_not_touch_waitlist() {
    let engine = Engine::new(test_wal_path("waitlist_approve.wal")).unwrap();
    let (s, _) = scheduler_at(ConflictScope::Active, T0);
    let room = restricted_room(&engine).await;

    let b = s.create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H).await.unwrap();
    let waiter = Ulid::new();
    s.join_waitlist(&engine, room, waiter, None).await.unwrap();
    s.approve(&engine, b.id).await.unwrap();
    assert_eq!(s.waitlist(&engine, room).await.unwrap()[0].notice, WaitlistNotice::Waiting);

    let other = s.create_booking(&engine, room, Ulid::new(), T0 + 5 * H, T0 + 6 * H).await.unwrap();
    s.reject(&engine, other.id).await.unwrap();
    assert_eq!(s.waitlist(&engine, room).await.unwrap()[0].notice, WaitlistNotice::Notified);
}

// ── Persistence ──────────────────────────────────────────

#[tokio::test]
async fn statuses_survive_restart() {
    let path = test_wal_path("restart.wal");
    let (s, clock) = scheduler_at(ConflictScope::Active, T0);
    let room;
    let approved;
    let cancelled;
    let pending;

    {
        let engine = Engine::new(path.clone()).unwrap();
        room = restricted_room(&engine).await;
        let user = Ulid::new();
        approved = s.create_booking(&engine, room, user, T0 + H, T0 + 2 * H).await.unwrap().id;
        cancelled = s.create_booking(&engine, room, user, T0 + 3 * H, T0 + 4 * H).await.unwrap().id;
        pending = s.create_booking(&engine, room, user, T0 + 5 * H, T0 + 6 * H).await.unwrap().id;
        s.approve(&engine, approved).await.unwrap();
        s.cancel(&engine, cancelled).await.unwrap();
    }

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.get_booking(approved).await.unwrap().status, BookingStatus::Approved);
    assert_eq!(engine.get_booking(cancelled).await.unwrap().status, BookingStatus::Cancelled);
    assert_eq!(engine.get_booking(pending).await.unwrap().status, BookingStatus::Pending);

    // The replayed state still enforces the slot.
    let err = s
        .create_booking(&engine, room, Ulid::new(), T0 + H, T0 + 2 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == approved));
    clock.store(T0 + 2 * H, Ordering::SeqCst);
    assert_eq!(s.complete(&engine, approved).await.unwrap().status, BookingStatus::Completed);
}

// ── Store seam ───────────────────────────────────────────

/// Store whose exclusion check always fires, standing in for a database
/// constraint that catches a write the scheduler's own check missed.
struct ConflictingStore {
    inner: Engine,
    blocker: Ulid,
}

#[async_trait::async_trait]
impl BookingStore for ConflictingStore {
    type Guard = <Engine as BookingStore>::Guard;

    async fn lock_resource(&self, resource_id: Ulid) -> Result<Self::Guard, StoreError> {
        self.inner.lock_resource(resource_id).await
    }
    async fn get_resource(&self, resource_id: Ulid) -> Result<Resource, StoreError> {
        self.inner.get_resource(resource_id).await
    }
    async fn get_booking(&self, booking_id: Ulid) -> Result<Booking, StoreError> {
        self.inner.get_booking(booking_id).await
    }
    async fn list_active_bookings(&self, resource_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        self.inner.list_active_bookings(resource_id).await
    }
    async fn insert_booking(&self, _booking: Booking) -> Result<Booking, StoreError> {
        Err(StoreError::Conflict(self.blocker))
    }
    async fn update_booking_status(
        &self,
        booking_id: Ulid,
        status: BookingStatus,
        at: Ms,
    ) -> Result<Booking, StoreError> {
        self.inner.update_booking_status(booking_id, status, at).await
    }
    async fn list_waitlist(&self, resource_id: Ulid) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.inner.list_waitlist(resource_id).await
    }
    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, StoreError> {
        self.inner.insert_waitlist_entry(entry).await
    }
    async fn remove_waitlist_entry(
        &self,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<WaitlistEntry, StoreError> {
        self.inner.remove_waitlist_entry(resource_id, user_id).await
    }
    async fn flag_waitlist(
        &self,
        resource_id: Ulid,
        ids: Vec<Ulid>,
        notice: WaitlistNotice,
    ) -> Result<(), StoreError> {
        self.inner.flag_waitlist(resource_id, ids, notice).await
    }
}

#[tokio::test]
async fn store_exclusion_surfaces_as_conflict() {
    let inner = Engine::new(test_wal_path("store_conflict.wal")).unwrap();
    let room = open_room(&inner).await;
    let blocker = Ulid::new();
    let store = ConflictingStore { inner, blocker };
    let (s, _) = scheduler_at(ConflictScope::Active, T0);

    let err = s
        .create_booking(&store, room, Ulid::new(), T0 + H, T0 + 2 * H)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(id) if id == blocker));
}
