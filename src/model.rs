use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Checked constructor for caller-supplied bounds.
    pub fn try_new(start: Ms, end: Ms) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// Whether new bookings on a resource are approved on admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingPolicy {
    Open,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationState {
    Draft,
    Published,
    Archived,
}

/// A bookable room, desk or piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub title: Option<String>,
    pub booking_policy: BookingPolicy,
    pub publication_state: PublicationState,
}

impl Resource {
    pub fn is_bookable(&self) -> bool {
        self.publication_state == PublicationState::Published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Pending and approved bookings hold their slot.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// The legal edges of the booking lifecycle.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Rejected | Cancelled) | (Approved, Cancelled | Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub requester_id: Ulid,
    pub span: Span,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

/// Where a waitlist entry stands with respect to freed slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitlistNotice {
    Waiting,
    /// A matching slot was freed since the user joined.
    Notified,
    /// The preferred window passed without a slot opening up.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub user_id: Ulid,
    /// `None` means any slot will do.
    pub preferred: Option<Span>,
    pub created_at: Ms,
    pub notice: WaitlistNotice,
}

impl WaitlistEntry {
    /// True if a freed `span` is of interest to this entry.
    pub fn wants(&self, span: &Span) -> bool {
        self.notice == WaitlistNotice::Waiting && self.preferred.is_none_or(|p| p.overlaps(span))
    }
}

#[derive(Debug, Clone)]
pub struct ResourceState {
    pub resource: Resource,
    /// Every booking ever admitted, sorted by `span.start`.
    pub bookings: Vec<Booking>,
    /// Waitlist entries in join order.
    pub waitlist: Vec<WaitlistEntry>,
}

impl ResourceState {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            bookings: Vec::new(),
            waitlist: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    /// Return only bookings whose span overlaps the query window.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        // Everything at index >= right_bound starts at or after query.end → can't overlap.
        let right_bound = self.bookings.partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    pub fn active_bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(|b| b.status.is_active())
    }
}

/// Booking log records. Flat, one per state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ResourceCreated {
        resource: Resource,
    },
    ResourceUpdated {
        id: Ulid,
        title: Option<String>,
        booking_policy: BookingPolicy,
        publication_state: PublicationState,
    },
    BookingCreated {
        booking: Booking,
    },
    BookingStatusChanged {
        id: Ulid,
        resource_id: Ulid,
        status: BookingStatus,
        at: Ms,
    },
    WaitlistJoined {
        entry: WaitlistEntry,
    },
    WaitlistLeft {
        id: Ulid,
        resource_id: Ulid,
    },
    WaitlistFlagged {
        ids: Vec<Ulid>,
        resource_id: Ulid,
        notice: WaitlistNotice,
    },
}

impl Event {
    /// The resource an event applies to.
    pub fn resource_id(&self) -> Ulid {
        match self {
            Event::ResourceCreated { resource } => resource.id,
            Event::ResourceUpdated { id, .. } => *id,
            Event::BookingCreated { booking } => booking.resource_id,
            Event::WaitlistJoined { entry } => entry.resource_id,
            Event::BookingStatusChanged { resource_id, .. }
            | Event::WaitlistLeft { resource_id, .. }
            | Event::WaitlistFlagged { resource_id, .. } => *resource_id,
        }
    }
}
