pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod scheduler;
pub mod sweeper;
pub mod wal;

pub use engine::{BookingStore, Engine, StoreError};
pub use scheduler::{ConflictScope, Scheduler, SchedulerError};
