//! Event-creation wizard and session scheduler for sim-racing team events.

pub mod calendar;
pub mod clock;
pub mod config;
pub mod directory;
pub mod draft;
pub mod errors;
pub mod paddock;
pub mod schedule;
pub mod session;
pub mod steps;
pub mod storage;
pub mod store;
pub mod wizard;

pub use calendar::{MonthGrid, WeekStart, build_grid};
pub use clock::{TimeOfDay, to_instant};
pub use directory::{Driver, DriverDirectory, EventCommand, EventSink, Team, TeamDirectory};
pub use errors::{SinkError, WizardError};
pub use schedule::{format_span, order_sessions};
pub use session::{FieldErrors, ScheduledSession, Session, SessionDraft, SessionKind, validate};
pub use steps::{StepId, StepPatch, StepRecords};
pub use store::WizardStore;
