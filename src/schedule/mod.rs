pub mod types;
pub mod availability;
pub mod ledger;
pub mod guard;
pub mod daily;
pub mod balance;
pub mod generator;

pub use types::{DailyAssignment, LabSlot, Reassignment, Roster, ShiftType, StaffMember, TimeWindow};
pub use availability::Availability;
pub use ledger::WorkloadLedger;
pub use daily::DailyAssignmentEngine;
pub use balance::{BalanceReport, StopReason, WorkloadBalancer};
pub use generator::{generate_schedule, GeneratedSchedule};
