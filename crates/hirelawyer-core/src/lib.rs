//! # hirelawyer-core: Foundational Types for the Booking Backend
//!
//! Leaf crate of the workspace. Defines the domain primitives every other
//! crate builds on and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `AppointmentId`,
//!    `MessageId`, `NotificationId` are distinct types. A lawyer id cannot be
//!    passed where an appointment id is expected.
//!
//! 2. **Closed enumerations for roles.** [`Role`] has exactly three variants
//!    and every guard matches on it exhaustively. No string comparisons.
//!
//! 3. **Integer money.** [`Fee`] stores cents in an `i64` and is non-negative
//!    by construction. Floats never reach storage.
//!
//! 4. **One error taxonomy.** [`ErrorKind`] is the classification every
//!    failure in the system reports, from validation to storage faults.
//!
//! ## Crate Policy
//!
//! - No I/O, no async.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod money;
pub mod role;
pub mod slot;

pub use error::{ErrorKind, ValidationError};
pub use identity::{AppointmentId, MessageId, NotificationId, UserId};
pub use money::{Fee, FeeInput};
pub use role::Role;
pub use slot::Slot;
