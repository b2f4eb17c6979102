//! # hirelawyer-state: Appointment Lifecycle
//!
//! The pure core of the booking backend. Nothing in this crate performs
//! I/O: transitions take the Conflict Checker's verdict as input and hand
//! back the effects to perform.
//!
//! - **Appointment** (`appointment.rs`): status enumeration, guards, fee
//!   rules and the eight lifecycle operations.
//! - **Conflict** (`conflict.rs`): the active-slot predicate.
//! - **Effect** (`effect.rs`): message-log entries and notification requests
//!   produced by transitions.

pub mod appointment;
pub mod conflict;
pub mod effect;

pub use appointment::{
    Actor, Appointment, AppointmentError, AppointmentRecord, AppointmentRequest,
    AppointmentStatus, ListScope, Operation, SlotAvailability, Transition,
};
pub use conflict::has_slot_conflict;
pub use effect::{Effect, NewMessage, NotificationKind, NotificationRequest};
