//! # Conflict Checker
//!
//! Decides whether a lawyer's slot is already held by another active
//! appointment. Only `pending`, `negotiating` and `approved` appointments
//! hold a slot; a match requires both the date and the time to be equal.
//!
//! Storage backends that cannot hand over an iterator (PostgreSQL) run the
//! same predicate as a query and back it with a partial unique index.

use hirelawyer_core::{AppointmentId, Slot, UserId};

use crate::appointment::{AppointmentRecord, SlotAvailability};

/// Whether `record` holds `slot` on `lawyer`'s calendar, ignoring `exclude`.
pub fn occupies(
    record: &AppointmentRecord,
    lawyer: UserId,
    slot: &Slot,
    exclude: Option<AppointmentId>,
) -> bool {
    record.lawyer_id == lawyer
        && record.slot == *slot
        && record.status.is_active()
        && Some(record.id) != exclude
}

/// Whether any other active appointment holds the slot.
pub fn has_slot_conflict<'a, I>(
    appointments: I,
    lawyer: UserId,
    slot: &Slot,
    exclude: Option<AppointmentId>,
) -> bool
where
    I: IntoIterator<Item = &'a AppointmentRecord>,
{
    appointments
        .into_iter()
        .any(|record| occupies(record, lawyer, slot, exclude))
}

/// [`has_slot_conflict`] as a verdict for the state machine.
pub fn availability<'a, I>(
    appointments: I,
    lawyer: UserId,
    slot: &Slot,
    exclude: Option<AppointmentId>,
) -> SlotAvailability
where
    I: IntoIterator<Item = &'a AppointmentRecord>,
{
    SlotAvailability::from_conflict(has_slot_conflict(appointments, lawyer, slot, exclude))
}
