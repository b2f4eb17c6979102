//! # Demo Data
//!
//! A small fixed data set for local development: one admin, two clients,
//! two lawyers, a pending request and an appointment under negotiation.
//! User ids are constant so bearer tokens can be written down once.
//!
//! Appointments are created through [`BookingService`], so the seeded rows
//! carry the same message log entries and notifications a live request
//! would. Re-running is safe: a slot that is already held is skipped.

use hirelawyer_core::{Fee, Role, Slot, UserId, ValidationError};
use hirelawyer_state::{Actor, Appointment, AppointmentError};
use uuid::Uuid;

use crate::booking::{BookingError, BookingService, CreateAppointment};
use crate::repository::{Lawyer, StoreError};

/// A demo account.
#[derive(Debug, Clone)]
pub struct DemoUser {
    pub name: &'static str,
    pub actor: Actor,
}

/// Everything the seed writes.
#[derive(Debug, Clone)]
pub struct DemoData {
    pub admin: DemoUser,
    pub clients: [DemoUser; 2],
    pub lawyers: [DemoUser; 2],
    pub listings: Vec<Lawyer>,
}

fn user(name: &'static str, id: u128, role: Role) -> DemoUser {
    DemoUser {
        name,
        actor: Actor::new(UserId::from_uuid(Uuid::from_u128(id)), role),
    }
}

impl DemoData {
    pub fn new() -> Result<Self, ValidationError> {
        let lawyers = [
            user("Adv. Sushil Koirala", 0x1_0004, Role::Lawyer),
            user("Adv. Rina Shrestha", 0x1_0005, Role::Lawyer),
        ];
        let listings = vec![
            Lawyer {
                id: lawyers[0].actor.id,
                name: lawyers[0].name.to_string(),
                hourly_rate: Fee::parse("150.00")?,
            },
            Lawyer {
                id: lawyers[1].actor.id,
                name: lawyers[1].name.to_string(),
                hourly_rate: Fee::parse("100.00")?,
            },
        ];
        Ok(Self {
            admin: user("Admin User", 0x1_0001, Role::Admin),
            clients: [
                user("Client One", 0x1_0002, Role::Client),
                user("Client Two", 0x1_0003, Role::Client),
            ],
            lawyers,
            listings,
        })
    }

    pub fn users(&self) -> impl Iterator<Item = &DemoUser> {
        std::iter::once(&self.admin)
            .chain(self.clients.iter())
            .chain(self.lawyers.iter())
    }
}

/// What a seed run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Create the demo appointments. Lawyer listings must already be stored.
pub async fn apply(booking: &BookingService, demo: &DemoData) -> Result<SeedReport, BookingError> {
    let mut report = SeedReport::default();

    let pending = CreateAppointment {
        lawyer_id: demo.lawyers[0].actor.id,
        slot: Slot::parse("2026-02-10", "10:00")?,
        subject: "Company Registration".to_string(),
        details: Some("Need help registering a Pvt. Ltd.".to_string()),
        proposed_fee: Some(Fee::parse("150")?),
    };
    create_once(booking, &demo.clients[0].actor, pending, &mut report).await?;

    let negotiating = CreateAppointment {
        lawyer_id: demo.lawyers[1].actor.id,
        slot: Slot::parse("2026-02-11", "14:00")?,
        subject: "Divorce Consultation".to_string(),
        details: Some("Discuss process and documentation.".to_string()),
        proposed_fee: Some(Fee::parse("100")?),
    };
    if let Some(appointment) =
        create_once(booking, &demo.clients[1].actor, negotiating, &mut report).await?
    {
        booking
            .offer(
                &demo.lawyers[1].actor,
                appointment.id(),
                Fee::parse("140")?,
                Some("I can do it for $140 due to complexity.".to_string()),
            )
            .await?;
    }

    for u in demo.users() {
        tracing::info!(
            name = u.name,
            role = %u.actor.role,
            user_id = %u.actor.id,
            "demo user"
        );
    }
    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        "demo data seeded"
    );
    Ok(report)
}

async fn create_once(
    booking: &BookingService,
    client: &Actor,
    command: CreateAppointment,
    report: &mut SeedReport,
) -> Result<Option<Appointment>, BookingError> {
    let slot = command.slot;
    match booking.create(client, command).await {
        Ok(appointment) => {
            report.created += 1;
            Ok(Some(appointment))
        }
        Err(BookingError::Store(StoreError::SlotTaken { .. }))
        | Err(BookingError::Appointment(AppointmentError::SlotConflict { .. })) => {
            tracing::info!(%slot, "demo slot already booked, skipping");
            report.skipped += 1;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hirelawyer_state::{AppointmentStatus, ListScope};

    use crate::notify::MemoryNotifier;
    use crate::repository::{AppointmentRepository, MemoryStore};

    fn service(demo: &DemoData) -> (BookingService, MemoryStore, MemoryNotifier) {
        let store = MemoryStore::new();
        for listing in &demo.listings {
            store.upsert_lawyer(listing.clone());
        }
        let notifier = MemoryNotifier::new();
        let shared = Arc::new(store.clone());
        let booking = BookingService::new(
            shared.clone(),
            shared.clone(),
            shared,
            Arc::new(notifier.clone()),
        );
        (booking, store, notifier)
    }

    #[tokio::test]
    async fn seeds_pending_and_negotiating() {
        let demo = DemoData::new().unwrap();
        let (booking, store, notifier) = service(&demo);

        let report = apply(&booking, &demo).await.unwrap();
        assert_eq!(report, SeedReport { created: 2, skipped: 0 });

        let all = AppointmentRepository::list(&store, ListScope::All).await.unwrap();
        let mut statuses: Vec<_> = all.iter().map(|a| a.status()).collect();
        statuses.sort_by_key(|s| s.as_str());
        assert_eq!(
            statuses,
            vec![AppointmentStatus::Negotiating, AppointmentStatus::Pending]
        );
        let negotiating = all
            .iter()
            .find(|a| a.status() == AppointmentStatus::Negotiating)
            .unwrap();
        assert_eq!(
            negotiating.record().offered_fee,
            Some(Fee::parse("140.00").unwrap())
        );
        assert_eq!(
            negotiating.record().negotiation_note.as_deref(),
            Some("I can do it for $140 due to complexity.")
        );
        assert_eq!(notifier.all().len(), 3);
    }

    #[tokio::test]
    async fn second_run_skips() {
        let demo = DemoData::new().unwrap();
        let (booking, store, _) = service(&demo);
        apply(&booking, &demo).await.unwrap();
        let report = apply(&booking, &demo).await.unwrap();
        assert_eq!(report, SeedReport { created: 0, skipped: 2 });
        assert_eq!(store.appointment_count(), 2);
    }

    #[test]
    fn demo_ids_are_stable() {
        let a = DemoData::new().unwrap();
        let b = DemoData::new().unwrap();
        let ids_a: Vec<_> = a.users().map(|u| u.actor.id).collect();
        let ids_b: Vec<_> = b.users().map(|u| u.actor.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a.len(), 5);
    }
}
