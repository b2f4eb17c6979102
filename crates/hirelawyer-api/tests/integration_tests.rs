//! # Integration Tests for hirelawyer-api
//!
//! Drives the full router over in-memory storage: the booking lifecycle,
//! fee negotiation, slot conflicts, message logs, notification inboxes,
//! authentication, error bodies and the OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use hirelawyer_api::notify::MemoryNotifier;
use hirelawyer_api::repository::{Lawyer, MemoryStore};
use hirelawyer_api::state::{AppConfig, AppState};
use hirelawyer_core::{Fee, UserId};
use hirelawyer_state::{AppointmentRecord, AppointmentStatus};

const TOKEN: &str = "test-secret";

struct Harness {
    app: axum::Router,
    store: MemoryStore,
    client: UserId,
    other_client: UserId,
    lawyer: UserId,
    admin: UserId,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AppConfig {
            auth_token: Some(TOKEN.to_string()),
            ..AppConfig::default()
        })
    }

    fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        let lawyer = UserId::new();
        store.upsert_lawyer(Lawyer {
            id: lawyer,
            name: "Adv. Test".to_string(),
            hourly_rate: Fee::parse("150").unwrap(),
        });
        let state = AppState::in_memory(config, store.clone(), MemoryNotifier::new());
        Self {
            app: hirelawyer_api::app(state),
            store,
            client: UserId::new(),
            other_client: UserId::new(),
            lawyer,
            admin: UserId::new(),
        }
    }

    fn bearer(role: &str, id: UserId) -> String {
        format!("Bearer {role}:{id}:{TOKEN}")
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<String>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn as_client(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(Self::bearer("client", self.client)), body)
            .await
    }

    async fn as_lawyer(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(Self::bearer("lawyer", self.lawyer)), body)
            .await
    }

    async fn as_admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(Self::bearer("admin", self.admin)), body)
            .await
    }

    async fn create(&self, time: &str) -> String {
        let (status, body) = self
            .as_client(
                "POST",
                "/v1/appointments",
                Some(json!({
                    "lawyer_id": self.lawyer.to_string(),
                    "appointment_date": "2026-02-10",
                    "appointment_time": time,
                    "subject": "Contract review",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["appointment_id"].as_str().unwrap().to_string()
    }

    async fn appointment(&self, id: &str) -> Value {
        let (status, body) = self
            .as_admin("GET", &format!("/v1/appointments/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes_need_no_auth() {
    let h = Harness::new();
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_not_found_without_recorder() {
    let h = Harness::new();
    let (status, _) = h.send("GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Scenarios ----------------------------------------------------------------

#[tokio::test]
async fn test_scenario_a_default_fee_is_hourly_rate() {
    let h = Harness::new();
    let id = h.create("10:00").await;
    let appt = h.appointment(&id).await;
    assert_eq!(appt["status"], "pending");
    assert_eq!(appt["proposed_fee"], "150.00");
    assert_eq!(appt["offered_fee"], Value::Null);
    assert_eq!(appt["final_fee"], Value::Null);
    assert_eq!(appt["appointment_time"], "10:00");
}

#[tokio::test]
async fn test_scenario_b_offer_moves_to_negotiating() {
    let h = Harness::new();
    let id = h.create("10:00").await;

    let (status, body) = h
        .as_lawyer(
            "PATCH",
            &format!("/v1/appointments/{id}/offer"),
            Some(json!({"offered_fee": 140, "negotiation_note": "complexity"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Offer sent");
    assert_eq!(body["status"], "negotiating");

    let appt = h.appointment(&id).await;
    assert_eq!(appt["offered_fee"], "140.00");
    assert_eq!(appt["negotiation_note"], "complexity");

    let (_, log) = h
        .as_client("GET", &format!("/v1/appointments/{id}/messages"), None)
        .await;
    let texts: Vec<&str> = log
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        texts,
        vec!["Requested appointment. Proposed fee: $150.00", "Offered fee: $140.00"]
    );

    let (_, inbox) = h.as_client("GET", "/v1/notifications", None).await;
    assert_eq!(inbox[0]["type"], "FEE_OFFER");
    assert_eq!(inbox[0]["title"], "Lawyer sent a fee offer");
}

#[tokio::test]
async fn test_scenario_c_confirm_without_offer_is_invalid_state() {
    let h = Harness::new();
    let id = h.create("10:00").await;
    let (status, body) = h
        .as_client("PATCH", &format!("/v1/appointments/{id}/confirm"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "INVALID_STATE");
    assert_eq!(error_message(&body), "No lawyer offer to accept");
}

#[tokio::test]
async fn test_scenario_d_second_booking_of_slot_conflicts() {
    let h = Harness::new();
    h.create("10:00").await;

    let (status, body) = h
        .send(
            "POST",
            "/v1/appointments",
            Some(Harness::bearer("client", h.other_client)),
            Some(json!({
                "lawyer_id": h.lawyer.to_string(),
                "appointment_date": "2026-02-10",
                "appointment_time": "10:00:00",
                "subject": "Second opinion",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

#[tokio::test]
async fn test_scenario_d_accept_conflicts_with_legacy_booking() {
    let h = Harness::new();
    let id = h.create("10:00").await;

    // A row stored before the slot constraint existed.
    let now = chrono::Utc::now();
    let fee = Fee::parse("150").unwrap();
    h.store.hydrate(
        vec![AppointmentRecord {
            id: hirelawyer_core::AppointmentId::new(),
            client_id: h.other_client,
            lawyer_id: h.lawyer,
            slot: hirelawyer_core::Slot::parse("2026-02-10", "10:00").unwrap(),
            subject: "Legacy".to_string(),
            details: None,
            proposed_fee: fee,
            offered_fee: None,
            final_fee: Some(fee),
            negotiation_note: None,
            status: AppointmentStatus::Approved,
            version: 1,
            created_at: now,
            updated_at: now,
        }],
        Vec::new(),
    );

    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{id}/accept"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
    assert_eq!(h.appointment(&id).await["status"], "pending");
}

#[tokio::test]
async fn test_scenario_e_lawyer_accepts_at_proposed_fee() {
    let h = Harness::new();
    let id = h.create("10:00").await;
    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{id}/accept"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Appointment accepted");
    assert_eq!(body["final_fee"], "150.00");

    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{id}/accept"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Appointment already approved");
}

// -- Negotiation and lifecycle ------------------------------------------------

#[tokio::test]
async fn test_counter_then_confirm_uses_offered_fee() {
    let h = Harness::new();
    let id = h.create("11:00").await;
    h.as_lawyer(
        "PATCH",
        &format!("/v1/appointments/{id}/offer"),
        Some(json!({"offered_fee": "140.00"})),
    )
    .await;
    let (status, body) = h
        .as_client(
            "PATCH",
            &format!("/v1/appointments/{id}/counter"),
            Some(json!({"proposed_fee": 120, "negotiation_note": "budget"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Counter offer sent");

    let (status, body) = h
        .as_client("PATCH", &format!("/v1/appointments/{id}/confirm"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Offer accepted");
    assert_eq!(body["final_fee"], "140.00");

    let appt = h.appointment(&id).await;
    assert_eq!(appt["status"], "approved");
    assert_eq!(appt["proposed_fee"], "120.00");
}

#[tokio::test]
async fn test_complete_and_cancel_require_approval() {
    let h = Harness::new();
    let first = h.create("09:00").await;
    let second = h.create("15:00").await;

    let (status, _) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{first}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    h.as_lawyer("PATCH", &format!("/v1/appointments/{first}/accept"), None)
        .await;
    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{first}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["final_fee"], "150.00");

    h.as_lawyer("PATCH", &format!("/v1/appointments/{second}/accept"), None)
        .await;
    let (status, _) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{second}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = h
        .as_admin("PATCH", &format!("/v1/appointments/{second}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");
    assert!(body.get("final_fee").is_none());
}

#[tokio::test]
async fn test_reject_twice_is_invalid_state() {
    let h = Harness::new();
    let id = h.create("10:00").await;
    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{id}/reject"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment rejected");

    let (status, body) = h
        .as_lawyer("PATCH", &format!("/v1/appointments/{id}/reject"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_message(&body), "Appointment already rejected");

    // The slot is free again.
    h.create("10:00").await;
}

// -- Authorization and validation ---------------------------------------------

#[tokio::test]
async fn test_role_and_ownership_errors() {
    let h = Harness::new();
    let id = h.create("10:00").await;

    let (status, body) = h
        .as_client(
            "PATCH",
            &format!("/v1/appointments/{id}/offer"),
            Some(json!({"offered_fee": 10})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Only lawyers can offer fees");

    let stranger = Harness::bearer("lawyer", UserId::new());
    let (status, body) = h
        .send(
            "PATCH",
            &format!("/v1/appointments/{id}/accept"),
            Some(stranger.clone()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Not your appointment");

    let (status, _) = h
        .send("GET", &format!("/v1/appointments/{id}"), Some(stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h
        .as_lawyer(
            "POST",
            "/v1/appointments",
            Some(json!({
                "lawyer_id": h.lawyer.to_string(),
                "appointment_date": "2026-03-01",
                "appointment_time": "10:00",
                "subject": "x",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_message(&body), "Only clients can create appointments");
}

#[tokio::test]
async fn test_validation_errors() {
    let h = Harness::new();

    let (status, body) = h
        .as_client(
            "POST",
            "/v1/appointments",
            Some(json!({"lawyer_id": h.lawyer.to_string(), "appointment_date": "2026-02-10"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, body) = h
        .as_client(
            "POST",
            "/v1/appointments",
            Some(json!({
                "lawyer_id": UserId::new().to_string(),
                "appointment_date": "2026-02-10",
                "appointment_time": "10:00",
                "subject": "Lease",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Lawyer not found");

    let id = h.create("10:00").await;
    let (status, body) = h
        .as_lawyer(
            "PATCH",
            &format!("/v1/appointments/{id}/offer"),
            Some(json!({"offered_fee": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");

    let (status, _) = h
        .as_lawyer(
            "PATCH",
            &format!("/v1/appointments/{}/offer", UserId::new()),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = h
        .as_client("GET", "/v1/appointments/not-a-uuid", None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/appointments")
        .header("authorization", Harness::bearer("client", h.client))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

// -- Messages and notifications -----------------------------------------------

#[tokio::test]
async fn test_post_message_and_inbox() {
    let h = Harness::new();
    let id = h.create("10:00").await;

    let (status, body) = h
        .as_lawyer(
            "POST",
            &format!("/v1/appointments/{id}/messages"),
            Some(json!({"message": "  Please bring the lease  "})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Sent");
    assert_eq!(body["entry"]["message"], "Please bring the lease");
    assert_eq!(body["entry"]["sender_role"], "lawyer");

    let (status, body) = h
        .as_client(
            "POST",
            &format!("/v1/appointments/{id}/messages"),
            Some(json!({"message": "   "})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(&body), "Message is required");

    let (_, body) = h.as_lawyer("GET", "/v1/notifications/unread-count", None).await;
    assert_eq!(body["unread"], 1);

    let (_, inbox) = h.as_lawyer("GET", "/v1/notifications", None).await;
    let notification = inbox[0]["notification_id"].as_str().unwrap().to_string();
    assert_eq!(inbox[0]["type"], "APPOINTMENT_REQUEST");

    let (status, _) = h
        .as_client(
            "PATCH",
            &format!("/v1/notifications/{notification}/read"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h
        .as_lawyer(
            "PATCH",
            &format!("/v1/notifications/{notification}/read"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Marked read");

    let (_, body) = h.as_lawyer("GET", "/v1/notifications/unread-count", None).await;
    assert_eq!(body["unread"], 0);

    let (status, body) = h.as_client("PATCH", "/v1/notifications/read-all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "All marked read");
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn test_list_is_scoped_by_role() {
    let h = Harness::new();
    h.create("10:00").await;
    h.create("11:00").await;

    let (_, mine) = h.as_client("GET", "/v1/appointments/my", None).await;
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let (_, theirs) = h
        .send(
            "GET",
            "/v1/appointments/my",
            Some(Harness::bearer("client", h.other_client)),
            None,
        )
        .await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (_, all) = h.as_admin("GET", "/v1/appointments/my", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

// -- Authentication and rate limiting -----------------------------------------

#[tokio::test]
async fn test_auth_failures() {
    let h = Harness::new();

    let (status, body) = h.send("GET", "/v1/appointments/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    let wrong = format!("Bearer client:{}:wrong-secret", h.client);
    let (status, _) = h.send("GET", "/v1/appointments/my", Some(wrong), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bad_role = format!("Bearer judge:{}:{TOKEN}", h.client);
    let (status, _) = h.send("GET", "/v1/appointments/my", Some(bad_role), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_disabled_acts_as_admin() {
    let h = Harness::with_config(AppConfig::default());
    let (status, body) = h.send("GET", "/v1/appointments/my", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit() {
    let h = Harness::with_config(AppConfig {
        auth_token: Some(TOKEN.to_string()),
        rate_limit_max_requests: 2,
        ..AppConfig::default()
    });
    for _ in 0..2 {
        let (status, _) = h.as_client("GET", "/v1/appointments/my", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = h.as_client("GET", "/v1/appointments/my", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMITED");

    // Counted per caller.
    let (status, _) = h.as_lawyer("GET", "/v1/appointments/my", None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document() {
    let h = Harness::new();
    let (status, spec) = h
        .send("GET", "/openapi.json", Some(Harness::bearer("admin", h.admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let paths = spec["paths"].as_object().unwrap();
    assert!(paths.contains_key("/v1/appointments"));
    assert!(paths.contains_key("/v1/appointments/{id}/confirm"));
    assert!(paths.contains_key("/v1/notifications/read-all"));
    assert!(spec["components"]["schemas"]
        .as_object()
        .unwrap()
        .contains_key("AppointmentView"));
}
