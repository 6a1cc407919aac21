// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use studio_booking::config::Config;
use studio_booking::db::{FirestoreDb, MemoryDb};
use studio_booking::error::AppError;
use studio_booking::models::{BeatDocument, Booking, Caller};
use studio_booking::routes::create_router;
use studio_booking::services::{BookingNotifier, FirebaseTokenVerifier};
use studio_booking::storage::MemoryObjectStore;
use studio_booking::AppState;

pub const TEST_KID: &str = "test-kid";
const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_private.pem");
const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_rsa_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Records every confirmation instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// (booking ID, recipient) pairs sent so far.
    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingNotifier for RecordingNotifier {
    async fn booking_confirmed(&self, booking: &Booking, recipient: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Internal(anyhow::anyhow!("SMTP relay refused")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((booking.id.clone(), recipient.to_string()));
        Ok(())
    }
}

/// Verifier that trusts the fixture key.
pub fn test_verifier(config: &Config) -> FirebaseTokenVerifier {
    FirebaseTokenVerifier::new_with_static_key(
        &config.firebase_project_id,
        TEST_KID,
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
    )
    .unwrap()
}

#[derive(Serialize)]
struct TestClaims<'a> {
    iss: String,
    aud: &'a str,
    sub: &'a str,
    iat: u64,
    exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<bool>,
}

/// Sign a Firebase-style ID token for `uid` with the fixture key.
/// Any email is marked verified.
#[allow(dead_code)]
pub fn id_token(config: &Config, uid: &str, email: Option<&str>, admin: bool) -> String {
    id_token_for_project(&config.firebase_project_id, uid, email, admin)
}

#[allow(dead_code)]
pub fn id_token_for_project(project: &str, uid: &str, email: Option<&str>, admin: bool) -> String {
    sign_token(project, uid, email, email.is_some(), admin)
}

/// Like [`id_token`], but Firebase has not verified the email.
#[allow(dead_code)]
pub fn unverified_id_token(config: &Config, uid: &str, email: &str) -> String {
    sign_token(&config.firebase_project_id, uid, Some(email), false, false)
}

#[allow(dead_code)]
fn sign_token(
    project: &str,
    uid: &str,
    email: Option<&str>,
    email_verified: bool,
    admin: bool,
) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = TestClaims {
        iss: format!("https://securetoken.google.com/{project}"),
        aud: project,
        sub: uid,
        iat: now,
        exp: now + 3600,
        email,
        email_verified,
        admin: admin.then_some(true),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap(),
    )
    .unwrap()
}

/// Router plus handles on its in-memory backends.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub objects: Arc<MemoryObjectStore>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Create a test app backed by in-memory stores.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let db = Arc::new(MemoryDb::new());
    let objects = Arc::new(MemoryObjectStore::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(test_verifier(&config)),
        db.clone(),
        objects.clone(),
        notifier.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        objects,
        notifier,
    }
}

#[allow(dead_code)]
pub fn caller(uid: &str) -> Caller {
    Caller {
        uid: uid.to_string(),
        email: Some(format!("{uid}@example.com")),
        is_admin: false,
    }
}

#[allow(dead_code)]
pub fn admin() -> Caller {
    Caller {
        uid: "admin".to_string(),
        email: Some("admin@example.com".to_string()),
        is_admin: true,
    }
}

/// The first `weekday` strictly after today.
#[allow(dead_code)]
pub fn next_weekday(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive().succ_opt().unwrap();
    while date.weekday() != weekday {
        date = date.succ_opt().unwrap();
    }
    date
}

/// A valid catalog document.
#[allow(dead_code)]
pub fn beat_doc(id: &str, title: &str, plays: u64, created_at: &str) -> BeatDocument {
    BeatDocument {
        id: id.to_string(),
        title: title.to_string(),
        producer: "43 Art".to_string(),
        style: "Trap".to_string(),
        price: 29.99,
        duration: 180,
        bpm: Some(140),
        audio_path: format!("beats/{id}.mp3"),
        image_path: None,
        tags: vec!["dark".to_string(), "trap".to_string()],
        plays,
        likes: 0,
        created_at: created_at.to_string(),
        updated_at: None,
    }
}

/// Decode a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
