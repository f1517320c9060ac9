//! End-to-end smoke tests against PostgreSQL.
//!
//! Enabled with `--features db-tests`; connection settings come from the
//! `NOTEPAD_DB_*` environment variables.

#![cfg(feature = "db-tests")]

use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use notepad_api::limiter::{RateDecision, RateLimitKey, RateLimitPolicy, RateLimitScope};
use notepad_api::{PgRateLimiter, RateLimiter};
use notepad_core::{new_note_id, ShortCode};
use notepad_storage::{NoteStore, NoteUpdate, PasswordChange, StoreError};
use notepad_test_utils::fixtures::{note, protected_note};

#[path = "support/db.rs"]
mod test_db_support;
use test_db_support::test_db_client;

fn unique_code(prefix: &str) -> String {
    let id = new_note_id().simple().to_string();
    format!("{}-{}", prefix, &id[..12])
}

#[tokio::test]
async fn smoke_test_note_store_round_trip() -> Result<(), String> {
    let db = test_db_client().await;
    let code = unique_code("smoke");
    let stored = note(&code, "from postgres");

    db.note_insert(&stored).await.map_err(|e| e.to_string())?;
    let lookup = ShortCode::from_stored(code.clone());
    assert!(db.note_code_exists(&lookup).await.map_err(|e| e.to_string())?);

    let fetched = db
        .note_get_by_code(&lookup)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("note missing after insert")?;
    assert_eq!(fetched.id, stored.id);
    assert_eq!(fetched.content, "from postgres");
    assert!(!fetched.is_protected());

    let renamed = unique_code("renamed");
    let mut update = NoteUpdate::touch(chrono::Utc::now());
    update.content = Some("edited".to_string());
    update.password = PasswordChange::Set("$argon2id$fake".to_string());
    update.short_code = Some(ShortCode::from_stored(renamed.clone()));

    let updated = db
        .note_update(stored.id, update)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("note missing on update")?;
    assert_eq!(updated.short_code.as_str(), renamed);
    assert_eq!(updated.content, "edited");
    assert!(updated.is_protected());
    assert!(!db.note_code_exists(&lookup).await.map_err(|e| e.to_string())?);
    Ok(())
}

#[tokio::test]
async fn smoke_test_unique_short_code_conflicts() -> Result<(), String> {
    let db = test_db_client().await;
    let code = unique_code("dup");

    db.note_insert(&note(&code, "first"))
        .await
        .map_err(|e| e.to_string())?;
    match db.note_insert(&protected_note(&code, "second", "$argon2id$x")).await {
        Err(StoreError::Conflict { short_code }) => assert_eq!(short_code, code),
        other => return Err(format!("expected conflict, got {:?}", other)),
    }
    Ok(())
}

#[tokio::test]
async fn smoke_test_pg_rate_limiter() -> Result<(), String> {
    let db = test_db_client().await;
    let limiter = PgRateLimiter::new(
        db.pool().clone(),
        RateLimitPolicy {
            general_per_window: 3,
            verify_per_window: 1,
            burst: 3,
            window: Duration::from_secs(3600),
        },
    );
    // A random address keeps reruns independent.
    let key = RateLimitKey::new(
        RateLimitScope::Verify,
        IpAddr::V6(Ipv6Addr::from(new_note_id().as_u128())),
    );

    let first = limiter.check(&key).await.map_err(|e| e.to_string())?;
    assert!(matches!(first, RateDecision::Allowed { limit: 1 }));

    match limiter.check(&key).await.map_err(|e| e.to_string())? {
        RateDecision::Limited { retry_after_secs } => assert!(retry_after_secs >= 1),
        other => return Err(format!("expected limited, got {:?}", other)),
    }

    limiter.sweep().await.map_err(|e| e.to_string())?;
    Ok(())
}
