//! In-memory user store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use clipit_models::{UploadStatus, UserRecord};

use crate::error::{FirestoreError, FirestoreResult};
use crate::user_repo::UserStore;

#[derive(Default)]
struct State {
    users: HashMap<String, UserRecord>,
    flag_writes: Vec<(String, bool)>,
    fail_writes: bool,
}

/// User store backed by a map, with a log of flag writes.
#[derive(Default)]
pub struct MemoryUserStore {
    state: Mutex<State>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn insert(&self, user: UserRecord) {
        self.lock().users.insert(user.email.clone(), user);
    }

    pub fn user(&self, email: &str) -> Option<UserRecord> {
        self.lock().users.get(email).cloned()
    }

    /// Every `set_upload_complete` call, in order.
    pub fn flag_writes(&self) -> Vec<(String, bool)> {
        self.lock().flag_writes.clone()
    }

    /// Make every write fail with a server error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn set_upload_complete(&self, email: &str, complete: bool) -> FirestoreResult<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(FirestoreError::ServerError(503, "injected write failure".to_string()));
        }
        state.flag_writes.push((email.to_string(), complete));

        let user = state
            .users
            .entry(email.to_string())
            .or_insert_with(|| UserRecord::new(email));
        user.upload_complete = Some(complete);
        user.upload_updated_at = Some(Utc::now());
        if complete {
            user.upload_status = Some(UploadStatus::Complete);
        } else {
            user.upload_status = Some(UploadStatus::Processing);
            user.upload_error = None;
        }
        Ok(())
    }

    async fn record_upload_failure(&self, email: &str, error: &str) -> FirestoreResult<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(FirestoreError::ServerError(503, "injected write failure".to_string()));
        }

        let user = state
            .users
            .entry(email.to_string())
            .or_insert_with(|| UserRecord::new(email));
        user.upload_status = Some(UploadStatus::Failed);
        user.upload_error = Some(error.to_string());
        user.upload_updated_at = Some(Utc::now());
        Ok(())
    }

    async fn get_user(&self, email: &str) -> FirestoreResult<Option<UserRecord>> {
        Ok(self.user(email))
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        Ok(())
    }
}
