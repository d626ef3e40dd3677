//! User records in the `users` collection.
//!
//! Documents are keyed by email. Every write is a masked upsert so fields
//! written by other services (notably `paymentPlan`) are never touched.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use clipit_models::{user_fields as fields, UploadStatus, UserRecord};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics;
use crate::types::{Document, ToFirestoreValue, Value};

/// Collection holding one document per user.
pub const USERS_COLLECTION: &str = "users";

/// Per-user record store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Upsert the upload-completion flag.
    ///
    /// `false` also marks the job as processing and clears the last error;
    /// `true` marks it complete.
    async fn set_upload_complete(&self, email: &str, complete: bool) -> FirestoreResult<()>;

    /// Record a failed background job. `upload_complete` is left as is.
    async fn record_upload_failure(&self, email: &str, error: &str) -> FirestoreResult<()>;

    /// Fetch a user record, `None` if the user is unknown.
    async fn get_user(&self, email: &str) -> FirestoreResult<Option<UserRecord>>;

    /// Payment plan, `"free"` when unset; `NotFound` for unknown users.
    async fn get_payment_plan(&self, email: &str) -> FirestoreResult<String> {
        let user = self
            .get_user(email)
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", USERS_COLLECTION, email)))?;
        Ok(user.payment_plan_or_default().to_string())
    }

    async fn check_connectivity(&self) -> FirestoreResult<()>;
}

/// Firestore-backed user store.
#[derive(Clone)]
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    async fn upsert(
        &self,
        email: &str,
        field_values: Vec<(&'static str, Value)>,
    ) -> FirestoreResult<()> {
        let mut mask: Vec<&str> = field_values.iter().map(|(name, _)| *name).collect();
        mask.push(fields::EMAIL);

        let mut doc_fields: HashMap<String, Value> = field_values
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        doc_fields.insert(fields::EMAIL.to_string(), email.to_firestore_value());

        let doc = match self
            .client
            .upsert_document(USERS_COLLECTION, email, doc_fields, &mask)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                metrics::record_user_write("error");
                return Err(e);
            }
        };

        if doc.was_created() {
            metrics::record_user_write("created");
            info!(user_email = email, "Created user record");
        } else {
            metrics::record_user_write("updated");
            debug!(user_email = email, fields = ?mask, "Updated user record");
        }
        Ok(())
    }
}

fn user_from_document(email: &str, doc: &Document) -> UserRecord {
    UserRecord {
        email: doc
            .get::<String>(fields::EMAIL)
            .unwrap_or_else(|| email.to_string()),
        payment_plan: doc.get(fields::PAYMENT_PLAN),
        upload_complete: doc.get(fields::UPLOAD_COMPLETE),
        upload_status: doc
            .get::<String>(fields::UPLOAD_STATUS)
            .and_then(|s| UploadStatus::parse(&s)),
        upload_error: doc.get(fields::UPLOAD_ERROR),
        upload_updated_at: doc.get(fields::UPLOAD_UPDATED_AT),
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn set_upload_complete(&self, email: &str, complete: bool) -> FirestoreResult<()> {
        let status = if complete {
            UploadStatus::Complete
        } else {
            UploadStatus::Processing
        };

        let mut values = vec![
            (fields::UPLOAD_COMPLETE, complete.to_firestore_value()),
            (fields::UPLOAD_STATUS, status.as_str().to_firestore_value()),
            (fields::UPLOAD_UPDATED_AT, Utc::now().to_firestore_value()),
        ];
        if !complete {
            values.push((fields::UPLOAD_ERROR, None::<String>.to_firestore_value()));
        }

        self.upsert(email, values).await
    }

    async fn record_upload_failure(&self, email: &str, error: &str) -> FirestoreResult<()> {
        self.upsert(
            email,
            vec![
                (fields::UPLOAD_STATUS, UploadStatus::Failed.as_str().to_firestore_value()),
                (fields::UPLOAD_ERROR, error.to_firestore_value()),
                (fields::UPLOAD_UPDATED_AT, Utc::now().to_firestore_value()),
            ],
        )
        .await
    }

    async fn get_user(&self, email: &str) -> FirestoreResult<Option<UserRecord>> {
        let doc = self.client.get_document(USERS_COLLECTION, email).await?;
        Ok(doc.map(|d| user_from_document(email, &d)))
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        self.client.check_connectivity(USERS_COLLECTION).await
    }
}
