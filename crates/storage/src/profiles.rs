//! Actor profile accessors over the `users` collection.

use krishi_core::{Actor, Role, ValidationError};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::document::{Document, DocumentStore};
use crate::error::StorageError;

/// Collection holding actor profiles, keyed by uid.
pub const USERS: &str = "users";

/// Editable profile fields. `None` leaves the field unchanged.
///
/// `role` is accepted so callers can pass a full profile form, but any value
/// other than the current role is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

fn decode(key: &str, document: Document) -> Result<Actor, StorageError> {
    serde_json::from_value(document).map_err(|e| StorageError::MalformedDocument {
        collection: USERS.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Store (insert or replace) a profile under its uid.
pub async fn put_profile<D: DocumentStore + ?Sized>(
    store: &D,
    actor: &Actor,
) -> Result<(), StorageError> {
    let document = serde_json::to_value(actor)
        .map_err(|e| StorageError::Backend(format!("failed to encode profile: {}", e)))?;
    store.put(USERS, &actor.uid, document).await
}

pub async fn get_profile<D: DocumentStore + ?Sized>(
    store: &D,
    uid: &str,
) -> Result<Option<Actor>, StorageError> {
    match store.get(USERS, uid).await? {
        Some(doc) => decode(uid, doc).map(Some),
        None => Ok(None),
    }
}

/// Apply `update` to the stored profile and bump `updated_at`.
pub async fn update_profile<D: DocumentStore + ?Sized>(
    store: &D,
    uid: &str,
    update: ProfileUpdate,
) -> Result<Actor, StorageError> {
    let mut actor = get_profile(store, uid)
        .await?
        .ok_or_else(|| StorageError::ProfileNotFound {
            uid: uid.to_string(),
        })?;

    if let Some(role) = update.role {
        if role != actor.role {
            return Err(ValidationError::RoleImmutable {
                from: actor.role,
                to: role,
            }
            .into());
        }
    }
    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" }.into());
        }
        actor.name = name.trim().to_string();
    }
    if let Some(phone) = update.phone {
        actor.phone = Some(phone);
    }
    if let Some(address) = update.address {
        actor.address = Some(address);
    }
    actor.updated_at = OffsetDateTime::now_utc();

    put_profile(store, &actor).await?;
    Ok(actor)
}

/// Every stored profile, in signup order.
pub async fn list_profiles<D: DocumentStore + ?Sized>(
    store: &D,
) -> Result<Vec<Actor>, StorageError> {
    store
        .list(USERS)
        .await?
        .into_iter()
        .map(|doc| {
            let key = doc
                .get("uid")
                .and_then(|v| v.as_str())
                .unwrap_or("?")
                .to_string();
            decode(&key, doc)
        })
        .collect()
}
