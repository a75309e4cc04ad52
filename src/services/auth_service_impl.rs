//! In-process implementation of [`IdentityProvider`].
//!
//! Every credential is the id of a record in a `tower-sessions` store. The
//! record names its owner, its kind and the credential issued with it, and it
//! expires on its own. Nothing is encoded in the credential itself, so
//! revocation takes effect immediately.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower_sessions::session::{Id, Record};
use tower_sessions::{MemoryStore, SessionStore, session_store};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::db::repositories::user::verify_password;
use crate::db::{Store, StoreError, User};
use crate::services::auth_service::{
    AuthError, IdentityProvider, IssuedCredentials, LoginOutcome, Subject, Validated,
};

const GRANT_KEY: &str = "grant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Kind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Grant {
    user_id: i64,
    kind: Kind,
    /// The other half of the pair. Revoking either credential revokes both.
    sibling: Option<Id>,
}

impl From<session_store::Error> for AuthError {
    #[track_caller]
    fn from(err: session_store::Error) -> Self {
        anyhow::Error::from(err).into()
    }
}

pub struct TokenIdentity {
    store: Store,
    // TODO: move to a store implementing `ExpiredDeletion`; `MemoryStore`
    // only hides expired records and never drops them.
    sessions: MemoryStore,
    access_ttl: Duration,
    refresh_ttl: Duration,
    /// Held while a grant is looked up and removed, so a refresh credential
    /// renews at most once.
    removals: Mutex<()>,
}

impl TokenIdentity {
    #[must_use]
    pub fn new(store: Store, config: &AuthConfig) -> Self {
        Self {
            store,
            sessions: MemoryStore::default(),
            access_ttl: Duration::from_secs(config.token_ttl_secs),
            refresh_ttl: Duration::from_secs(config.refresh_ttl_secs),
            removals: Mutex::new(()),
        }
    }

    async fn issue(&self, user_id: i64) -> Result<IssuedCredentials, AuthError> {
        let mut access = self
            .create_record(user_id, Kind::Access, None, self.access_ttl)
            .await?;
        let refresh = self
            .create_record(user_id, Kind::Refresh, Some(access.id), self.refresh_ttl)
            .await?;

        put_grant(
            &mut access,
            &Grant {
                user_id,
                kind: Kind::Access,
                sibling: Some(refresh.id),
            },
        )?;
        self.sessions.save(&access).await?;

        Ok(IssuedCredentials {
            access: access.id.to_string(),
            refresh: refresh.id.to_string(),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        })
    }

    async fn create_record(
        &self,
        user_id: i64,
        kind: Kind,
        sibling: Option<Id>,
        ttl: Duration,
    ) -> Result<Record, AuthError> {
        let mut record = Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc() + ttl,
        };
        put_grant(
            &mut record,
            &Grant {
                user_id,
                kind,
                sibling,
            },
        )?;

        // The store replaces the id on collision.
        self.sessions.create(&mut record).await?;
        Ok(record)
    }

    /// The unexpired grant behind a credential, if it has the expected kind.
    async fn grant(&self, id: &Id, kind: Kind) -> Result<Option<Grant>, AuthError> {
        let Some(record) = self.sessions.load(id).await? else {
            return Ok(None);
        };

        let grant = record
            .data
            .get(GRANT_KEY)
            .cloned()
            .map(serde_json::from_value::<Grant>)
            .transpose()
            .map_err(anyhow::Error::from)?;
        Ok(grant.filter(|grant| grant.kind == kind))
    }

    /// Looks up a grant and deletes it together with its sibling in one
    /// critical section.
    async fn take(&self, id: &Id, kind: Kind) -> Result<Option<Grant>, AuthError> {
        let _guard = self.removals.lock().await;

        let Some(grant) = self.grant(id, kind).await? else {
            return Ok(None);
        };
        self.sessions.delete(id).await?;
        if let Some(sibling) = &grant.sibling {
            self.sessions.delete(sibling).await?;
        }
        Ok(Some(grant))
    }

    /// Loads the account behind a grant. Deleted and disabled accounts lose
    /// access immediately.
    async fn active_user(&self, user_id: i64) -> Result<User, AuthError> {
        match self.store.user_repo().get(user_id).await {
            Ok(user) if user.enabled => Ok(user),
            Ok(_) | Err(StoreError::NotFound { .. }) => Err(AuthError::Unauthorized),
            Err(e) => Err(e.into()),
        }
    }
}

fn put_grant(record: &mut Record, grant: &Grant) -> Result<(), AuthError> {
    let value = serde_json::to_value(grant).map_err(anyhow::Error::from)?;
    record.data.insert(GRANT_KEY.to_string(), value);
    Ok(())
}

/// Credentials that do not parse as record ids are treated as unknown.
fn credential_id(credential: &str) -> Option<Id> {
    Id::from_str(credential).ok()
}

#[async_trait]
impl IdentityProvider for TokenIdentity {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .user_repo()
            .find_credentials(username.trim())
            .await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&password_hash, password).await? {
            warn!(username = %user.username, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.enabled {
            warn!(username = %user.username, "Login attempt on disabled account");
            return Err(AuthError::InvalidCredentials);
        }

        self.store.user_repo().touch_last_login(user.id).await?;
        let user = self.store.user_repo().get(user.id).await?;
        let credentials = self.issue(user.id).await?;

        info!(user_id = user.id, username = %user.username, "User logged in");
        Ok(LoginOutcome { user, credentials })
    }

    async fn validate(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<Validated, AuthError> {
        let granted = match access.and_then(credential_id) {
            Some(id) => self.grant(&id, Kind::Access).await?,
            None => None,
        };

        if let Some(grant) = granted {
            let user = self.active_user(grant.user_id).await?;
            return Ok(Validated {
                subject: Subject::from(&user),
                renewed: None,
            });
        }

        let id = refresh
            .and_then(credential_id)
            .ok_or(AuthError::Unauthorized)?;
        let grant = self
            .take(&id, Kind::Refresh)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let user = self.active_user(grant.user_id).await?;
        let renewed = self.issue(user.id).await?;

        Ok(Validated {
            subject: Subject::from(&user),
            renewed: Some(renewed),
        })
    }

    async fn revoke(&self, credential: &str) {
        let Some(id) = credential_id(credential) else {
            return;
        };

        for kind in [Kind::Access, Kind::Refresh] {
            match self.take(&id, kind).await {
                Ok(Some(_)) => return,
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to revoke credential");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_credentials_are_unknown() {
        assert!(credential_id("").is_none());
        assert!(credential_id("not a credential").is_none());

        let id = Id::default();
        assert_eq!(credential_id(&id.to_string()), Some(id));
    }

    #[test]
    fn grants_round_trip_through_records() {
        let mut record = Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date: OffsetDateTime::now_utc(),
        };
        let sibling = Id::default();
        put_grant(
            &mut record,
            &Grant {
                user_id: 7,
                kind: Kind::Refresh,
                sibling: Some(sibling),
            },
        )
        .unwrap();

        let grant: Grant = serde_json::from_value(record.data[GRANT_KEY].clone()).unwrap();
        assert_eq!(grant.user_id, 7);
        assert_eq!(grant.kind, Kind::Refresh);
        assert_eq!(grant.sibling, Some(sibling));
    }
}
