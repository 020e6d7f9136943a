//! Sign-in gate backed by the users table.

use mockview_core::model::UserId;
use mockview_core::traits::Authenticator;

use crate::error::{StoreError, StoreResult};
use crate::queries::users::User;
use crate::SqliteStore;

/// The user an interview runs on behalf of.
///
/// Only active users can sign in. Credentials are not checked here.
#[derive(Debug, Clone, Default)]
pub struct SignedInUser {
    user: Option<User>,
}

impl SignedInUser {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub async fn sign_in(store: &SqliteStore, username: &str) -> StoreResult<Self> {
        let user = store
            .find_active_user(username)
            .await?
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;
        tracing::info!(user_id = user.id, username, "signed in");
        Ok(Self { user: Some(user) })
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl Authenticator for SignedInUser {
    fn current_user(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_active_users_sign_in() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ada = store.create_user("ada").await.unwrap();
        store.create_user("bob").await.unwrap();
        store.deactivate_user("bob").await.unwrap();

        let mut signed_in = SignedInUser::sign_in(&store, "ada").await.unwrap();
        assert_eq!(signed_in.current_user(), Some(ada.id));
        assert_eq!(signed_in.user().unwrap().username, "ada");

        assert!(matches!(
            SignedInUser::sign_in(&store, "bob").await,
            Err(StoreError::UnknownUser(_))
        ));
        assert!(SignedInUser::sign_in(&store, "nobody").await.is_err());

        signed_in.sign_out();
        assert_eq!(signed_in.current_user(), None);
        assert_eq!(SignedInUser::anonymous().current_user(), None);
    }
}
