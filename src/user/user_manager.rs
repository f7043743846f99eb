//! Account flows: registration, sessions and the token-confirmed changes.

use super::credentials::CredentialHasher;
use super::models::{AccountUpdate, ContentQuantities, NewUser, User, UserCollection, UserSummary};
use super::pending::{ConfirmationIntent, PendingAction, PendingRejection};
use super::tokens::{Claims, IssuedToken, TokenError, TokenIssuer, TokenPurpose};
use super::user_store::UserStore;
use crate::catalog_store::{is_valid_resource_id, new_resource_id, CatalogStore};
use crate::email::{EmailMessage, EmailSender, EmailTemplate};
use crate::error::{ServiceError, ServiceResult};
use crate::media::{MediaDescriptor, MediaStore, UploadedFile, IMAGE_UPLOAD_POLICY};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

const EXPIRED_OR_INVALID_TOKEN: &str =
    "Your token is expired or is invalid, please go to login and request a new token";

/// Addresses are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn required(value: &str, message: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(message));
    }
    Ok(())
}

fn token_rejection(err: TokenError) -> ServiceError {
    debug!("Rejected confirmation token: {}", err);
    ServiceError::authentication(EXPIRED_OR_INVALID_TOKEN)
}

pub struct UserManager {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaStore>,
    email: Arc<dyn EmailSender>,
    tokens: TokenIssuer,
    hasher: CredentialHasher,
    frontend_url: String,
}

impl UserManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaStore>,
        email: Arc<dyn EmailSender>,
        tokens: TokenIssuer,
        hasher: CredentialHasher,
        frontend_url: &str,
    ) -> Self {
        Self {
            users,
            catalog,
            media,
            email,
            tokens,
            hasher,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn frontend_link(&self, route: &str, token: &str) -> String {
        format!("{}/auth/{}/{}/", self.frontend_url, route, token)
    }

    async fn send_email(
        &self,
        to: &str,
        template: EmailTemplate,
        data: serde_json::Value,
    ) -> ServiceResult<()> {
        let message = EmailMessage {
            to: to.to_string(),
            template,
            data,
        };
        self.email.send(&message).await?;
        Ok(())
    }

    /// Mints a token for `intent`, stores it as the user's pending action and
    /// returns it. Whatever was pending before is discarded.
    fn issue_pending(
        &self,
        user_id: usize,
        intent: ConfirmationIntent,
        new_email: Option<&str>,
    ) -> ServiceResult<IssuedToken> {
        let token = self.tokens.issue_confirmation(user_id, intent, new_email)?;
        let pending = PendingAction::pending(token.value.clone(), intent, token.expires_at);
        self.users
            .update_account(user_id, &AccountUpdate::pending(pending))?;
        Ok(token)
    }

    /// Verifies a signed confirmation token and loads its subject.
    fn redeem_signed(
        &self,
        token: &str,
        purpose: TokenPurpose,
        missing_user: ServiceError,
    ) -> ServiceResult<(Claims, User)> {
        let claims = self.tokens.verify(token, purpose).map_err(token_rejection)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| ServiceError::authentication(EXPIRED_OR_INVALID_TOKEN))?;
        let user = self.users.get_user(user_id)?.ok_or(missing_user)?;
        Ok((claims, user))
    }

    // =========================================================================
    // Registration and sessions
    // =========================================================================

    pub async fn register(&self, username: &str, email: &str, password: &str) -> ServiceResult<()> {
        required(username, "You need to provide a username")?;
        required(email, "You need to provide an email")?;
        required(password, "You need to provide a password")?;
        let username = username.trim();
        let email = normalize_email(email);

        if self.users.get_user_by_email(&email)?.is_some() {
            return Err(ServiceError::already_exists(
                "Already exists a user with this email, if you need a new verification token go to login",
            )
            .with_status(StatusCode::UNAUTHORIZED));
        }
        if self.users.get_user_by_username(username)?.is_some() {
            return Err(ServiceError::already_exists(
                "Already exists a user with this username, if you need a new verification token go to login",
            )
            .with_status(StatusCode::UNAUTHORIZED));
        }

        let password_hash = self.hasher.hash(password)?;
        let user_id = self.users.create_user(&NewUser {
            username: username.to_string(),
            email: email.clone(),
            password_hash,
        })?;
        let token = self.issue_pending(user_id, ConfirmationIntent::VerifyAccount, None)?;
        info!("Registered user {} ({})", user_id, username);

        self.send_email(
            &email,
            EmailTemplate::Registration,
            json!({
                "username": username,
                "link": self.frontend_link("verify-account", &token.value),
            }),
        )
        .await
    }

    pub fn verify_account(&self, token: &str) -> ServiceResult<()> {
        let (_, user) = self.redeem_signed(
            token,
            TokenPurpose::VerifyAccount,
            ServiceError::authentication("There is no user with this token"),
        )?;
        if user.verified {
            return Err(ServiceError::authentication(
                "User already verified, please login",
            ));
        }

        let mut pending = user.pending.clone();
        pending
            .confirm(token, ConfirmationIntent::VerifyAccount, now_secs())
            .map_err(|rejection| self.wrong_token(user.id, rejection, "login"))?;

        self.users.update_account(
            user.id,
            &AccountUpdate {
                verified: Some(true),
                pending: Some(pending),
                ..Default::default()
            },
        )?;
        info!("Verified user {}", user.id);
        Ok(())
    }

    fn wrong_token(&self, user_id: usize, rejection: PendingRejection, go_to: &str) -> ServiceError {
        debug!("User {} presented a stale token: {}", user_id, rejection);
        ServiceError::authentication(format!(
            "Wrong token, please go to {} and request a new token!",
            go_to
        ))
    }

    pub async fn resend_verification(&self, email: &str, password: &str) -> ServiceResult<()> {
        let user = self
            .users
            .get_user_by_email(&normalize_email(email))?
            .ok_or_else(|| {
                ServiceError::not_found(
                    "There is no user with this email, please try again with other email",
                )
            })?;
        if user.verified {
            return Err(ServiceError::not_found(
                "This user is already verified, please login",
            ));
        }
        if !self.hasher.verify(password, &user.password_hash) {
            return Err(ServiceError::authentication(
                "Wrong password, please try again",
            ));
        }

        let token = self.issue_pending(user.id, ConfirmationIntent::VerifyAccount, None)?;
        self.send_email(
            &user.email,
            EmailTemplate::Registration,
            json!({
                "username": user.username,
                "link": self.frontend_link("verify-account", &token.value),
            }),
        )
        .await
    }

    /// Returns the user and a fresh session token.
    pub fn login(&self, email: &str, password: &str) -> ServiceResult<(UserSummary, IssuedToken)> {
        let user = self
            .users
            .get_user_by_email(&normalize_email(email))?
            .ok_or_else(|| ServiceError::authentication("There is no user with this email"))?;
        if !user.verified {
            return Err(ServiceError::authentication(
                "Your account has not been verified, please verify your account",
            ));
        }
        if !self.hasher.verify(password, &user.password_hash) {
            return Err(ServiceError::authentication("Wrong password, try again"));
        }

        let session = self
            .tokens
            .issue_session(user.id, &user.username, &user.email)?;
        info!("User {} logged in", user.id);
        Ok((user.summary(), session))
    }

    /// Resolves a session token to its (current) user.
    pub fn session_user(&self, token: &str) -> ServiceResult<User> {
        let claims = self
            .tokens
            .verify(token, TokenPurpose::Session)
            .map_err(|err| {
                debug!("Rejected session token: {}", err);
                ServiceError::authentication("Not authenticated, please login")
            })?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| ServiceError::authentication("Not authenticated, please login"))?;
        self.users
            .get_user(user_id)?
            .ok_or_else(|| ServiceError::authentication("Not authenticated, please login"))
    }

    pub fn user(&self, user_id: usize) -> ServiceResult<Option<User>> {
        Ok(self.users.get_user(user_id)?)
    }

    // =========================================================================
    // Password recovery
    // =========================================================================

    pub async fn send_password_recovery(&self, email: &str) -> ServiceResult<()> {
        let user = self
            .users
            .get_user_by_email(&normalize_email(email))?
            .ok_or_else(|| {
                ServiceError::not_found(
                    "There isn't a user with this email, please try again with other email!",
                )
            })?;

        let token = self.issue_pending(user.id, ConfirmationIntent::ResetPassword, None)?;
        self.send_email(
            &user.email,
            EmailTemplate::PasswordRecovery,
            json!({
                "username": user.username,
                "link": self.frontend_link("password-recovery", &token.value),
            }),
        )
        .await
    }

    pub fn update_password(&self, token: &str, new_password: &str) -> ServiceResult<()> {
        let (_, user) = self.redeem_signed(
            token,
            TokenPurpose::ResetPassword,
            ServiceError::not_found("There is no user with this token"),
        )?;

        let mut pending = user.pending.clone();
        pending
            .check(token, ConfirmationIntent::ResetPassword, now_secs())
            .map_err(|rejection| self.wrong_token(user.id, rejection, "login"))?;
        required(new_password, "You need to provide a new password")?;
        if self.hasher.verify(new_password, &user.password_hash) {
            return Err(ServiceError::validation(
                "The new password cannot be the same as the old password!",
            )
            .with_status(StatusCode::UNAUTHORIZED));
        }
        pending
            .confirm(token, ConfirmationIntent::ResetPassword, now_secs())
            .map_err(|rejection| self.wrong_token(user.id, rejection, "login"))?;

        self.users.update_account(
            user.id,
            &AccountUpdate {
                password_hash: Some(self.hasher.hash(new_password)?),
                pending: Some(pending),
                ..Default::default()
            },
        )?;
        info!("Password updated for user {}", user.id);
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    pub fn quantities(&self, user: &User) -> ContentQuantities {
        ContentQuantities {
            uploaded_tracks_quantity: user.uploaded_tracks.len(),
            liked_tracks_quantity: user.liked_tracks.len(),
            playlists_quantity: user.playlists.len(),
        }
    }

    fn checked_track_id(track_id: &str) -> ServiceResult<()> {
        if !is_valid_resource_id(track_id) {
            return Err(ServiceError::validation("Invalid track id, please try again"));
        }
        Ok(())
    }

    fn sorted_liked(&self, user_id: usize) -> ServiceResult<Vec<String>> {
        let mut liked: Vec<String> = self
            .users
            .get_collection(user_id, UserCollection::LikedTracks)?
            .into_iter()
            .collect();
        liked.sort();
        Ok(liked)
    }

    /// Returns the user's liked track ids.
    pub fn like_track(&self, user: &User, track_id: &str) -> ServiceResult<Vec<String>> {
        Self::checked_track_id(track_id)?;
        if self.catalog.get_track(track_id)?.is_none() {
            return Err(ServiceError::not_found("There is no track with that id"));
        }
        self.users
            .add_to_collection(user.id, UserCollection::LikedTracks, track_id)?;
        self.sorted_liked(user.id)
    }

    pub fn unlike_track(&self, user: &User, track_id: &str) -> ServiceResult<Vec<String>> {
        Self::checked_track_id(track_id)?;
        self.users
            .remove_from_collection(user.id, UserCollection::LikedTracks, track_id)?;
        self.sorted_liked(user.id)
    }

    pub async fn upload_avatar(
        &self,
        user: &User,
        file: Option<UploadedFile>,
    ) -> ServiceResult<MediaDescriptor> {
        let file = file.ok_or_else(|| {
            ServiceError::validation("You need to send an image file as avatar")
        })?;
        let extension = IMAGE_UPLOAD_POLICY.accept(&file)?;
        let avatar = self
            .media
            .descriptor(&format!("{}.{}", new_resource_id(), extension));

        let update = AccountUpdate {
            avatar: Some(Some(avatar.clone())),
            ..Default::default()
        };
        tokio::try_join!(self.media.save(&avatar.name, file.bytes), async {
            self.users.update_account(user.id, &update)
        })?;

        if let Some(previous) = &user.avatar {
            if let Err(err) = self.media.delete(&previous.name).await {
                warn!("Failed to delete previous avatar {}: {}", previous.name, err);
            }
        }
        Ok(avatar)
    }

    /// Returns the new username.
    pub fn change_username(&self, user: &User, new_username: &str) -> ServiceResult<String> {
        required(new_username, "You need to provide a new username")?;
        let new_username = new_username.trim();
        if self.users.get_user_by_username(new_username)?.is_some() {
            return Err(ServiceError::already_exists(
                "Already exists a user with this username, please choose another one!",
            )
            .with_status(StatusCode::NOT_ACCEPTABLE));
        }
        self.users.update_account(
            user.id,
            &AccountUpdate {
                username: Some(new_username.to_string()),
                ..Default::default()
            },
        )?;
        Ok(new_username.to_string())
    }

    // =========================================================================
    // Email change
    // =========================================================================

    fn ensure_email_free(&self, email: &str) -> ServiceResult<()> {
        if self.users.get_user_by_email(email)?.is_some() {
            return Err(ServiceError::already_exists(
                "Already exists a user with this email, please try again with other email",
            )
            .with_status(StatusCode::NOT_ACCEPTABLE));
        }
        Ok(())
    }

    /// Sends a confirmation link to the new address. The account keeps its
    /// current email until the link is used.
    pub async fn change_email(&self, user: &User, new_email: &str) -> ServiceResult<()> {
        required(new_email, "You need to provide a new email")?;
        let new_email = normalize_email(new_email);
        self.ensure_email_free(&new_email)?;

        let token = self.issue_pending(user.id, ConfirmationIntent::ChangeEmail, Some(&new_email))?;
        self.send_email(
            &new_email,
            EmailTemplate::EmailChange,
            json!({
                "username": user.username,
                "link": self.frontend_link("email-change", &token.value),
                "newEmail": new_email,
            }),
        )
        .await
    }

    /// Returns the confirmed address.
    pub fn confirm_email_change(&self, token: &str) -> ServiceResult<String> {
        let (claims, user) = self.redeem_signed(
            token,
            TokenPurpose::ChangeEmail,
            ServiceError::authentication("There is no user with this token"),
        )?;
        let new_email = claims
            .email
            .ok_or_else(|| ServiceError::authentication(EXPIRED_OR_INVALID_TOKEN))?;

        let mut pending = user.pending.clone();
        pending
            .check(token, ConfirmationIntent::ChangeEmail, now_secs())
            .map_err(|rejection| self.wrong_token(user.id, rejection, "profile"))?;
        self.ensure_email_free(&new_email)?;
        pending
            .confirm(token, ConfirmationIntent::ChangeEmail, now_secs())
            .map_err(|rejection| self.wrong_token(user.id, rejection, "profile"))?;

        self.users.update_account(
            user.id,
            &AccountUpdate {
                email: Some(new_email.clone()),
                pending: Some(pending),
                ..Default::default()
            },
        )?;
        info!("User {} confirmed a new email", user.id);
        Ok(new_email)
    }

    // =========================================================================
    // Account deletion
    // =========================================================================

    /// The caller can only name its own address.
    fn own_account_by_email(&self, actor: &User, email: &str) -> ServiceResult<User> {
        match self.users.get_user_by_email(&normalize_email(email))? {
            Some(user) if user.id == actor.id => Ok(user),
            _ => Err(ServiceError::not_found("There isn't a user with this email!")),
        }
    }

    /// Emails an opaque deletion token. Returns the address it went to.
    pub async fn send_delete_account_token(&self, actor: &User, email: &str) -> ServiceResult<String> {
        let user = self.own_account_by_email(actor, email)?;
        let token = self.issue_pending(user.id, ConfirmationIntent::DeleteAccount, None)?;
        self.send_email(
            &user.email,
            EmailTemplate::DeleteAccount,
            json!({
                "username": user.username,
                "token": token.value,
            }),
        )
        .await?;
        Ok(user.email)
    }

    /// Removes the account. Its tracks and playlists stay behind. Returns the
    /// deleted username.
    pub async fn delete_account(
        &self,
        actor: &User,
        email: &str,
        confirmation_token: &str,
    ) -> ServiceResult<String> {
        let user = self.own_account_by_email(actor, email)?;
        user.pending
            .check(confirmation_token, ConfirmationIntent::DeleteAccount, now_secs())
            .map_err(|rejection| {
                debug!("Rejected deletion of user {}: {}", user.id, rejection);
                ServiceError::authentication("Wrong token, please request a new token!")
                    .with_status(StatusCode::NOT_ACCEPTABLE)
            })?;

        self.users.delete_user(user.id)?;
        if let Some(avatar) = &user.avatar {
            if let Err(err) = self.media.delete(&avatar.name).await {
                warn!("Failed to delete avatar {} of removed user: {}", avatar.name, err);
            }
        }
        info!("Deleted user {} ({})", user.id, user.username);
        Ok(user.username)
    }
}
