//! Accounts and sessions.

use crate::auth::{random_token, PasswordHash, TokenSigner};
use crate::config::HostConfig;
use crate::error::{HostError, HostResult};
use hostlink_core::{unix_now, Credentials, Session, SignUp, User};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone)]
struct Account {
    id: Uuid,
    email: String,
    password: PasswordHash,
    metadata: Map<String, Value>,
    created_at: u64,
    confirmed: bool,
}

impl Account {
    fn user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: self.email.clone(),
            metadata: self.metadata.clone(),
            created_at: Some(self.created_at.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Grant {
    user_id: Uuid,
    session_id: Uuid,
}

#[derive(Default)]
struct AccountState {
    /// Accounts by normalized email.
    accounts: HashMap<String, Account>,
    /// Email by account id.
    emails: HashMap<Uuid, String>,
    /// Outstanding refresh tokens.
    grants: HashMap<String, Grant>,
    /// Sessions ended by logout, with the time they ended. An entry is
    /// dropped once every token issued before that time has expired.
    revoked: HashMap<Uuid, Instant>,
}

impl AccountState {
    fn by_id(&self, id: &Uuid) -> Option<&Account> {
        self.emails.get(id).and_then(|email| self.accounts.get(email))
    }
}

/// Account registry and session issuer.
pub struct Accounts {
    signer: TokenSigner,
    min_password_length: usize,
    autoconfirm: bool,
    state: RwLock<AccountState>,
}

impl Accounts {
    /// Creates an empty registry.
    pub fn new(config: &HostConfig) -> Self {
        Self {
            signer: TokenSigner::new(config.jwt_secret.clone(), config.token_expiry),
            min_password_length: config.min_password_length,
            autoconfirm: config.autoconfirm,
            state: RwLock::new(AccountState::default()),
        }
    }

    /// Returns the number of registered accounts.
    pub fn len(&self) -> usize {
        self.state.read().accounts.len()
    }

    /// Returns true if no account is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a new account.
    pub fn sign_up(&self, credentials: &Credentials) -> HostResult<SignUp> {
        let email = normalize_email(&credentials.email)?;
        if credentials.password.chars().count() < self.min_password_length {
            return Err(HostError::WeakPassword {
                min: self.min_password_length,
            });
        }

        let mut state = self.state.write();
        if state.accounts.contains_key(&email) {
            debug!(email = %email, "sign-up for existing account rejected");
            return Err(HostError::UserExists);
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.clone(),
            password: PasswordHash::new(&credentials.password),
            metadata: credentials.metadata.clone(),
            created_at: unix_now(),
            confirmed: self.autoconfirm,
        };
        let user = account.user();
        state.emails.insert(account.id, email.clone());
        state.accounts.insert(email, account.clone());
        info!(user_id = %account.id, "account registered");

        let session = if account.confirmed {
            Some(self.issue(&mut state, &account, Uuid::new_v4()))
        } else {
            None
        };
        Ok(SignUp { user, session })
    }

    /// Marks an account's email as confirmed. Returns false for unknown emails.
    pub fn confirm_email(&self, email: &str) -> bool {
        let Ok(email) = normalize_email(email) else {
            return false;
        };
        match self.state.write().accounts.get_mut(&email) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Exchanges email and password for a new session.
    pub fn sign_in(&self, email: &str, password: &str) -> HostResult<Session> {
        let email = normalize_email(email).map_err(|_| HostError::InvalidCredentials)?;
        let mut state = self.state.write();
        let account = match state.accounts.get(&email) {
            Some(account) if account.password.verify(password) => account.clone(),
            _ => return Err(HostError::InvalidCredentials),
        };
        if !account.confirmed {
            return Err(HostError::EmailNotConfirmed);
        }
        Ok(self.issue(&mut state, &account, Uuid::new_v4()))
    }

    /// Exchanges a refresh token for a new session. The token is consumed.
    pub fn refresh(&self, refresh_token: &str) -> HostResult<Session> {
        let mut state = self.state.write();
        let grant = state
            .grants
            .remove(refresh_token)
            .ok_or(HostError::InvalidRefreshToken)?;
        if state.revoked.contains_key(&grant.session_id) {
            return Err(HostError::InvalidRefreshToken);
        }
        let account = state
            .by_id(&grant.user_id)
            .cloned()
            .ok_or(HostError::InvalidRefreshToken)?;
        Ok(self.issue(&mut state, &account, grant.session_id))
    }

    /// Ends the session `access_token` belongs to.
    pub fn sign_out(&self, access_token: &str) -> HostResult<()> {
        let claims = self.signer.validate(access_token)?;
        let mut state = self.state.write();
        let expiry = self.signer.expiry();
        state.revoked.retain(|_, ended| ended.elapsed() <= expiry);
        state.revoked.insert(claims.session_id, Instant::now());
        state
            .grants
            .retain(|_, grant| grant.session_id != claims.session_id);
        info!(user_id = %claims.user_id, "session revoked");
        Ok(())
    }

    /// Returns the user `access_token` was issued to.
    pub fn user_for(&self, access_token: &str) -> HostResult<User> {
        let claims = self.signer.validate(access_token)?;
        let state = self.state.read();
        if state.revoked.contains_key(&claims.session_id) {
            return Err(HostError::InvalidToken("session has ended".into()));
        }
        state
            .by_id(&claims.user_id)
            .map(Account::user)
            .ok_or_else(|| HostError::InvalidToken("user not found".into()))
    }

    fn issue(&self, state: &mut AccountState, account: &Account, session_id: Uuid) -> Session {
        let access_token = self.signer.issue(account.id, session_id);
        let refresh_token = random_token();
        state.grants.insert(
            refresh_token.clone(),
            Grant {
                user_id: account.id,
                session_id,
            },
        );

        let expires_in = self.signer.expiry().as_secs();
        Session {
            access_token,
            token_type: "bearer".to_string(),
            refresh_token,
            expires_in,
            expires_at: unix_now().saturating_add(expires_in),
            user: account.user(),
        }
    }
}

fn normalize_email(email: &str) -> HostResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(HostError::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn accounts() -> Accounts {
        Accounts::new(&HostConfig::default())
    }

    #[test]
    fn sign_up_issues_session() {
        let accounts = accounts();
        let outcome = accounts
            .sign_up(&Credentials::new("Ann@Example.com", "secret1"))
            .unwrap();
        assert_eq!(outcome.user.email, "ann@example.com");

        let session = outcome.session.unwrap();
        assert_eq!(session.expires_in, 3600);
        assert_eq!(accounts.user_for(&session.access_token).unwrap(), outcome.user);
    }

    #[test]
    fn duplicate_sign_up_keeps_original_password() {
        let accounts = accounts();
        accounts
            .sign_up(&Credentials::new("ann@example.com", "original"))
            .unwrap();

        let err = accounts
            .sign_up(&Credentials::new("ANN@example.com", "replacement"))
            .unwrap_err();
        assert_eq!(err, HostError::UserExists);

        assert!(accounts.sign_in("ann@example.com", "original").is_ok());
        assert_eq!(
            accounts.sign_in("ann@example.com", "replacement").unwrap_err(),
            HostError::InvalidCredentials
        );
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn weak_password_and_bad_email_rejected() {
        let accounts = accounts();
        assert_eq!(
            accounts
                .sign_up(&Credentials::new("ann@example.com", "12345"))
                .unwrap_err(),
            HostError::WeakPassword { min: 6 }
        );
        for email in ["", "ann", "@example.com", "ann@localhost", "a b@example.com"] {
            assert_eq!(
                accounts.sign_up(&Credentials::new(email, "secret1")).unwrap_err(),
                HostError::InvalidEmail,
                "{email}"
            );
        }
        assert!(accounts.is_empty());
    }

    #[test]
    fn unknown_email_and_wrong_password_look_alike() {
        let accounts = accounts();
        accounts
            .sign_up(&Credentials::new("ann@example.com", "secret1"))
            .unwrap();
        assert_eq!(
            accounts.sign_in("bob@example.com", "secret1").unwrap_err(),
            accounts.sign_in("ann@example.com", "wrong!!").unwrap_err()
        );
    }

    #[test]
    fn refresh_tokens_are_single_use() {
        let accounts = accounts();
        accounts
            .sign_up(&Credentials::new("ann@example.com", "secret1"))
            .unwrap();
        let session = accounts.sign_in("ann@example.com", "secret1").unwrap();

        let renewed = accounts.refresh(&session.refresh_token).unwrap();
        assert_ne!(renewed.refresh_token, session.refresh_token);
        assert_eq!(
            accounts.refresh(&session.refresh_token).unwrap_err(),
            HostError::InvalidRefreshToken
        );
        assert!(accounts.refresh(&renewed.refresh_token).is_ok());
    }

    #[test]
    fn sign_out_revokes_session() {
        let accounts = accounts();
        accounts
            .sign_up(&Credentials::new("ann@example.com", "secret1"))
            .unwrap();
        let session = accounts.sign_in("ann@example.com", "secret1").unwrap();
        let other = accounts.sign_in("ann@example.com", "secret1").unwrap();

        accounts.sign_out(&session.access_token).unwrap();
        assert!(matches!(
            accounts.user_for(&session.access_token),
            Err(HostError::InvalidToken(_))
        ));
        assert_eq!(
            accounts.refresh(&session.refresh_token).unwrap_err(),
            HostError::InvalidRefreshToken
        );

        // Other sessions of the same user are unaffected.
        assert!(accounts.user_for(&other.access_token).is_ok());
    }

    #[test]
    fn expired_revocations_are_forgotten() {
        let config = HostConfig::default().with_token_expiry(Duration::from_millis(20));
        let accounts = Accounts::new(&config);
        accounts
            .sign_up(&Credentials::new("ann@example.com", "secret1"))
            .unwrap();

        let first = accounts.sign_in("ann@example.com", "secret1").unwrap();
        accounts.sign_out(&first.access_token).unwrap();
        assert_eq!(accounts.state.read().revoked.len(), 1);

        std::thread::sleep(Duration::from_millis(40));
        let second = accounts.sign_in("ann@example.com", "secret1").unwrap();
        accounts.sign_out(&second.access_token).unwrap();

        assert_eq!(accounts.state.read().revoked.len(), 1);
    }

    #[test]
    fn email_confirmation_gates_sign_in() {
        let config = HostConfig::default().with_email_confirmation();
        let accounts = Accounts::new(&config);

        let outcome = accounts
            .sign_up(&Credentials::new("ann@example.com", "secret1"))
            .unwrap();
        assert!(outcome.session.is_none());
        assert_eq!(
            accounts.sign_in("ann@example.com", "secret1").unwrap_err(),
            HostError::EmailNotConfirmed
        );

        assert!(accounts.confirm_email("ANN@example.com"));
        assert!(!accounts.confirm_email("bob@example.com"));
        assert!(accounts.sign_in("ann@example.com", "secret1").is_ok());
    }
}
