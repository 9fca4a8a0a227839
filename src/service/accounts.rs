use crate::config::INITIAL_BALANCE;
use crate::db::{LocalStore, NewUser};
use crate::error::{FieldErrors, ShelfError};
use crate::remote::SharedRemote;
use crate::service::validation::{hash_password, parse_amount, validate_signup, verify_password};
use crate::session::{Session, SessionStore};
use crate::types::{AccountView, BalanceOutcome, RemoteUser, SignupForm};
use tracing::{debug, info, warn};

/// Signup, login and balance changes.
///
/// The local balance is authoritative: it is checked and written first, and
/// the remote copy is mirrored afterwards on a best-effort basis.
#[derive(Clone)]
pub struct AccountService {
    local: LocalStore,
    remote: SharedRemote,
    sessions: SessionStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalanceChange {
    Deposit,
    Withdraw,
}

impl AccountService {
    pub fn new(local: LocalStore, remote: SharedRemote, sessions: SessionStore) -> Self {
        Self {
            local,
            remote,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Create an account with the initial balance. Returns the local row id.
    pub async fn signup(&self, form: SignupForm) -> Result<i64, ShelfError> {
        validate_signup(&form).into_result()?;

        let email = form.email.trim().to_string();
        if self.local.user_exists(&email).await? {
            return Err(ShelfError::Validation(FieldErrors::single(
                "email",
                "Email already registered",
            )));
        }

        let full_name = format!("{} {}", form.first_name.trim(), form.last_name.trim());
        let id = self
            .local
            .insert_user(NewUser {
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                gender: form.gender.trim().to_string(),
                email: email.clone(),
                password_hash: hash_password(&form.password),
                phone_number: form.phone_number.trim().to_string(),
                balance: INITIAL_BALANCE,
            })
            .await?;

        let uid = format!("local-{id}");
        self.local.set_remote_id(id, &uid).await?;
        let profile = RemoteUser {
            full_name,
            email,
            balance: INITIAL_BALANCE,
        };
        if let Err(e) = self.remote.save_user(&uid, &profile).await {
            warn!(user_id = id, error = %e, "remote profile not saved");
        }

        info!(user_id = id, "account created");
        Ok(id)
    }

    /// Verify credentials and persist a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ShelfError> {
        let email = email.trim();
        let mut errors = FieldErrors::new();
        if email.is_empty() {
            errors.add("email", "Email is required");
        }
        if password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()?;

        let user = self
            .local
            .get_user_by_email(email)
            .await?
            .ok_or(ShelfError::InvalidCredentials)?;
        if !verify_password(password, &user.password) {
            warn!(user_id = user.id, "login rejected: incorrect password");
            return Err(ShelfError::InvalidCredentials);
        }

        let session = Session {
            full_name: user.full_name(),
            email: user.email.clone(),
            user_id: user.id,
            remote_uid: user.remote_uid(),
            logged_in: true,
        };
        self.sessions.save(&session).await?;
        info!(user_id = user.id, "login successful");
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), ShelfError> {
        self.sessions.clear().await
    }

    pub async fn account(&self, session: &Session) -> Result<AccountView, ShelfError> {
        let user = self.local.get_user(session.user_id).await?;
        let remote_balance = match self.remote.get_balance(&session.remote_uid).await {
            Ok(Some(remote)) if remote != user.balance => {
                warn!(user_id = user.id, local = user.balance, remote, "remote balance out of sync");
                Some(remote)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(user_id = user.id, error = %e, "remote balance unavailable");
                None
            }
        };
        Ok(AccountView {
            full_name: user.full_name(),
            email: user.email,
            balance: user.balance,
            remote_balance,
        })
    }

    pub async fn deposit(&self, session: &Session, raw_amount: &str) -> Result<BalanceOutcome, ShelfError> {
        self.change_balance(session, raw_amount, BalanceChange::Deposit)
            .await
    }

    pub async fn withdraw(&self, session: &Session, raw_amount: &str) -> Result<BalanceOutcome, ShelfError> {
        self.change_balance(session, raw_amount, BalanceChange::Withdraw)
            .await
    }

    async fn change_balance(
        &self,
        session: &Session,
        raw_amount: &str,
        change: BalanceChange,
    ) -> Result<BalanceOutcome, ShelfError> {
        let amount = parse_amount(raw_amount)?;
        let balance = match change {
            BalanceChange::Deposit => self.local.credit_balance(session.user_id, amount).await?,
            BalanceChange::Withdraw => match self.local.debit_balance(session.user_id, amount).await? {
                Some(balance) => balance,
                None => {
                    info!(user_id = session.user_id, amount, "withdrawal rejected: insufficient funds");
                    return Err(ShelfError::InsufficientFunds);
                }
            },
        };

        info!(user_id = session.user_id, ?change, amount, balance, "local balance updated");

        let warning = match self.remote.update_balance(&session.remote_uid, balance).await {
            Ok(()) => None,
            Err(e) => {
                warn!(user_id = session.user_id, error = %e, "remote balance not mirrored");
                Some(format!("Balance saved locally but not synced: {e}"))
            }
        };
        Ok(BalanceOutcome { balance, warning })
    }
}
