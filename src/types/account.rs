use serde::{Deserialize, Serialize};

/// Profile mirrored under `/users/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Amount as typed by the user; parsed and checked by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountForm {
    pub amount: String,
}

/// Account summary. `balance` is the local, authoritative figure;
/// `remote_balance` is only set when the remote copy was read and differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub full_name: String,
    pub email: String,
    pub balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_balance: Option<f64>,
}

/// Result of a deposit or withdrawal. The local balance is final; a failed
/// remote mirror only produces a warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceOutcome {
    pub balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
