mod common;

use common::{Harness, PASSWORD, signup_form};
use shelfbank::ShelfError;
use shelfbank::config::INITIAL_BALANCE;
use shelfbank::remote::RemoteOp;

#[tokio::test]
async fn signup_stores_hashed_password_and_starting_balance() {
    let h = Harness::new().await;
    let id = h
        .accounts
        .signup(signup_form("ada@example.com"))
        .await
        .expect("signup failed");

    let user = h.local.get_user(id).await.expect("user missing");
    assert_ne!(user.password, PASSWORD);
    assert_eq!(user.password.len(), 64);
    assert_eq!(user.balance, INITIAL_BALANCE);

    let profile = h
        .remote
        .user(&format!("local-{id}"))
        .await
        .expect("remote profile missing");
    assert_eq!(profile.full_name, "Ada Lovelace");
    assert_eq!(profile.balance, INITIAL_BALANCE);
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let h = Harness::new().await;
    h.accounts
        .signup(signup_form("ada@example.com"))
        .await
        .expect("first signup failed");

    match h.accounts.signup(signup_form("ada@example.com")).await {
        Err(ShelfError::Validation(fields)) => assert!(fields.get("email").is_some()),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn signup_survives_remote_outage() {
    let h = Harness::new().await;
    h.remote.fail_on(RemoteOp::SaveUser).await;
    let id = h
        .accounts
        .signup(signup_form("ada@example.com"))
        .await
        .expect("local signup should succeed");
    assert!(h.remote.user(&format!("local-{id}")).await.is_none());
}

#[tokio::test]
async fn login_persists_session_and_logout_clears_it() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;
    assert!(session.logged_in);
    assert_eq!(session.full_name, "Ada Lovelace");
    assert_eq!(h.sessions.load().await.expect("load failed"), Some(session));

    h.accounts.logout().await.expect("logout failed");
    assert!(!h.sessions.is_logged_in().await.expect("load failed"));
    assert!(matches!(
        h.sessions.require().await,
        Err(ShelfError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let h = Harness::new().await;
    h.accounts
        .signup(signup_form("ada@example.com"))
        .await
        .expect("signup failed");

    assert!(matches!(
        h.accounts.login("ada@example.com", "not the password").await,
        Err(ShelfError::InvalidCredentials)
    ));
    assert!(matches!(
        h.accounts.login("nobody@example.com", PASSWORD).await,
        Err(ShelfError::InvalidCredentials)
    ));
    assert!(h.sessions.load().await.expect("load failed").is_none());
}

#[tokio::test]
async fn deposit_then_withdraw_updates_both_stores() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    let after_deposit = h.accounts.deposit(&session, "250").await.expect("deposit failed");
    assert_eq!(after_deposit.balance, 750.0);
    assert!(after_deposit.warning.is_none());

    let after_withdraw = h.accounts.withdraw(&session, "100.5").await.expect("withdraw failed");
    assert_eq!(after_withdraw.balance, 649.5);

    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), 649.5);
    let mirrored = h.remote.user(&session.remote_uid).await.expect("remote user");
    assert_eq!(mirrored.balance, 649.5);
}

#[tokio::test]
async fn withdraw_more_than_balance_changes_nothing() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    assert!(matches!(
        h.accounts.withdraw(&session, "500.01").await,
        Err(ShelfError::InsufficientFunds)
    ));
    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), INITIAL_BALANCE);

    let drained = h.accounts.withdraw(&session, "500").await.expect("withdraw failed");
    assert_eq!(drained.balance, 0.0);
}

#[tokio::test]
async fn invalid_amounts_are_rejected() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    for raw in ["", "abc", "0", "-5"] {
        match h.accounts.deposit(&session, raw).await {
            Err(ShelfError::Validation(fields)) => assert!(fields.get("amount").is_some()),
            other => panic!("expected validation error for {raw:?}, got {other:?}"),
        }
    }
    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), INITIAL_BALANCE);
}

#[tokio::test]
async fn failed_remote_mirror_is_a_warning() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;
    h.remote.fail_on(RemoteOp::UpdateBalance).await;

    let outcome = h.accounts.deposit(&session, "10").await.expect("deposit failed");
    assert_eq!(outcome.balance, 510.0);
    assert!(outcome.warning.is_some());
    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), 510.0);
    let remote = h.remote.user(&session.remote_uid).await.expect("remote user");
    assert_eq!(remote.balance, INITIAL_BALANCE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deposits_are_all_applied() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let accounts = h.accounts.clone();
            let session = session.clone();
            tokio::spawn(async move { accounts.deposit(&session, "10").await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("deposit failed");
    }

    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), 700.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_never_overdraw() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let accounts = h.accounts.clone();
            let session = session.clone();
            tokio::spawn(async move { accounts.withdraw(&session, "100").await })
        })
        .collect();
    let mut accepted = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => accepted += 1,
            Err(ShelfError::InsufficientFunds) => {}
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(accepted, 5);
    assert_eq!(h.local.balance(session.user_id).await.expect("balance"), 0.0);
}

#[tokio::test]
async fn debiting_unknown_user_is_not_found() {
    let h = Harness::new().await;
    assert!(matches!(
        h.local.debit_balance(999, 1.0).await,
        Err(ShelfError::NotFound(_))
    ));
    assert!(matches!(
        h.local.credit_balance(999, 1.0).await,
        Err(ShelfError::NotFound(_))
    ));
}

#[tokio::test]
async fn account_reports_remote_balance_only_when_it_drifts() {
    let h = Harness::new().await;
    let session = h.signed_in("ada@example.com").await;

    let view = h.accounts.account(&session).await.expect("account failed");
    assert_eq!(view.balance, INITIAL_BALANCE);
    assert_eq!(view.remote_balance, None);

    h.remote.fail_on(RemoteOp::UpdateBalance).await;
    h.accounts.deposit(&session, "10").await.expect("deposit failed");
    h.remote.recover(RemoteOp::UpdateBalance).await;

    let view = h.accounts.account(&session).await.expect("account failed");
    assert_eq!(view.balance, 510.0);
    assert_eq!(view.remote_balance, Some(INITIAL_BALANCE));

    h.remote.fail_on(RemoteOp::GetBalance).await;
    let view = h.accounts.account(&session).await.expect("remote outage must not fail");
    assert_eq!(view.balance, 510.0);
    assert_eq!(view.remote_balance, None);
}
