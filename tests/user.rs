pub mod common;

use reqwest::StatusCode;
use shipping_portal::api;

#[tokio::test]
async fn admin_creates_user() {
    let admin = common::Client::new()
        .auth("ADMIN", common::ADMIN_USER_ID, common::ADMIN_PASSWORD)
        .await;
    let user_id = common::unique_user_id("alice");

    let user = admin.create_user(&user_id, "Alice", "pw1").await.unwrap();
    assert_eq!(user.user_id, api::user::Id::from(user_id.as_str()));
    assert_eq!(user.name, "Alice");
    assert_eq!(user.role, api::user::Role::User);
}

#[tokio::test]
async fn duplicate_user_id_is_rejected_and_original_kept() {
    let admin = common::Client::new()
        .auth("ADMIN", common::ADMIN_USER_ID, common::ADMIN_PASSWORD)
        .await;
    let user_id = common::unique_user_id("carol");
    admin.create_user(&user_id, "Carol", "pw1").await.unwrap();

    let status = admin
        .create_user(&user_id, "Impostor", "pw2")
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::CONFLICT);

    // The original record is unchanged: its password still works and the
    // second one never took.
    let token = common::Client::new()
        .try_auth("USER", &user_id, "pw1")
        .await
        .unwrap();
    assert!(!token.is_empty());
    let status = common::Client::new()
        .try_auth("USER", &user_id, "pw2")
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn lists_registered_users_without_passwords() {
    let admin = common::Client::new()
        .auth("ADMIN", common::ADMIN_USER_ID, common::ADMIN_PASSWORD)
        .await;
    let user_id = common::unique_user_id("dave");
    admin.create_user(&user_id, "Dave", "pw1").await.unwrap();

    let users = admin.list_users().await.unwrap();
    assert!(users
        .iter()
        .any(|u| u.user_id == api::user::Id::from(common::ADMIN_USER_ID)));
    assert!(users
        .iter()
        .any(|u| u.user_id == api::user::Id::from(user_id.as_str())));
}

#[tokio::test]
async fn regular_user_cannot_create_or_list_users() {
    let admin = common::Client::new()
        .auth("ADMIN", common::ADMIN_USER_ID, common::ADMIN_PASSWORD)
        .await;
    let user_id = common::unique_user_id("eve");
    admin.create_user(&user_id, "Eve", "pw1").await.unwrap();

    let user = common::Client::new().auth("USER", &user_id, "pw1").await;

    let status = user
        .create_user(&common::unique_user_id("mallory"), "Mallory", "pw2")
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);

    let status = user.list_users().await.unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn fails_when_unauthorized() {
    let status = common::Client::new().list_users().await.unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
