use bson::{Bson, doc, oid::ObjectId};
use hive_db::models::{WorkspaceInvite, WorkspaceMember};
use serde_json::Value;

use crate::spawn_or_skip;

#[tokio::test]
async fn invite_is_single_use() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let resp = app.send_invite(&ws, &owner, "ADMIN@hive.test", "admin").await;
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["email"], "admin@hive.test");
    assert!(json["data"].get("token").is_none());

    let (_, json) = app.get_json("/api/invite", &admin.access_token).await;
    assert_eq!(json["data"]["total"], 1);

    let token = app.mailer.invite_token(&admin.email).unwrap();
    let resp = app.accept_invite(&ws, &admin, &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["role"], "admin");

    let ws_id = ObjectId::parse_str(&ws).unwrap();
    let invite = app
        .db
        .collection::<bson::Document>(WorkspaceInvite::COLLECTION)
        .find_one(doc! { "workspace_id": ws_id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invite.get_str("status").unwrap(), "accepted");
    assert!(matches!(invite.get("token"), None | Some(Bson::Null)));

    let resp = app.accept_invite(&ws, &admin, &token).await;
    assert_eq!(resp.status().as_u16(), 404);

    let (_, json) = app
        .get_json(&format!("/api/workspace/{}", ws), &owner.access_token)
        .await;
    assert_eq!(json["data"]["members_count"], 2);
}

#[tokio::test]
async fn concurrent_accepts_admit_exactly_one() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 201);
    let token = app.mailer.invite_token(&member.email).unwrap();

    let attempts = (0..5).map(|_| app.accept_invite(&ws, &member, &token));
    let statuses: Vec<u16> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|resp| resp.status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1, "{:?}", statuses);
    assert!(statuses.iter().all(|s| *s == 200 || *s >= 400));

    let rows = app
        .db
        .collection::<bson::Document>(WorkspaceMember::COLLECTION)
        .count_documents(doc! {
            "workspace_id": ObjectId::parse_str(&ws).unwrap(),
            "user_id": ObjectId::parse_str(&member.id).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn concurrent_sends_leave_one_pending_invite() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let attempts = (0..5).map(|_| app.send_invite(&ws, &owner, &member.email, "member"));
    let statuses: Vec<u16> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|resp| resp.status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1, "{:?}", statuses);
    assert!(
        statuses.iter().all(|s| matches!(s, 201 | 409 | 503)),
        "{:?}",
        statuses
    );

    let pending = app
        .db
        .collection::<bson::Document>(WorkspaceInvite::COLLECTION)
        .count_documents(doc! {
            "workspace_id": ObjectId::parse_str(&ws).unwrap(),
            "email": member.email.as_str(),
            "status": "pending",
        })
        .await
        .unwrap();
    assert_eq!(pending, 1);
}

#[tokio::test]
async fn lapsed_invite_does_not_block_a_new_one() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    let ws_id = ObjectId::parse_str(&ws).unwrap();

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 201);
    let invites = app
        .db
        .collection::<bson::Document>(WorkspaceInvite::COLLECTION);
    invites
        .update_one(
            doc! { "workspace_id": ws_id, "email": member.email.as_str() },
            doc! { "$set": { "token_expires_at": bson::DateTime::from_millis(0) } },
        )
        .await
        .unwrap();

    let resp = app.send_invite(&ws, &owner, &member.email, "admin").await;
    assert_eq!(resp.status().as_u16(), 201);

    let expired = invites
        .count_documents(doc! { "workspace_id": ws_id, "status": "expired" })
        .await
        .unwrap();
    let pending = invites
        .count_documents(doc! { "workspace_id": ws_id, "status": "pending" })
        .await
        .unwrap();
    assert_eq!((expired, pending), (1, 1));

    let token = app.mailer.invite_token(&member.email).unwrap();
    let resp = app.accept_invite(&ws, &member, &token).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["role"], "admin");
}

#[tokio::test]
async fn token_is_bound_to_invited_email() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let invited = app.seed_user("invited").await;
    let intruder = app.seed_user("intruder").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    app.send_invite(&ws, &owner, &invited.email, "member").await;
    let token = app.mailer.invite_token(&invited.email).unwrap();

    let resp = app.accept_invite(&ws, &intruder, &token).await;
    assert_eq!(resp.status().as_u16(), 403);

    // The failed attempt rolled back; the rightful user still gets in.
    let resp = app.accept_invite(&ws, &invited, &token).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn invite_preconditions() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let resp = app.send_invite(&ws, &owner, &owner.email, "admin").await;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app.send_invite(&ws, &owner, "ghost@hive.test", "member").await;
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app.send_invite(&ws, &owner, &member.email, "owner").await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 201);
    let resp = app.send_invite(&ws, &owner, &member.email, "admin").await;
    assert_eq!(resp.status().as_u16(), 409);

    let token = app.mailer.invite_token(&member.email).unwrap();
    app.accept_invite(&ws, &member, &token).await;

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 409);

    // Only the owner sends invites.
    let resp = app.send_invite(&ws, &member, &owner.email, "member").await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn failed_invite_email_leaves_no_invite() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    app.mailer.set_failing(true);
    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 502);
    app.mailer.set_failing(false);

    let pending = app
        .db
        .collection::<bson::Document>(WorkspaceInvite::COLLECTION)
        .count_documents(doc! { "workspace_id": ObjectId::parse_str(&ws).unwrap() })
        .await
        .unwrap();
    assert_eq!(pending, 0);

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn declined_invite_cannot_be_accepted() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let resp = app.send_invite(&ws, &owner, &member.email, "member").await;
    let json: Value = resp.json().await.unwrap();
    let invite_id = json["data"]["id"].as_str().unwrap().to_string();
    let token = app.mailer.invite_token(&member.email).unwrap();

    // Only the addressee may decline.
    let resp = app
        .auth_post(&format!("/api/invite/{}/decline", invite_id), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_post(&format!("/api/invite/{}/decline", invite_id), &member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "declined");

    let resp = app.accept_invite(&ws, &member, &token).await;
    assert_eq!(resp.status().as_u16(), 404);

    let (_, json) = app
        .get_json(&format!("/api/workspace/{}/invite", ws), &owner.access_token)
        .await;
    assert_eq!(json["data"]["items"][0]["status"], "declined");
}

#[tokio::test]
async fn expired_invites_are_swept() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    app.send_invite(&ws, &owner, &member.email, "member").await;
    let token = app.mailer.invite_token(&member.email).unwrap();

    let invites = app
        .db
        .collection::<bson::Document>(WorkspaceInvite::COLLECTION);
    invites
        .update_many(
            doc! { "workspace_id": ObjectId::parse_str(&ws).unwrap() },
            doc! { "$set": { "token_expires_at": bson::DateTime::from_millis(0) } },
        )
        .await
        .unwrap();

    let (_, json) = app
        .get_json(&format!("/api/workspace/{}/invite", ws), &owner.access_token)
        .await;
    assert_eq!(json["data"]["items"][0]["status"], "expired");

    let resp = app.accept_invite(&ws, &member, &token).await;
    assert_eq!(resp.status().as_u16(), 404);

    let swept = app.state.invites.expire_stale().await.unwrap();
    assert_eq!(swept, 1);
    let stored = invites.find_one(doc! {}).await.unwrap().unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "expired");
}
