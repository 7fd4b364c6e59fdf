use bson::{doc, oid::ObjectId};
use hive_db::models::{AuditLogEntry, Project, Task, WorkspaceInvite, WorkspaceMember};
use serde_json::json;

use crate::spawn_or_skip;

#[tokio::test]
async fn creator_becomes_sole_owner() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let (status, json) = app
        .get_json(&format!("/api/workspace/{}", ws), &owner.access_token)
        .await;
    assert_eq!(status, 200);
    assert_eq!(json["data"]["slug"], "acme");
    assert_eq!(json["data"]["owner_id"], owner.id.as_str());
    assert_eq!(json["data"]["members_count"], 1);

    let (_, json) = app
        .get_json(&format!("/api/workspace/{}/member", ws), &owner.access_token)
        .await;
    let members = json["data"]["items"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["role"], "owner");
    assert_eq!(members[0]["user_id"], owner.id.as_str());

    let ws_id = ObjectId::parse_str(&ws).unwrap();
    let audits = app
        .db
        .collection::<bson::Document>(AuditLogEntry::COLLECTION)
        .count_documents(doc! { "workspace_id": ws_id, "resource_type": "workspace", "action": "created" })
        .await
        .unwrap();
    assert_eq!(audits, 1);
}

#[tokio::test]
async fn duplicate_workspace_name_conflicts() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    app.create_workspace(&owner, "Acme").await;

    let resp = app
        .auth_post("/api/workspace", &owner.access_token)
        .json(&json!({ "name": "ACME" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn outsiders_are_forbidden_and_unknown_workspaces_missing() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let outsider = app.seed_user("outsider").await;
    let ws = app.create_workspace(&owner, "Acme").await;

    let (status, _) = app
        .get_json(&format!("/api/workspace/{}", ws), &outsider.access_token)
        .await;
    assert_eq!(status, 403);

    let (status, _) = app
        .get_json(
            &format!("/api/workspace/{}", ObjectId::new().to_hex()),
            &outsider.access_token,
        )
        .await;
    assert_eq!(status, 404);

    let (status, json) = app.get_json("/api/workspace", &outsider.access_token).await;
    assert_eq!(status, 200);
    assert_eq!(json["data"]["total"], 0);
}

#[tokio::test]
async fn only_owner_updates_settings() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &admin, "admin").await;

    let resp = app
        .auth_patch(&format!("/api/workspace/{}", ws), &admin.access_token)
        .json(&json!({ "description": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_patch(&format!("/api/workspace/{}", ws), &owner.access_token)
        .json(&json!({ "name": "Acme Labs", "settings": { "max_members": 10, "theme": "dark" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["slug"], "acme-labs");
    assert_eq!(json["data"]["settings"]["max_members"], 10);
    assert_eq!(json["data"]["settings"]["theme"], "dark");

    // Below the current member count.
    let resp = app
        .auth_patch(&format!("/api/workspace/{}", ws), &owner.access_token)
        .json(&json!({ "settings": { "max_members": 1 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn deleting_workspace_cascades() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &member, "member").await;
    let project = app.create_project(&ws, &owner, "Launch").await;
    app.create_task(&ws, &project, &owner, "Write copy").await;

    let resp = app
        .auth_delete(&format!("/api/workspace/{}", ws), &member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&format!("/api/workspace/{}", ws), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let ws_id = ObjectId::parse_str(&ws).unwrap();
    for collection in [
        Project::COLLECTION,
        Task::COLLECTION,
        WorkspaceMember::COLLECTION,
        WorkspaceInvite::COLLECTION,
    ] {
        let left = app
            .db
            .collection::<bson::Document>(collection)
            .count_documents(doc! { "workspace_id": ws_id })
            .await
            .unwrap();
        assert_eq!(left, 0, "{} not emptied", collection);
    }

    let (status, _) = app
        .get_json(&format!("/api/workspace/{}", ws), &owner.access_token)
        .await;
    assert_eq!(status, 404);
}
