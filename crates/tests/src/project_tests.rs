use serde_json::{Value, json};

use crate::spawn_or_skip;

#[tokio::test]
async fn project_with_tasks_cannot_be_deleted() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    let project = app.create_project(&ws, &owner, "Launch").await;
    let task = app.create_task(&ws, &project, &owner, "Write copy").await;

    let project_path = format!("/api/workspace/{}/project/{}", ws, project);
    let resp = app
        .auth_delete(&project_path, &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_delete(&format!("{}/task/{}", project_path, task), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_delete(&project_path, &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let (status, _) = app.get_json(&project_path, &owner.access_token).await;
    assert_eq!(status, 404);
    let (_, json) = app
        .get_json(&format!("/api/workspace/{}", ws), &owner.access_token)
        .await;
    assert_eq!(json["data"]["projects_count"], 0);
}

#[tokio::test]
async fn creator_and_owner_start_as_members() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &admin, "admin").await;

    let project = app.create_project(&ws, &admin, "Launch").await;
    let (_, json) = app
        .get_json(
            &format!("/api/workspace/{}/project/{}", ws, project),
            &admin.access_token,
        )
        .await;
    assert_eq!(json["data"]["created_by"], admin.id.as_str());
    let members: Vec<&str> = json["data"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(members, vec![admin.id.as_str(), owner.id.as_str()]);
}

#[tokio::test]
async fn private_projects_are_hidden_from_non_members() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &member, "member").await;

    let private = app.create_project(&ws, &owner, "Secret").await;
    let resp = app
        .auth_post(&format!("/api/workspace/{}/project", ws), &owner.access_token)
        .json(&json!({ "name": "Open House", "visibility": "public" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let (status, _) = app
        .get_json(
            &format!("/api/workspace/{}/project/{}", ws, private),
            &member.access_token,
        )
        .await;
    assert_eq!(status, 404);

    let (_, json) = app
        .get_json(&format!("/api/workspace/{}/project", ws), &member.access_token)
        .await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["name"], "Open House");

    // Search narrows the owner's full view.
    let (_, json) = app
        .get_json(
            &format!("/api/workspace/{}/project?search=secr", ws),
            &owner.access_token,
        )
        .await;
    assert_eq!(json["data"]["total"], 1);

    // Members cannot create projects.
    let resp = app
        .auth_post(&format!("/api/workspace/{}/project", ws), &member.access_token)
        .json(&json!({ "name": "Rogue" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn project_member_rules() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let other_admin = app.seed_user("otheradmin").await;
    let member = app.seed_user("member").await;
    let outsider = app.seed_user("outsider").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &admin, "admin").await;
    app.join(&ws, &owner, &other_admin, "admin").await;
    app.join(&ws, &owner, &member, "member").await;

    let project = app.create_project(&ws, &admin, "Launch").await;
    let members_path = format!("/api/workspace/{}/project/{}/member", ws, project);

    let add = |actor: &str, user_id: &str| {
        app.auth_post(&members_path, actor)
            .json(&json!({ "user_id": user_id }))
    };

    let resp = add(&admin.access_token, &other_admin.id).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let resp = add(&admin.access_token, &outsider.id).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let resp = add(&admin.access_token, &admin.id).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let resp = add(&admin.access_token, &member.id).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let resp = add(&admin.access_token, &member.id).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let (_, json) = app.get_json(&members_path, &admin.access_token).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);

    // The creator stays.
    let resp = app
        .auth_delete(&format!("{}/{}", members_path, admin.id), &owner.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Admins may not remove the owner.
    let resp = app
        .auth_delete(&format!("{}/{}", members_path, owner.id), &admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn removing_a_member_unassigns_only_that_project() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &admin, "admin").await;
    app.join(&ws, &owner, &member, "member").await;

    let first = app.create_project(&ws, &admin, "First").await;
    let second = app.create_project(&ws, &owner, "Second").await;
    app.add_project_member(&ws, &first, &admin, &member).await;
    app.add_project_member(&ws, &second, &owner, &member).await;
    let first_task = app.create_task(&ws, &first, &admin, "Alpha").await;
    let second_task = app.create_task(&ws, &second, &owner, "Beta").await;

    let resp = app.assign(&ws, &first, &first_task, &admin, &member).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app.assign(&ws, &second, &second_task, &owner, &member).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_delete(
            &format!("/api/workspace/{}/project/{}/member/{}", ws, first, member.id),
            &owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let (_, json) = app
        .get_json(
            &format!("/api/workspace/{}/project/{}/task/{}", ws, first, first_task),
            &owner.access_token,
        )
        .await;
    assert_eq!(json["data"]["assignees"].as_array().unwrap().len(), 0);
    assert_eq!(json["data"]["is_personal"], true);
    assert_eq!(json["data"]["last_modified_by"], owner.id.as_str());

    let (_, json) = app
        .get_json(
            &format!("/api/workspace/{}/project/{}/task/{}", ws, second, second_task),
            &owner.access_token,
        )
        .await;
    assert_eq!(json["data"]["assignees"][0], member.id.as_str());
    assert_eq!(json["data"]["is_personal"], false);
}

#[tokio::test]
async fn status_change_is_limited_to_managers() {
    let app = spawn_or_skip!();
    let owner = app.seed_user("owner").await;
    let member = app.seed_user("member").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &member, "member").await;
    let project = app.create_project(&ws, &owner, "Launch").await;
    app.add_project_member(&ws, &project, &owner, &member).await;

    let status_path = format!("/api/workspace/{}/project/{}/status", ws, project);
    let resp = app
        .auth_patch(&status_path, &member.access_token)
        .json(&json!({ "status": "on-hold" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_patch(&status_path, &owner.access_token)
        .json(&json!({ "status": "on-hold" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "on-hold");
}
