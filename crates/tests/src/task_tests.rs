use serde_json::{Value, json};

use crate::fixtures::{seed::SeededUser, test_app::TestApp};
use crate::spawn_or_skip;

struct Board {
    ws: String,
    project: String,
    task: String,
    owner: SeededUser,
    admin: SeededUser,
    member: SeededUser,
    bystander: SeededUser,
}

impl Board {
    fn tasks(&self) -> String {
        format!("/api/workspace/{}/project/{}/task", self.ws, self.project)
    }

    fn task(&self, id: &str) -> String {
        format!("{}/{}", self.tasks(), id)
    }
}

/// An admin-created project holding one task. `member` belongs to the
/// project; `bystander` only to the workspace.
async fn board(app: &TestApp) -> Board {
    let owner = app.seed_user("owner").await;
    let admin = app.seed_user("admin").await;
    let member = app.seed_user("member").await;
    let bystander = app.seed_user("bystander").await;
    let ws = app.create_workspace(&owner, "Acme").await;
    app.join(&ws, &owner, &admin, "admin").await;
    app.join(&ws, &owner, &member, "member").await;
    app.join(&ws, &owner, &bystander, "member").await;

    let project = app.create_project(&ws, &admin, "Launch").await;
    app.add_project_member(&ws, &project, &admin, &member).await;
    let task = app.create_task(&ws, &project, &admin, "Write copy").await;

    Board {
        ws,
        project,
        task,
        owner,
        admin,
        member,
        bystander,
    }
}

#[tokio::test]
async fn assignment_rules() {
    let app = spawn_or_skip!();
    let b = board(&app).await;

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.owner).await;
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.admin).await;
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app
        .assign(&b.ws, &b.project, &b.task, &b.admin, &b.bystander)
        .await;
    assert_eq!(resp.status().as_u16(), 400);
    let resp = app.assign(&b.ws, &b.project, &b.task, &b.member, &b.member).await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["assignees"][0], b.member.id.as_str());
    assert_eq!(json["data"]["is_personal"], false);

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 409);

    // The owner may assign themselves.
    let resp = app.assign(&b.ws, &b.project, &b.task, &b.owner, &b.owner).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["assignees"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unassign_restores_personal_task() {
    let app = spawn_or_skip!();
    let b = board(&app).await;

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_delete(
            &format!("{}/assign/{}", b.task(&b.task), b.admin.id),
            &b.owner.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_delete(
            &format!("{}/assign/{}", b.task(&b.task), b.member.id),
            &b.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["assignees"].as_array().unwrap().len(), 0);
    assert_eq!(json["data"]["is_personal"], true);
}

#[tokio::test]
async fn assigned_task_cannot_be_deleted() {
    let app = spawn_or_skip!();
    let b = board(&app).await;

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_delete(&b.task(&b.task), &b.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_delete(
            &format!("{}/assign/{}", b.task(&b.task), b.member.id),
            &b.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Members may only delete tasks they created.
    let resp = app
        .auth_delete(&b.task(&b.task), &b.member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&b.task(&b.task), &b.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let (status, _) = app.get_json(&b.task(&b.task), &b.admin.access_token).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn assignee_completes_task() {
    let app = spawn_or_skip!();
    let b = board(&app).await;
    let status_path = format!("{}/status", b.task(&b.task));

    let resp = app
        .auth_post(&status_path, &b.member.access_token)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post(&status_path, &b.member.access_token)
        .json(&json!({ "status": "done", "actual_time": 45 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["status"], "done");
    assert_eq!(json["data"]["actual_time"], 45);
    assert!(json["data"]["completed_at"].is_string());
    assert_eq!(json["data"]["completed_by"], b.member.id.as_str());

    let resp = app
        .auth_post(&status_path, &b.member.access_token)
        .json(&json!({ "status": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["data"]["completed_at"].is_null());
}

#[tokio::test]
async fn subtask_tree_rejects_cycles() {
    let app = spawn_or_skip!();
    let b = board(&app).await;

    let resp = app
        .auth_post(&b.tasks(), &b.admin.access_token)
        .json(&json!({
            "title": "Proofread",
            "estimated_time": 30,
            "due_date": "2030-01-01T00:00:00Z",
            "parent_task": b.task,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    let child = json["data"]["id"].as_str().unwrap().to_string();

    let (_, json) = app.get_json(&b.task(&b.task), &b.admin.access_token).await;
    assert_eq!(json["data"]["subtasks"][0], child.as_str());

    let resp = app
        .auth_patch(&b.task(&b.task), &b.admin.access_token)
        .json(&json!({ "parent_task": child }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_patch(&b.task(&b.task), &b.admin.access_token)
        .json(&json!({ "parent_task": b.task }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // A parent with subtasks stays until they are gone.
    let resp = app
        .auth_delete(&b.task(&b.task), &b.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_patch(&b.task(&child), &b.admin.access_token)
        .json(&json!({ "parent_task": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["data"]["parent_task"].is_null());

    let (_, json) = app.get_json(&b.task(&b.task), &b.admin.access_token).await;
    assert_eq!(json["data"]["subtasks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn task_access_follows_project_membership() {
    let app = spawn_or_skip!();
    let b = board(&app).await;
    let viewer = app.seed_user("viewer").await;
    app.join(&b.ws, &b.owner, &viewer, "viewer").await;

    let (status, _) = app.get_json(&b.tasks(), &b.bystander.access_token).await;
    assert_eq!(status, 403);
    let (status, _) = app.get_json(&b.tasks(), &viewer.access_token).await;
    assert_eq!(status, 403);

    let (status, json) = app.get_json(&b.tasks(), &b.owner.access_token).await;
    assert_eq!(status, 200);
    assert_eq!(json["data"]["total"], 1);

    let resp = app
        .auth_post(&b.tasks(), &b.member.access_token)
        .json(&json!({
            "title": "Write copy",
            "estimated_time": 15,
            "due_date": "2030-01-01T00:00:00Z",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let own = app.create_task(&b.ws, &b.project, &b.member, "Draft outline").await;
    let resp = app
        .auth_patch(&b.task(&b.task), &b.member.access_token)
        .json(&json!({ "title": "Rewrite copy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let resp = app
        .auth_patch(&b.task(&own), &b.member.access_token)
        .json(&json!({ "title": "Draft the outline", "priority": "high" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["slug"], "draft-the-outline");
    assert_eq!(json["data"]["last_modified_by"], b.member.id.as_str());

    let (_, json) = app
        .get_json(&format!("{}?priority=high", b.tasks()), &b.owner.access_token)
        .await;
    assert_eq!(json["data"]["total"], 1);

    // Non-owners list only tasks they created or are assigned to.
    let (_, json) = app.get_json(&b.tasks(), &b.member.access_token).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["id"], own.as_str());
}

#[tokio::test]
async fn task_mutations_require_project_membership() {
    let app = spawn_or_skip!();
    let b = board(&app).await;
    let outside_admin = app.seed_user("outsideadmin").await;
    app.join(&b.ws, &b.owner, &outside_admin, "admin").await;

    let resp = app
        .auth_patch(&b.task(&b.task), &outside_admin.access_token)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post(&format!("{}/status", b.task(&b.task)), &outside_admin.access_token)
        .json(&json!({ "status": "done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .assign(&b.ws, &b.project, &b.task, &outside_admin, &b.member)
        .await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.assign(&b.ws, &b.project, &b.task, &b.admin, &b.member).await;
    assert_eq!(resp.status().as_u16(), 200);
    let resp = app
        .auth_delete(
            &format!("{}/assign/{}", b.task(&b.task), b.member.id),
            &outside_admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&b.task(&b.task), &outside_admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let (_, json) = app.get_json(&b.task(&b.task), &b.admin.access_token).await;
    assert_eq!(json["data"]["title"], "Write copy");
    assert_eq!(json["data"]["assignees"][0], b.member.id.as_str());
}

#[tokio::test]
async fn removed_member_loses_their_own_tasks() {
    let app = spawn_or_skip!();
    let b = board(&app).await;
    let own = app.create_task(&b.ws, &b.project, &b.member, "Draft outline").await;

    let resp = app
        .auth_delete(
            &format!(
                "/api/workspace/{}/project/{}/member/{}",
                b.ws, b.project, b.member.id
            ),
            &b.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_patch(&b.task(&own), &b.member.access_token)
        .json(&json!({ "title": "Draft the outline" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&b.task(&own), &b.member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
