use serde_json::{Value, json};

use super::test_app::TestApp;

pub const PASSWORD: &str = "Password123!";

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub access_token: String,
}

impl TestApp {
    /// Register, verify through the mailed token and log in.
    pub async fn seed_user(&self, username: &str) -> SeededUser {
        let email = format!("{}@hive.test", username);
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "full_name": format!("{} Test", username),
                "email": email,
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("Register request failed");
        assert_eq!(
            resp.status().as_u16(),
            201,
            "Register failed: {}",
            resp.text().await.unwrap_or_default()
        );
        let json: Value = resp.json().await.unwrap();
        let id = json["data"]["id"].as_str().unwrap().to_string();

        let token = self
            .mailer
            .verification_token(&email)
            .expect("No verification mail recorded");
        let resp = self
            .client
            .post(self.url("/api/auth/verify-email"))
            .json(&json!({ "user_id": id, "token": token }))
            .send()
            .await
            .expect("Verify request failed");
        assert_eq!(resp.status().as_u16(), 200, "Verify failed");

        let user = self.login_user(&email).await;
        assert_eq!(user.id, id);
        user
    }

    pub async fn login_user(&self, email: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Login request failed");
        assert!(
            resp.status().is_success(),
            "Login failed: {}",
            resp.text().await.unwrap_or_default()
        );
        let json: Value = resp.json().await.unwrap();
        let data = &json["data"];
        SeededUser {
            id: data["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            username: data["user"]["username"].as_str().unwrap().to_string(),
            access_token: data["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_patch(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub async fn create_workspace(&self, owner: &SeededUser, name: &str) -> String {
        let resp = self
            .auth_post("/api/workspace", &owner.access_token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201, "Create workspace failed");
        let json: Value = resp.json().await.unwrap();
        json["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn send_invite(
        &self,
        workspace_id: &str,
        owner: &SeededUser,
        email: &str,
        role: &str,
    ) -> reqwest::Response {
        self.auth_post(
            &format!("/api/workspace/{}/invite", workspace_id),
            &owner.access_token,
        )
        .json(&json!({ "email": email, "role": role }))
        .send()
        .await
        .unwrap()
    }

    pub async fn accept_invite(
        &self,
        workspace_id: &str,
        user: &SeededUser,
        token: &str,
    ) -> reqwest::Response {
        self.auth_post(
            &format!("/api/workspace/{}/invite/accept", workspace_id),
            &user.access_token,
        )
        .json(&json!({ "token": token }))
        .send()
        .await
        .unwrap()
    }

    /// Invite `user` with `role` and accept on their behalf.
    pub async fn join(&self, workspace_id: &str, owner: &SeededUser, user: &SeededUser, role: &str) {
        let resp = self.send_invite(workspace_id, owner, &user.email, role).await;
        assert_eq!(resp.status().as_u16(), 201, "Invite failed");
        let token = self.mailer.invite_token(&user.email).expect("No invite mail");
        let resp = self.accept_invite(workspace_id, user, &token).await;
        assert_eq!(resp.status().as_u16(), 200, "Accept failed");
    }

    pub async fn create_project(&self, workspace_id: &str, actor: &SeededUser, name: &str) -> String {
        let resp = self
            .auth_post(
                &format!("/api/workspace/{}/project", workspace_id),
                &actor.access_token,
            )
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201, "Create project failed");
        let json: Value = resp.json().await.unwrap();
        json["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn add_project_member(
        &self,
        workspace_id: &str,
        project_id: &str,
        actor: &SeededUser,
        user: &SeededUser,
    ) {
        let resp = self
            .auth_post(
                &format!("/api/workspace/{}/project/{}/member", workspace_id, project_id),
                &actor.access_token,
            )
            .json(&json!({ "user_id": user.id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "Add project member failed");
    }

    pub async fn create_task(
        &self,
        workspace_id: &str,
        project_id: &str,
        actor: &SeededUser,
        title: &str,
    ) -> String {
        let resp = self
            .auth_post(
                &format!("/api/workspace/{}/project/{}/task", workspace_id, project_id),
                &actor.access_token,
            )
            .json(&json!({
                "title": title,
                "estimated_time": 60,
                "due_date": "2030-01-01T00:00:00Z",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201, "Create task failed");
        let json: Value = resp.json().await.unwrap();
        json["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn assign(
        &self,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
        actor: &SeededUser,
        assignee: &SeededUser,
    ) -> reqwest::Response {
        self.auth_post(
            &format!(
                "/api/workspace/{}/project/{}/task/{}/assign",
                workspace_id, project_id, task_id
            ),
            &actor.access_token,
        )
        .json(&json!({ "user_id": assignee.id }))
        .send()
        .await
        .unwrap()
    }

    pub async fn get_json(&self, path: &str, token: &str) -> (u16, Value) {
        let resp = self.auth_get(path, token).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}
