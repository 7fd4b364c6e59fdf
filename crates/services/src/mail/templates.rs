use hive_db::models::InviteRole;

use super::OutboundEmail;

pub fn workspace_invite(
    to: &str,
    frontend_url: &str,
    workspace_id: &str,
    workspace_name: &str,
    inviter: &str,
    role: InviteRole,
    token: &str,
    ttl_hours: u64,
) -> OutboundEmail {
    let role = match role {
        InviteRole::Admin => "an admin",
        InviteRole::Member => "a member",
    };
    let link = format!(
        "{}/workspace/{}/invite/accept?token={}",
        frontend_url.trim_end_matches('/'),
        workspace_id,
        token
    );
    OutboundEmail {
        to: to.to_string(),
        subject: format!("You're invited to join {} on Hive", workspace_name),
        body: format!(
            "{inviter} invited you to join \"{workspace_name}\" as {role}.\n\n\
             Accept the invitation: {link}\n\n\
             Invite token: {token}\n\n\
             This invitation expires in {ttl_hours} hours. If you weren't expecting it, ignore this email."
        ),
    }
}

pub fn email_verification(
    to: &str,
    frontend_url: &str,
    user_id: &str,
    full_name: &str,
    token: &str,
) -> OutboundEmail {
    let link = format!(
        "{}/verify-email?user={}&token={}",
        frontend_url.trim_end_matches('/'),
        user_id,
        token
    );
    OutboundEmail {
        to: to.to_string(),
        subject: "Verify your Hive email address".to_string(),
        body: format!(
            "Hi {full_name},\n\nConfirm your email address: {link}\n\n\
             Verification token: {token}\n\nThe link expires in 24 hours."
        ),
    }
}
