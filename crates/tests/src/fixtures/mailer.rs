use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use hive_services::{Mailer, OutboundEmail};

/// Captures outbound mail so tests can read tokens back. Can be switched
/// into a failing transport to exercise compensation paths.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|mail| mail.to.eq_ignore_ascii_case(to))
            .cloned()
            .collect()
    }

    /// Value following `label` in the newest mail to `to` that carries one.
    pub fn token_for(&self, to: &str, label: &str) -> Option<String> {
        self.sent_to(to).iter().rev().find_map(|mail| {
            mail.body
                .lines()
                .find_map(|line| line.trim().strip_prefix(label))
                .map(|token| token.trim().to_string())
        })
    }

    pub fn verification_token(&self, to: &str) -> Option<String> {
        self.token_for(to, "Verification token:")
    }

    pub fn invite_token(&self, to: &str) -> Option<String> {
        self.token_for(to, "Invite token:")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("mail transport unavailable");
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
