use std::time::Duration;

use mongodb::{Client, ClientSession};
use tracing::warn;

use crate::dao::base::DaoResult;

/// Opens and settles multi-collection transactions.
///
/// Callers run their writes against the session returned by [`begin`] and
/// hand the outcome to [`settle`], which commits on `Ok` and aborts on `Err`.
/// A commit that exceeds `max_commit_time` fails and surfaces as retryable.
///
/// [`begin`]: Transactions::begin
/// [`settle`]: Transactions::settle
#[derive(Clone)]
pub struct Transactions {
    client: Client,
    max_commit_time: Duration,
}

impl Transactions {
    pub fn new(client: Client, max_commit_time: Duration) -> Self {
        Self {
            client,
            max_commit_time,
        }
    }

    pub async fn begin(&self) -> DaoResult<ClientSession> {
        let mut session = self.client.start_session().await?;
        session
            .start_transaction()
            .max_commit_time(self.max_commit_time)
            .await?;
        Ok(session)
    }

    pub async fn settle<T>(&self, mut session: ClientSession, result: DaoResult<T>) -> DaoResult<T> {
        match result {
            Ok(value) => {
                session.commit_transaction().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!(%abort_err, "Failed to abort transaction");
                }
                Err(err)
            }
        }
    }
}
