use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::JiraResult;
use crate::types::User;

pub struct UsersApi<'a> {
    client: &'a JiraClient,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// The authenticated user; doubles as a credential check.
    pub async fn myself(&self) -> JiraResult<User> {
        self.client
            .http
            .get(&format!("{}/myself", API_PREFIX))
            .await
    }
}
