use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::models::*;
use super::{ConversationApi, GatewayError};
use crate::core::DEFAULT_API_URL;

/// HTTP client for the conversation server.
#[derive(Clone, Debug)]
pub struct Gateway {
    api_base_url: String,
    client: Client,
}

impl Gateway {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GatewayError> {
        let resp = req.send().await?;
        read_envelope(resp).await
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Every response is wrapped as `{"success": bool, ...}` with an
/// `error` string on failure. The server can still answer with an HTML
/// error page, so a non-JSON body on a failed status is reported
/// as a server error rather than a decode error.
async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let status = resp.status();
    let text = resp.text().await?;

    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(GatewayError::Decode(e.to_string())),
        Err(_) => {
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }
    };

    if !status.is_success() || body["success"] == Value::Bool(false) {
        let message = body["error"]
            .as_str()
            .or(status.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[async_trait]
impl ConversationApi for Gateway {
    async fn list_groups(&self) -> Result<Vec<Group>, GatewayError> {
        tracing::debug!("GET /groups");
        let body: GroupsBody = self.send(self.client.get(self.url("/groups"))).await?;
        Ok(body.groups)
    }

    async fn create_group(&self, group: &NewGroup) -> Result<GroupId, GatewayError> {
        tracing::debug!("POST /groups name={}", group.name);
        let body: CreatedGroupBody = self
            .send(self.client.post(self.url("/groups")).json(group))
            .await?;
        Ok(body.group_id)
    }

    async fn delete_group(&self, group_id: GroupId) -> Result<(), GatewayError> {
        tracing::debug!("DELETE /groups/{}", group_id);
        let _: Acknowledged = self
            .send(self.client.delete(self.url(&format!("/groups/{}", group_id))))
            .await?;
        Ok(())
    }

    async fn group_info(&self, group_id: GroupId) -> Result<GroupInfo, GatewayError> {
        tracing::debug!("GET /groups/{}/info", group_id);
        let body: GroupInfoBody = self
            .send(self.client.get(self.url(&format!("/groups/{}/info", group_id))))
            .await?;
        Ok(body.group)
    }

    async fn update_rules(&self, group_id: GroupId, rules: &str) -> Result<(), GatewayError> {
        tracing::debug!("PUT /groups/{}/rules", group_id);
        let _: Acknowledged = self
            .send(
                self.client
                    .put(self.url(&format!("/groups/{}/rules", group_id)))
                    .json(&json!({ "rules": rules })),
            )
            .await?;
        Ok(())
    }

    async fn list_players(&self, group_id: GroupId) -> Result<Vec<Player>, GatewayError> {
        tracing::debug!("GET /groups/{}/players", group_id);
        let body: PlayersBody = self
            .send(self.client.get(self.url(&format!("/groups/{}/players", group_id))))
            .await?;
        Ok(body.players)
    }

    async fn add_player(
        &self,
        group_id: GroupId,
        player: &PlayerPayload,
    ) -> Result<PlayerId, GatewayError> {
        tracing::debug!("POST /groups/{}/players kind={}", group_id, player.kind);
        let body: CreatedPlayerBody = self
            .send(
                self.client
                    .post(self.url(&format!("/groups/{}/players", group_id)))
                    .json(player),
            )
            .await?;
        Ok(body.player_id)
    }

    async fn update_player(
        &self,
        player_id: PlayerId,
        player: &PlayerPayload,
    ) -> Result<(), GatewayError> {
        tracing::debug!("PUT /players/{}", player_id);
        let _: Acknowledged = self
            .send(
                self.client
                    .put(self.url(&format!("/players/{}", player_id)))
                    .json(player),
            )
            .await?;
        Ok(())
    }

    async fn delete_player(&self, player_id: PlayerId) -> Result<(), GatewayError> {
        tracing::debug!("DELETE /players/{}", player_id);
        let _: Acknowledged = self
            .send(self.client.delete(self.url(&format!("/players/{}", player_id))))
            .await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        group_id: GroupId,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, GatewayError> {
        tracing::debug!("GET /groups/{}/messages limit={:?}", group_id, limit);
        let mut req = self
            .client
            .get(self.url(&format!("/groups/{}/messages", group_id)));
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        let body: MessagesBody = self.send(req).await?;
        Ok(body.messages)
    }

    async fn post_message(
        &self,
        group_id: GroupId,
        message: &NewMessage,
    ) -> Result<MessageId, GatewayError> {
        tracing::debug!(
            "POST /groups/{}/messages player_id={}",
            group_id,
            message.player_id
        );
        let body: CreatedMessageBody = self
            .send(
                self.client
                    .post(self.url(&format!("/groups/{}/messages", group_id)))
                    .json(message),
            )
            .await?;
        Ok(body.message_id)
    }

    async fn ai_speak(
        &self,
        group_id: GroupId,
        request: &AiSpeakRequest,
    ) -> Result<AiSpeakReply, GatewayError> {
        tracing::debug!(
            "POST /groups/{}/ai-speak player_id={}",
            group_id,
            request.player_id
        );
        self.send(
            self.client
                .post(self.url(&format!("/groups/{}/ai-speak", group_id)))
                .json(request),
        )
        .await
    }

    async fn status(&self) -> Result<ServerStatus, GatewayError> {
        tracing::debug!("GET /status");
        self.send(self.client.get(self.url("/status"))).await
    }
}
