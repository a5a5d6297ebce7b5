use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use slugkeeper_common::{NotificationEvent, WebhookFormat, WebhookTarget};
use std::time::Duration;

/// Destination for reconciliation events. Delivery is fire-and-forget: the return
/// value reports success, failures never propagate.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> bool;
}

/// Request body, chosen by the target's declared format.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebhookBody<'a> {
    Event(&'a NotificationEvent),
    Text { text: String },
}

impl<'a> WebhookBody<'a> {
    pub fn for_format(event: &'a NotificationEvent, format: WebhookFormat) -> Self {
        match format {
            WebhookFormat::Json => WebhookBody::Event(event),
            WebhookFormat::Slack => WebhookBody::Text {
                text: event.chat_text(),
            },
        }
    }
}

pub struct WebhookNotifier {
    client: Client,
    target: Option<WebhookTarget>,
}

impl WebhookNotifier {
    pub fn new(target: Option<WebhookTarget>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client, target })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }
}

#[async_trait]
impl EventSink for WebhookNotifier {
    async fn notify(&self, event: &NotificationEvent) -> bool {
        let Some(target) = &self.target else {
            return false;
        };

        let body = WebhookBody::for_format(event, target.format);
        tracing::info!("[Webhook] Sending {} notification to {}", event.as_str(), target.url);

        match self.client.post(&target.url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("[Webhook] Notification sent successfully");
                true
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                tracing::error!(
                    "[Webhook] Error sending notification: status={} body={}",
                    status,
                    text
                );
                false
            }
            Err(e) => {
                match e.status() {
                    Some(status) => tracing::error!(
                        "[Webhook] Error sending notification: status={} error={}",
                        status.as_u16(),
                        e
                    ),
                    None => tracing::error!("[Webhook] Error sending notification: {}", e),
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slugkeeper_common::{DesiredState, Instance};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn desired() -> DesiredState {
        DesiredState::new("gpu-h100x8", "gpu-h100x8-base", vec!["tor1".into()], 2).unwrap()
    }

    fn created_event() -> NotificationEvent {
        NotificationEvent::instance_created(
            &desired(),
            "tor1",
            Instance::new(31, "gpu-h100x8-tor1-1", "tor1", "gpu-h100x8"),
        )
    }

    fn target(url: String, format: WebhookFormat) -> Option<WebhookTarget> {
        WebhookTarget::new(Some(&url), format)
    }

    #[tokio::test]
    async fn disabled_without_endpoint() {
        let notifier = WebhookNotifier::new(None).unwrap();
        assert!(!notifier.is_enabled());
        assert!(!notifier.notify(&created_event()).await);
    }

    #[tokio::test]
    async fn posts_raw_event_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::new(target(format!("{}/hook", server.uri()), WebhookFormat::Json)).unwrap();
        assert!(notifier.notify(&created_event()).await);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["event"], "droplet_created");
        assert_eq!(body["droplet"]["id"], 31);
        assert_eq!(body["configuration"]["region"], "tor1");
    }

    #[tokio::test]
    async fn chat_targets_receive_text_wrapper() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T000/B000/XXX"))
            .and(body_json(json!({
                "text": "Droplet created: gpu-h100x8-tor1-1 (ID: 31) in tor1 using gpu-h100x8."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(target(
            format!("{}/services/T000/B000/XXX", server.uri()),
            WebhookFormat::Slack,
        ))
        .unwrap();
        assert!(notifier.notify(&created_event()).await);
    }

    #[tokio::test]
    async fn non_2xx_reports_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(target(server.uri(), WebhookFormat::Json)).unwrap();
        assert!(!notifier.notify(&created_event()).await);
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_false() {
        let server = MockServer::start().await;
        let url = format!("{}/hook", server.uri());
        drop(server);

        let notifier = WebhookNotifier::new(target(url, WebhookFormat::Json)).unwrap();
        assert!(!notifier.notify(&created_event()).await);
    }
}
