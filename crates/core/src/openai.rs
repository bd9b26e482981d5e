//! Handles the realtime WebSocket connection to OpenAI.
//!
//! The session authenticates with a short-lived client secret minted by the
//! broker, configures itself with the agent's instructions and then leaves the
//! conversation to the provider. Incoming events are only logged.

use crate::{
    agent::RealtimeAgent,
    session::{RealtimeSession, SessionCredential, SessionError, SessionFactory},
};
use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, protocol::Message as WsMessage},
};
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

pub const DEFAULT_REALTIME_ENDPOINT: &str = "wss://api.openai.com/v1/realtime";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Creates [`OpenAIRealtimeSession`]s against a realtime endpoint.
#[derive(Debug, Clone)]
pub struct OpenAISessionFactory {
    endpoint: String,
}

impl OpenAISessionFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for OpenAISessionFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REALTIME_ENDPOINT)
    }
}

impl SessionFactory for OpenAISessionFactory {
    type Session = OpenAIRealtimeSession;

    fn create(&self, agent: &RealtimeAgent, model: &str) -> Result<Self::Session, SessionError> {
        if model.trim().is_empty() {
            return Err(SessionError::InvalidConfig(
                "realtime model must not be empty".to_string(),
            ));
        }
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            SessionError::InvalidConfig(format!("invalid realtime endpoint '{}': {}", self.endpoint, e))
        })?;
        url.query_pairs_mut().append_pair("model", model);

        Ok(OpenAIRealtimeSession {
            url,
            agent: agent.clone(),
            link: Link::Pending,
        })
    }
}

enum Link {
    Pending,
    /// Dropping the sender also stops the event task.
    Open {
        shutdown: oneshot::Sender<()>,
    },
    Closed,
}

/// One realtime conversation with OpenAI.
pub struct OpenAIRealtimeSession {
    url: Url,
    agent: RealtimeAgent,
    link: Link,
}

impl OpenAIRealtimeSession {
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.link, Link::Open { .. })
    }
}

#[async_trait]
impl RealtimeSession for OpenAIRealtimeSession {
    async fn connect(&mut self, credential: &SessionCredential) -> Result<(), SessionError> {
        match self.link {
            Link::Pending => {}
            Link::Open { .. } => return Err(SessionError::AlreadyConnected),
            Link::Closed => return Err(SessionError::Closed),
        }

        let mut request = self.url.as_str().into_client_request().map_err(connect_error)?;
        let bearer = format!("Bearer {}", credential.expose())
            .parse::<HeaderValue>()
            .map_err(|_| {
                SessionError::InvalidConfig("credential is not a valid header value".to_string())
            })?;
        request.headers_mut().insert("Authorization", bearer);

        let (ws_stream, _) = connect_async(request).await.map_err(connect_error)?;
        let (mut sink, stream) = ws_stream.split();
        info!(agent = %self.agent.name, "Connected to OpenAI Realtime API.");

        let update = json!({
            "type": "session.update",
            "session": {
                "type": "realtime",
                "instructions": self.agent.instructions,
            },
        });
        sink.send(WsMessage::Text(update.to_string().into()))
            .await
            .map_err(connect_error)?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let span = info_span!("realtime_session", agent = %self.agent.name);
        tokio::spawn(pump_events(sink, stream, shutdown_rx).instrument(span));
        self.link = Link::Open { shutdown };
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Pending | Link::Closed => Ok(()),
            // The receiver is gone once the provider has ended the connection.
            Link::Open { shutdown } => shutdown.send(()).map_err(|_| SessionError::Closed),
        }
    }
}

fn connect_error(err: impl std::fmt::Display) -> SessionError {
    SessionError::Connect(err.to_string())
}

#[derive(Debug, Deserialize)]
struct ProviderEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Logs provider events until either side closes the connection.
async fn pump_events(
    mut sink: SplitSink<WsStream, WsMessage>,
    mut stream: SplitStream<WsStream>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = sink.send(WsMessage::Close(None)).await {
                    debug!(error = %e, "Close frame not delivered.");
                }
                info!("Realtime session closed by client.");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => log_event(&text),
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "Realtime session closed by provider.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Realtime connection failed.");
                    break;
                }
                None => break,
            },
        }
    }
}

fn log_event(text: &str) {
    match serde_json::from_str::<ProviderEvent>(text) {
        Ok(ProviderEvent {
            kind,
            error: Some(err),
        }) if kind == "error" => {
            warn!(message = err.message.as_deref().unwrap_or_default(), "Provider reported an error.");
        }
        Ok(event) => debug!(event_type = %event.kind, "Provider event"),
        Err(e) => debug!(error = %e, "Ignoring unrecognized provider message."),
    }
}
