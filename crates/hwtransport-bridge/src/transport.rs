//! HTTP bridge backend
//!
//! Talks to a local bridge daemon that owns the USB devices. The daemon keeps
//! session bookkeeping itself, so exclusivity errors come back as HTTP error
//! replies and are mapped onto the core contract here.

use std::time::Duration;

use async_trait::async_trait;
use hwtransport_core::{
    AcquireError, Backend, BackendFactory, BackendKind, CallError, ConfigError, DeviceDescriptor,
    InitError, Message, ReleaseError, Session, TransportError,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{AcquireReply, BridgeInfo, ErrorBody, WireMessage};

// ----------------------------------------------------------------------------
// Bridge Factory
// ----------------------------------------------------------------------------

/// Probes the bridge daemon and creates a [`BridgeBackend`]
#[derive(Debug, Clone, Default)]
pub struct BridgeFactory {
    config: BridgeConfig,
}

impl BridgeFactory {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

#[async_trait]
impl BackendFactory for BridgeFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Bridge
    }

    async fn create(&self) -> Result<Box<dyn Backend>, InitError> {
        let backend = BridgeBackend::connect(self.config.clone())
            .await
            .map_err(BridgeError::into_init_error)?;
        Ok(Box::new(backend))
    }
}

// ----------------------------------------------------------------------------
// Bridge Backend
// ----------------------------------------------------------------------------

/// Request body variants the bridge accepts
enum Body {
    Empty,
    Text(String),
    Json(Value),
}

/// Backend speaking to a running bridge daemon
#[derive(Debug)]
pub struct BridgeBackend {
    client: Client,
    base: Url,
    config: BridgeConfig,
    name: String,
    info: BridgeInfo,
}

impl BridgeBackend {
    /// Probe the daemon at `config.url`
    pub async fn connect(config: BridgeConfig) -> Result<Self, BridgeError> {
        let base = Url::parse(&config.url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| BridgeError::InvalidUrl {
                url: config.url.clone(),
            })?;
        let client = Client::builder().build()?;

        let mut backend = Self {
            client,
            base,
            name: String::new(),
            info: BridgeInfo {
                version: String::new(),
                configured: false,
            },
            config,
        };

        debug!("Probing bridge at {}", backend.base);
        let info: BridgeInfo = backend
            .request(Method::GET, &[], Body::Empty, Some(backend.config.probe_timeout()))
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::Decode(e.to_string()))?;

        info!("Bridge {} found at {}", info.version, backend.base);
        backend.name = format!("bridge {}", info.version);
        backend.info = info;
        Ok(backend)
    }

    /// Daemon details reported by the probe
    pub fn info(&self) -> &BridgeInfo {
        &self.info
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Body,
        timeout: Option<Duration>,
    ) -> Result<Response, BridgeError> {
        let mut builder: RequestBuilder = self.client.request(method, self.endpoint(segments));
        builder = match body {
            Body::Empty => builder,
            Body::Text(text) => builder.body(text),
            Body::Json(value) => builder.json(&value),
        };
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BridgeError::Timeout {
                    duration_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
                }
            } else {
                BridgeError::Http(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(error) => error.error,
            Err(_) if text.is_empty() => status.to_string(),
            Err(_) => text,
        };
        Err(BridgeError::Remote {
            status: status.as_u16(),
            message,
            body,
        })
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Body,
        timeout: Option<Duration>,
    ) -> Result<T, BridgeError> {
        let response = self.request(method, segments, body, timeout).await?;
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                BridgeError::Timeout {
                    duration_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
                }
            } else {
                BridgeError::Decode(e.to_string())
            }
        })
    }

    async fn devices(&self) -> Result<Vec<DeviceDescriptor>, BridgeError> {
        self.request_json(
            Method::GET,
            &["enumerate"],
            Body::Empty,
            Some(self.config.op_timeout()),
        )
        .await
    }

    /// Long-poll until the device list differs from `known`
    async fn listen(&self, known: &[DeviceDescriptor]) -> Result<Vec<DeviceDescriptor>, BridgeError> {
        let body = serde_json::to_value(known).map_err(|e| BridgeError::Decode(e.to_string()))?;
        self.request_json(
            Method::POST,
            &["listen"],
            Body::Json(body),
            Some(self.config.listen_timeout()),
        )
        .await
    }
}

#[async_trait]
impl Backend for BridgeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bridge
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn configure(&self, config: &[u8]) -> Result<(), ConfigError> {
        self.request(
            Method::POST,
            &["configure"],
            Body::Text(hex::encode(config)),
            Some(self.config.op_timeout()),
        )
        .await
            .map_err(BridgeError::into_config_error)?;
        Ok(())
    }

    async fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let devices = self.devices().await.map_err(BridgeError::into_transport_error)?;
        if !wait || !devices.is_empty() {
            return Ok(devices);
        }

        debug!("No devices connected, waiting on bridge");
        match self.listen(&devices).await {
            Ok(changed) => Ok(changed),
            Err(BridgeError::Timeout { .. }) => {
                self.devices().await.map_err(BridgeError::into_transport_error)
            }
            Err(e) => Err(e.into_transport_error()),
        }
    }

    async fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        let reply: AcquireReply = self
            .request_json(
                Method::POST,
                &["acquire", path],
                Body::Empty,
                Some(self.config.op_timeout()),
            )
            .await
            .map_err(|e| e.into_acquire_error(path))?;
        Ok(reply.session)
    }

    async fn release(&self, session: &Session) -> Result<(), ReleaseError> {
        match self
            .request(
                Method::POST,
                &["release", session.as_str()],
                Body::Empty,
                Some(self.config.op_timeout()),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Bridge refused to release session {}: {}", session, e);
                Err(e.into_release_error(session))
            }
        }
    }

    async fn call(&self, session: &Session, message: Message) -> Result<Message, CallError> {
        let body = serde_json::to_value(WireMessage::from(message))
            .map_err(|e| CallError::Transport(TransportError::Protocol { reason: e.to_string() }))?;
        let reply: WireMessage = self
            .request_json(
                Method::POST,
                &["call", session.as_str()],
                Body::Json(body),
                Some(self.config.call_timeout()),
            )
            .await
            .map_err(|e| e.into_call_error(session))?;
        Ok(reply.into())
    }
}
