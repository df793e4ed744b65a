/// Byte-level transport to the store
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use dstore_core::ClientConfig;
use dstore_proto::Method;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status};
use tracing::debug;

pub const DATASET_HEADER: &str = "x-dstore-dataset";

/// Unary request/response exchange of already-encoded messages.
///
/// Implementations only move bytes; encoding, decoding and retries live in
/// [`crate::Connection`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: Method, request: Bytes) -> Result<Bytes>;
}

/// gRPC transport over a tonic channel
#[derive(Clone)]
pub struct GrpcTransport {
    grpc: tonic::client::Grpc<Channel>,
    dataset: MetadataValue<Ascii>,
    authorization: Option<MetadataValue<Ascii>>,
}

impl GrpcTransport {
    /// Connect to `config.host`, honouring the configured timeouts.
    ///
    /// # Example
    /// ```no_run
    /// # use dstore_client::GrpcTransport;
    /// # use dstore_core::ClientConfig;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new("my-dataset").with_host("http://localhost:8081");
    /// let transport = GrpcTransport::connect(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = Self::endpoint(config)?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::ConnectionError(format!("Failed to connect to {}: {}", config.host, e)))?;
        Self::from_channel(channel, config)
    }

    /// Like [`GrpcTransport::connect`], but the connection is established on first use.
    pub fn connect_lazy(config: &ClientConfig) -> Result<Self> {
        let channel = Self::endpoint(config)?.connect_lazy();
        Self::from_channel(channel, config)
    }

    /// Wrap an existing channel.
    pub fn from_channel(channel: Channel, config: &ClientConfig) -> Result<Self> {
        let dataset = MetadataValue::try_from(config.dataset.as_str())
            .map_err(|e| ClientError::ConnectionError(format!("Invalid dataset header: {}", e)))?;

        let authorization = match &config.access_token {
            Some(token) => Some(
                MetadataValue::try_from(format!("Bearer {}", token))
                    .map_err(|e| ClientError::ConnectionError(format!("Invalid access token: {}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            grpc: tonic::client::Grpc::new(channel),
            dataset,
            authorization,
        })
    }

    fn endpoint(config: &ClientConfig) -> Result<Endpoint> {
        config.validate()?;

        let mut endpoint = Endpoint::from_shared(config.host.clone())
            .map_err(|e| ClientError::ConnectionError(format!("Invalid address: {}", e)))?
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        if config.host.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new())?;
        }
        if let Some(name) = &config.application_name {
            endpoint = endpoint.user_agent(name.clone())?;
        }
        Ok(endpoint)
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn call(&self, method: Method, request: Bytes) -> Result<Bytes> {
        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| ClientError::ConnectionError(format!("Service was not ready: {}", e)))?;

        let mut request = Request::new(request);
        request.metadata_mut().insert(DATASET_HEADER, self.dataset.clone());
        if let Some(authorization) = &self.authorization {
            request.metadata_mut().insert("authorization", authorization.clone());
        }

        debug!(method = %method, "Sending request");
        let response = grpc
            .unary(request, PathAndQuery::from_static(method.path()), RawCodec)
            .await?;
        Ok(response.into_inner())
    }
}

/// Pass-through codec: messages are encoded by the caller.
#[derive(Debug, Clone, Copy, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> std::result::Result<(), Self::Error> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> std::result::Result<Option<Self::Item>, Self::Error> {
        let len = src.remaining();
        Ok(Some(src.copy_to_bytes(len)))
    }
}
