// packages/engine/src/lnd/macaroon.rs
//! LND macaroon credentials

use crate::utils::errors::{EngineError, Result};
use std::path::Path;
use tonic::metadata::AsciiMetadataValue;
use tonic::Status;

/// Raw macaroon bytes
#[derive(Clone)]
pub struct Macaroon(Vec<u8>);

impl Macaroon {
    /// Read a binary macaroon file (e.g. `admin.macaroon`)
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl std::str::FromStr for Macaroon {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Macaroon(hex::decode(s.trim())?))
    }
}

impl AsRef<[u8]> for Macaroon {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for Macaroon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Macaroon(..)")
    }
}

/// A gRPC interceptor that injects the LND macaroon into every request header.
#[derive(Clone)]
pub struct MacaroonInterceptor {
    header: AsciiMetadataValue,
}

impl MacaroonInterceptor {
    pub fn new(macaroon: &Macaroon) -> Result<Self> {
        let header = AsciiMetadataValue::try_from(macaroon.to_hex().as_str())
            .map_err(|e| EngineError::Config(format!("invalid macaroon header: {}", e)))?;
        Ok(Self { header })
    }
}

impl tonic::service::Interceptor for MacaroonInterceptor {
    fn call(&mut self, mut request: tonic::Request<()>) -> std::result::Result<tonic::Request<()>, Status> {
        request.metadata_mut().insert("macaroon", self.header.clone());
        Ok(request)
    }
}
