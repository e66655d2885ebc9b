//! Build the signed wire request for one attempt.

use chrono::Utc;

use crate::auth;
use crate::checksum;
use crate::error::OtsError;
use crate::ops::Operation;
use crate::protocol::{self, headers, CONTENT_TYPE_PROTOBUF};
use crate::transport::{Transport, WireRequest};

use super::ClientInner;

pub(crate) const METHOD: &str = "POST";

pub(crate) fn request_date() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Encode, optionally compress, digest and sign `request`.
pub(crate) fn build<Op: Operation, T: Transport>(
    inner: &ClientInner<T>,
    request: &Op::Request,
    trace_id: &str,
) -> Result<WireRequest, OtsError> {
    let raw = Op::encode(request);
    let mut signed: Vec<(String, String)> = vec![
        (headers::API_VERSION.into(), protocol::API_VERSION.into()),
        (headers::ACCESS_KEY_ID.into(), inner.credentials.access_key_id.clone()),
        (headers::INSTANCE_NAME.into(), inner.instance_name.clone()),
        (headers::DATE.into(), request_date()),
        (headers::TRACE_ID.into(), trace_id.to_string()),
    ];
    if let Some(token) = &inner.credentials.security_token {
        signed.push((headers::SECURITY_TOKEN.into(), token.clone()));
    }
    let body = match inner.compression {
        Some(compression) => {
            signed.push((headers::REQUEST_COMPRESS_TYPE.into(), compression.as_str().into()));
            signed.push((headers::REQUEST_COMPRESS_SIZE.into(), raw.len().to_string()));
            compression.compress(&raw)?
        }
        None => raw,
    };
    signed.push((headers::CONTENT_DIGEST.into(), checksum::content_digest(&body)));

    let signature = auth::sign_request(
        &inner.credentials.access_key_secret,
        Op::ACTION,
        METHOD,
        &[],
        signed.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    signed.push((headers::SIGNATURE.into(), signature));
    signed.push(("content-type".into(), CONTENT_TYPE_PROTOBUF.into()));

    let url = inner
        .endpoint
        .join(Op::ACTION)
        .map_err(|e| OtsError::protocol(format!("request url for {}: {}", Op::ACTION, e)))?;

    Ok(WireRequest {
        url: url.into(),
        action: Op::ACTION,
        method: METHOD,
        headers: signed,
        body,
    })
}
