//! Wire protocol: protobuf messages, model conversions and header names.

pub mod convert;
pub mod messages;

use prost::Message;

use crate::error::OtsError;

pub const API_VERSION: &str = "2015-12-31";
pub const CONTENT_TYPE_PROTOBUF: &str = "application/x.pb2";

/// Header names shared by requests and responses.
pub mod headers {
    pub const PREFIX: &str = "x-ots-";

    pub const API_VERSION: &str = "x-ots-apiversion";
    pub const ACCESS_KEY_ID: &str = "x-ots-accesskeyid";
    pub const SECURITY_TOKEN: &str = "x-ots-ststoken";
    pub const INSTANCE_NAME: &str = "x-ots-instancename";
    pub const DATE: &str = "x-ots-date";
    pub const CONTENT_DIGEST: &str = "x-ots-contentdigest";
    pub const REQUEST_COMPRESS_TYPE: &str = "x-ots-request-compress-type";
    pub const REQUEST_COMPRESS_SIZE: &str = "x-ots-request-compress-size";
    pub const TRACE_ID: &str = "x-ots-traceid";
    pub const SIGNATURE: &str = "x-ots-signature";

    pub const CONTENT_TYPE: &str = "x-ots-contenttype";
    pub const REQUEST_ID: &str = "x-ots-requestid";
    pub const RESPONSE_COMPRESS_TYPE: &str = "x-ots-response-compress-type";
    pub const RESPONSE_COMPRESS_SIZE: &str = "x-ots-response-compress-size";
    pub const AUTHORIZATION: &str = "authorization";
    pub const LOCATION: &str = "location";
}

/// Operation names, used only for policy lookups and request paths.
pub mod action {
    pub const LIST_TABLE: &str = "ListTable";
    pub const DESCRIBE_TABLE: &str = "DescribeTable";
    pub const GET_ROW: &str = "GetRow";
    pub const PUT_ROW: &str = "PutRow";
    pub const UPDATE_ROW: &str = "UpdateRow";
    pub const DELETE_ROW: &str = "DeleteRow";
    pub const BATCH_GET_ROW: &str = "BatchGetRow";
    pub const BATCH_WRITE_ROW: &str = "BatchWriteRow";
    pub const GET_RANGE: &str = "GetRange";
}

/// Decode a validated body into the typed message.
pub fn decode<M: Message + Default>(body: &[u8]) -> Result<M, OtsError> {
    M::decode(body).map_err(OtsError::from)
}

pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_body_is_a_decode_error() {
        let msg = messages::ListTableResponse {
            table_names: vec!["alpha".into(), "beta".into()],
        };
        let mut body = encode(&msg);
        body.truncate(body.len() - 2);
        let err = decode::<messages::ListTableResponse>(&body).unwrap_err();
        assert!(matches!(err, OtsError::Decode(_)));
    }
}
