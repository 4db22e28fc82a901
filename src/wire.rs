//! Wire Message Module
//!
//! Protobuf messages exchanged between peers. A response's `expire` field
//! carries nanoseconds since the Unix epoch, with 0 meaning "no expiry".

/// Identifies one cached value: the group namespace and the key inside it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CacheRequest {
    #[prost(string, tag = "1")]
    pub group: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

/// A cached value and its expiry deadline.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CacheResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub expire: i64,
}
