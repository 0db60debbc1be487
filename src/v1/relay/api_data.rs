#![forbid(unsafe_code)]

use poem_openapi::{OpenApi, payload::Json, Object};
use serde_json::Value;

use crate::utils::callback_store::CallbackEntry;

use crate::RUNTIME_CTX;

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct ApiDataApi;

#[derive(Object, Debug)]
pub struct RespApiData {
    total_count: u64,
    data: Vec<ApiCallbackEntry>,
}

/// Wire form of one buffered callback, newest first in the export.
#[derive(Object, Debug)]
pub struct ApiCallbackEntry {
    data: Value,
    received_at: String,
    source_ip: String,
    user_agent: String,
}

impl From<CallbackEntry> for ApiCallbackEntry {
    fn from(e: CallbackEntry) -> Self {
        Self {
            data: e.data,
            received_at: e.received_at,
            source_ip: e.source_ip,
            user_agent: e.user_agent,
        }
    }
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ApiDataApi {
    /** Machine-readable export of the full buffer.  No pagination; the
     * buffer is capped at 100 entries.
     */
    #[oai(path = "/api/data", method = "get")]
    async fn get_data(&self) -> Json<RespApiData> {
        let entries = RUNTIME_CTX.store.list();
        let resp = RespApiData {
            total_count: entries.len() as u64,
            data: entries.into_iter().map(ApiCallbackEntry::from).collect(),
        };
        Json(resp)
    }
}
