#![forbid(unsafe_code)]

use poem_openapi::{OpenApi, payload::Json, Object};

// From cargo.toml.
const RELAY_VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct VersionApi;

#[derive(Object)]
struct RespVersion {
    result_code: String,
    result_msg: String,
    server_name: String,
    server_version: String,
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl VersionApi {
    #[oai(path = "/version", method = "get")]
    async fn get_version(&self) -> Json<RespVersion> {
        Json(RespVersion {
            result_code: "0".to_string(),
            result_msg: "success".to_string(),
            server_name: crate::SERVER_NAME.to_string(),
            server_version: RELAY_VERSION.unwrap_or("unknown").to_string(),
        })
    }
}
