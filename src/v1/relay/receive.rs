#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{OpenApi, payload::Json, Object, ApiResponse};
use anyhow::Result;
use serde_json::Value;

use crate::utils::errors::{Errors, HttpResult};
use crate::utils::relay_utils::{get_source_ip, get_user_agent};
use log::{error, info, warn};

use crate::RUNTIME_CTX;

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct ReceiveCallbackApi;

#[derive(Object, Debug)]
pub struct RespReceive {
    status: String,
    message: String,
    received_at: String,
    total_entries: u64,
}

// ------------------- HTTP Status Codes -------------------
#[derive(Debug, ApiResponse)]
enum RelayResponse {
    #[oai(status = 200)]
    Http200(Json<RespReceive>),
    #[oai(status = 400)]
    Http400(Json<HttpResult>),
    #[oai(status = 500)]
    Http500(Json<HttpResult>),
}

fn make_http_200(resp: RespReceive) -> RelayResponse {
    RelayResponse::Http200(Json(resp))
}
fn make_http_400(msg: String) -> RelayResponse {
    RelayResponse::Http400(Json(HttpResult::error(msg)))
}
fn make_http_500(msg: String) -> RelayResponse {
    RelayResponse::Http500(Json(HttpResult::error(msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ReceiveCallbackApi {
    /** Inbound webhook callback.  The body may be any JSON value; it is
     * stored verbatim.  The payload is read raw and parsed here so that a
     * missing or unparseable body yields the documented 400 error shape
     * instead of the framework default.
     */
    #[oai(path = "/receive-from-n8n", method = "post")]
    async fn receive(&self, http_req: &Request, body: poem::Body) -> RelayResponse {
        // -------------------- Parse Payload ------------------------
        let bytes = match body.into_vec().await {
            Ok(b) => b,
            Err(_) => return make_http_400(Errors::MalformedCallback.to_string()),
        };
        let payload: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => {
                warn!("Rejected callback with unparseable body from {}", get_source_ip(http_req));
                return make_http_400(Errors::MalformedCallback.to_string());
            }
        };

        // -------------------- Process Request ----------------------
        match RespReceive::process(http_req, payload) {
            Ok(r) => r,
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(msg)
            }
        }
    }
}

// ***************************************************************************
//                          Request/Response Methods
// ***************************************************************************
impl RespReceive {
    /// Process the request.
    fn process(http_req: &Request, payload: Value) -> Result<RelayResponse, anyhow::Error> {
        let source_ip = get_source_ip(http_req);
        let user_agent = get_user_agent(http_req);

        let ack = RUNTIME_CTX.store.receive(payload, source_ip.clone(), user_agent);
        info!("Stored callback from {} ({} entries buffered).", source_ip, ack.total_entries);

        Ok(make_http_200(RespReceive {
            status: "success".to_string(),
            message: "Data received successfully".to_string(),
            received_at: ack.received_at,
            total_entries: ack.total_entries as u64,
        }))
    }
}
