#![forbid(unsafe_code)]

use poem_openapi::{OpenApi, ApiResponse};

use log::info;

use crate::utils::notice::{self, Notice};

use crate::RUNTIME_CTX;

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct ClearDataApi;

// ------------------- HTTP Status Codes -------------------
#[derive(ApiResponse)]
enum ClearDataResponse {
    /// Back to the data page with a confirmation notice.
    #[oai(status = 302)]
    Redirect(
        #[oai(header = "Location")] String,
        #[oai(header = "Set-Cookie")] String,
    ),
}

fn make_redirect(n: &Notice) -> ClearDataResponse {
    let secret = &RUNTIME_CTX.parms.config.secret_key;
    ClearDataResponse::Redirect(
        "/view-data".to_string(),
        notice::set_cookie_header(n, secret),
    )
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ClearDataApi {
    /** Empty the callback buffer unconditionally.  Only local memory is
     * mutated, so the operation itself cannot fail; the notice reports how
     * many entries were removed.
     */
    #[oai(path = "/clear-data", method = "post")]
    async fn clear_data(&self) -> ClearDataResponse {
        let removed = RUNTIME_CTX.store.clear();
        info!("Cleared {} buffered callback entries.", removed);
        make_redirect(&Notice::success(format!(
            "Cleared {} stored callback entries.",
            removed
        )))
    }
}
