#![forbid(unsafe_code)]

use poem::Request;
use poem_openapi::{OpenApi, payload::Html, ApiResponse};

use log::error;

use crate::utils::notice;
use crate::utils::templates::render_view_data;

use crate::RUNTIME_CTX;

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
pub struct ViewDataApi;

// ------------------- HTTP Status Codes -------------------
#[derive(ApiResponse)]
enum ViewDataResponse {
    #[oai(status = 200)]
    Page(Html<String>, #[oai(header = "Set-Cookie")] Option<String>),
    #[oai(status = 500)]
    Http500(Html<String>),
}

fn make_page(html: String, clear_notice: bool) -> ViewDataResponse {
    let cookie = if clear_notice { Some(notice::clear_cookie_header()) } else { None };
    ViewDataResponse::Page(Html(html), cookie)
}
fn make_http_500(msg: String) -> ViewDataResponse {
    ViewDataResponse::Http500(Html(format!("<h1>Internal error</h1><p>{}</p>", msg)))
}

// ***************************************************************************
//                             OpenAPI Endpoint
// ***************************************************************************
#[OpenApi]
impl ViewDataApi {
    /** Render the buffered callbacks, newest first, consuming any pending
     * notice (typically the clear-data confirmation).
     */
    #[oai(path = "/view-data", method = "get")]
    async fn get_view_data(&self, http_req: &Request) -> ViewDataResponse {
        let config = &RUNTIME_CTX.parms.config;

        let pending = notice::take_from_request(http_req, &config.secret_key);
        let entries = RUNTIME_CTX.store.list();
        match render_view_data(&config.title, &entries, pending.as_ref()) {
            Ok(html) => make_page(html, pending.is_some()),
            Err(e) => {
                let msg = "ERROR: ".to_owned() + e.to_string().as_str();
                error!("{}", msg);
                make_http_500(msg)
            }
        }
    }
}
