#![forbid(unsafe_code)]

use lazy_static::lazy_static;
use log::info;
use poem::{listener::TcpListener, Route};
use poem_openapi::OpenApiService;

// Relay Utilities
use crate::v1::relay::api_data::ApiDataApi;
use crate::v1::relay::clear_data::ClearDataApi;
use crate::v1::relay::index::IndexApi;
use crate::v1::relay::receive::ReceiveCallbackApi;
use crate::v1::relay::version::VersionApi;
use crate::v1::relay::view_data::ViewDataApi;
use crate::utils::config::{init_log, init_runtime_context, RuntimeCtx};
use crate::utils::errors::Errors;

// Modules
mod utils;
mod v1;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const SERVER_NAME : &str = "RelayServer"; // for poem logging

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the runtime context so that it has a 'static lifetime.
// Reading it forces configuration processing, the construction of the shared
// outbound HTTP client and the creation of the empty callback store.  We
// exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // --------------- Initialize Relay ---------------
    // Announce ourselves.
    println!("Starting relay_server!");

    // Initialize the server.
    relay_init();

    // Data directories were just created; nothing else to do.
    if RUNTIME_CTX.relay_args.create_dirs_only {
        println!("Data directories created under {}.", RUNTIME_CTX.relay_dirs.root_dir);
        return Ok(());
    }

    // --------------- Main Loop Set Up ---------------
    // Assign base URL.
    let relay_url = format!("http://{}:{}",
        RUNTIME_CTX.parms.config.http_addr,
        RUNTIME_CTX.parms.config.http_port);

    // Collect all endpoint structs into a single service.
    let endpoints = (IndexApi, ReceiveCallbackApi, ViewDataApi, ApiDataApi,
                     ClearDataApi, VersionApi);
    let api_service =
        OpenApiService::new(endpoints, "Relay Server", "0.1.0").server(relay_url);

    // Allow the generated openapi specs to be retrieved from the server.
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();

    // Create the routes and run the server.
    let addr = format!("{}:{}",
        RUNTIME_CTX.parms.config.http_addr,
        RUNTIME_CTX.parms.config.http_port);
    let ui = api_service.swagger_ui();
    let app = Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml);

    // ------------------ Main Loop -------------------
    poem::Server::new(TcpListener::bind(addr))
        .name(SERVER_NAME)
        .run(app)
        .await
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// relay_init:
// ---------------------------------------------------------------------------
/** Initialize all subsystems and data structures other than those needed
 * to configure the main loop processor.
 */
fn relay_init() {
    // Configure our log.
    init_log();

    // Force the reading of input parameters and initialization of the
    // runtime context, which builds the shared outbound HTTP client and
    // the callback store used by all request handlers.
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    print_version_info();
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("{}.", format!("\n*** Running {}={}, RELAYING_TO={}",
                        SERVER_NAME,
                        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
                        RUNTIME_CTX.parms.config.webhook_url),
    );
}
