#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path, time::Duration};
use toml;
use fs_mistrust::Mistrust;
use std::os::unix::fs::PermissionsExt;
use lazy_static::lazy_static;
use structopt::StructOpt;

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;

// Relay Utilities
use crate::utils::{relay_utils, errors::Errors};
use crate::utils::callback_store::CallbackStore;

use super::relay_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and
// directories are relative to the root directory.
const ENV_RELAY_ROOT_DIR   : &str = "RELAY_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.relay_server";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";   // relative to config dir
const RELAY_CONFIG_FILE    : &str = "/relay.toml";   // relative to config dir

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "0.0.0.0";
const DEFAULT_HTTP_PORT    : u16  = 5000;

// Environment overrides for the deployment-specific settings.
const ENV_WEBHOOK_URL      : &str = "N8N_WEBHOOK_URL";
const ENV_SECRET_KEY       : &str = "RELAY_SECRET_KEY";

// Fallback defaults matching the original deployment.  The URL points at the
// externally-reachable webhook endpoint; override both in any real install.
const DEFAULT_WEBHOOK_URL  : &str =
    "https://stayed-talked-austin-sofa.trycloudflare.com/webhook-test/from-flask";
const DEFAULT_SECRET_KEY   : &str = "159753AA";

// Outbound call budget.
pub const WEBHOOK_TIMEOUT_SECS : u64 = 30;

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref RELAY_ARGS: RelayArgs = init_relay_args();
}

// Calculate the data directories BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref RELAY_DIRS: RelayDirs = init_relay_dirs();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// RelayDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct RelayDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// CommandLineArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "relay_args", about = "Command line arguments for the relay server.")]
pub struct RelayArgs {
    /// Specify the relay's root data directory.
    ///
    /// This directory contains the configuration and log files the server
    /// uses during execution.
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the RELAY_ROOT_DIR environment variable,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.relay_server
    ///
    #[structopt(short, long)]
    pub create_dirs_only: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
#[allow(dead_code)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
/** Everything shared across request handlers: the effective configuration,
 * the outbound HTTP client (built once, carries the webhook timeout), and
 * the callback store.
 */
#[derive(Debug)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub client: reqwest::Client,
    pub store: CallbackStore,
    pub relay_args: &'static RelayArgs,
    pub relay_dirs: &'static RelayDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub webhook_url: String,
    pub secret_key: String,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Relay Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_relay_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_relay_args() -> RelayArgs {
    let args = RelayArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_relay_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories. */
fn init_relay_dirs() -> RelayDirs {
    // Initialize the mistrust object.
    let mistrust = get_mistrust();

    // Check that each path is absolute and is a directory with the
    // proper permission assigned if it exists.  If it doesn't exist,
    // create it.
    let root_dir = get_root_dir();
    check_relay_dir(&root_dir, "root directory", &mistrust);

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_relay_dir(&config_dir, "config directory", &mistrust);

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_relay_dir(&logs_dir, "logs directory", &mistrust);

    // Package up and return the directories.
    RelayDirs { root_dir, config_dir, logs_dir }
}

// ---------------------------------------------------------------------------
// check_relay_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that it has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust
 * package creates directories with 0o700 permissions.
 *
 * Any failure results in a panic.
 */
fn check_relay_dir(dir: &String, msgname: &str, mistrust: &Mistrust) {
    // Get the path object.
    let path = Path::new(dir);
    if !path.is_absolute() {
        panic!("The relay {} path must be absolute: {}", msgname, dir);
    }
    if path.exists() {
        // Make sure the path represents a directory.
        if !path.is_dir() {
            panic!("The relay {} path must be a directory: {}", msgname, dir);
        }

        // Make sure the directory has rwx for owner only.
        let meta = path.metadata().unwrap_or_else(|_| panic!("Unable to read metadata for {}: {}", msgname, dir));
        let perm = meta.permissions().mode();
        if perm & 0o777 != 0o700 {
            panic!("The relay {} path must have 0o700 permissions: {}", msgname, dir);
        }
    } else {
        // Create the directory with the correct permissions.
        match mistrust.make_directory(path) {
            Ok(_) => (),
            Err(e) => {
                panic!("Make directory error for {:?}: {}", path, &e.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Mistrust {
    // Configure our mistrust object.
    let mistrust = match Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build() {
            Ok(m) => m,
            Err(e) => {
                panic!("Mistrust configuration error: {}", &e.to_string());
            }
        };
    mistrust
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_RELAY_ROOT_DIR).unwrap_or_else(
        |_| {
            match RELAY_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    // Canonicalize the path.
    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the configuration file when one is present,
 * otherwise fall back to a console appender so a bare checkout still runs.
 */
pub fn init_log() {
    let logconfig = init_log_config();
    if Path::new(&logconfig).is_file() {
        match log4rs::init_file(logconfig.clone(), Default::default()) {
            Ok(_) => (),
            Err(e) => {
                println!("{}", e);
                let s = format!("{}", Errors::Log4rsInitialization(logconfig.clone()));
                panic!("{}", s);
            },
        }
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        init_console_log();
        info!("Log4rs configuration file not found at {}, logging to console.", logconfig);
    }
}

// ---------------------------------------------------------------------------
// init_console_log:
// ---------------------------------------------------------------------------
fn init_console_log() {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .expect("FAILED to build console logging configuration.");
    log4rs::init_config(config).expect("FAILED to initialize console logging.");
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config() -> String {
    RELAY_DIRS.config_dir.clone() + LOG4RS_CONFIG_FILE
}

/// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config data directory.  When the file is absent, the compiled-in defaults
 * apply.  Environment overrides are layered on last either way.
 */
fn get_parms() -> Result<Parms> {
    // Get the config file path from its data directory.
    let config_file = RELAY_DIRS.config_dir.clone() + RELAY_CONFIG_FILE;

    // Read the configuration file.
    let config_file_abs = relay_utils::get_absolute_path(&config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            println!("Unable to read configuration at {}. Using default values.", config_file);
            let config = apply_env_overrides(Config::new());
            return Ok(Parms { config_file: Default::default(), config });
        }
    };

    // Parse the toml configuration.
    let config : Config = match toml::from_str(&contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file_abs), e);
            error!("{}", msg);
            return Result::Err(anyhow!(msg));
        }
    };

    Ok(Parms { config_file: config_file_abs, config: apply_env_overrides(config) })
}

// ---------------------------------------------------------------------------
// apply_env_overrides:
// ---------------------------------------------------------------------------
/** The webhook URL and notice-signing secret are deployment settings and
 * can be supplied through the environment, taking precedence over both the
 * config file and the compiled-in defaults.
 */
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(url) = env::var(ENV_WEBHOOK_URL) {
        if !url.is_empty() {
            config.webhook_url = url;
        }
    }
    if let Ok(secret) = env::var(ENV_SECRET_KEY) {
        if !secret.is_empty() {
            config.secret_key = secret;
        }
    }
    config
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // If either of these fail the application aborts.
    let parms = get_parms().expect("FAILED to read configuration file.");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
        .build()
        .expect("FAILED to build the outbound HTTP client.");
    RuntimeCtx {
        parms,
        client,
        store: CallbackStore::new(),
        relay_args: &RELAY_ARGS,
        relay_dirs: &RELAY_DIRS,
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn default_config() {
        let c = Config::new();
        assert_eq!(c.http_addr, "0.0.0.0");
        assert_eq!(c.http_port, 5000);
        assert!(!c.webhook_url.is_empty());
        assert!(!c.secret_key.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("http_port = 8080\n").unwrap();
        assert_eq!(c.http_port, 8080);
        assert_eq!(c.http_addr, "0.0.0.0");
    }
}
