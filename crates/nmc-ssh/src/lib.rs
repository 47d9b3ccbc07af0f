#![doc = include_str!("../README.md")]

mod client;
pub use client::{Channel, Client, Connector};
mod config;
pub use config::{
    COMMAND_TIMEOUT, CONNECT_TIMEOUT, ClientConfig, DEFAULT_PORT, KEX_ALGORITHMS, LOGIN_TIMEOUT,
    client_banner,
};
mod error;
pub use error::SshError;
mod fingerprint;
pub use fingerprint::verify_host_key;
pub mod scp;
mod shell;
pub use shell::{CommandResponse, PromptScanner};
#[cfg(feature = "ssh2")]
mod ssh2_backend;
#[cfg(feature = "ssh2")]
pub use ssh2_backend::{Ssh2Channel, Ssh2Connector};
mod web_ui;
pub use web_ui::{
    DEFAULT_WEB_UI_SSL_PORT, WEB_UI_RESTART_DELAY, WEB_UI_SETTLE_DELAY, fetch_web_ui_certificate,
    verify_web_ui_certificate,
};
