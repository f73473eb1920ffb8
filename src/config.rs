use clap::Parser;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Parser, Serialize, Deserialize, Validate, Clone, Debug)]
#[clap(author, version, about)]
pub struct Config {
    #[clap(env, long, default_value = "3000")]
    pub http_port: u16,
    #[clap(env, long, default_value = "9090")]
    pub metrics_port: u16,
    /// Key for the explorer-style history endpoints (optional, rate limits
    /// are tighter without one).
    #[clap(env, long)]
    pub explorer_api_key: Option<String>,
    /// Key for the transfer-RPC and ledger endpoints; pairs served by those
    /// vendors are unavailable without it.
    #[clap(env, long)]
    pub transfer_api_key: Option<String>,
    #[clap(env, long, default_value = "10")]
    #[validate(range(min = 1, max = 120))]
    pub http_timeout_secs: u64,
    #[clap(env, long)]
    pub lock_rpc_url: Option<String>,
    #[clap(env, long)]
    pub lock_contract_address: Option<String>,
    #[clap(env, long)]
    pub lock_signer_key: Option<String>,
    #[clap(env, long, default_value = "info")]
    pub log_level: String,
}

pub fn load_config() -> Config {
    let figment = Figment::new()
        .merge(Toml::file("config.toml"))
        .merge(Env::prefixed("LP_"));
    let config: Config = figment.extract().expect("Failed to load config");
    config.validate().expect("Invalid config");
    config
}
