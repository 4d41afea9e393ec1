use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use approvals_state::evmscript::KnownApp;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct Cfg {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "ETH_RPC_URL")]
    pub eth_rpc_url: String,

    #[arg(long, env = "APPROVALS_CONTRACT_ADDRESS")]
    pub approvals_contract_address: Address,

    #[arg(long, env = "DEPLOYMENT_BLOCK", default_value_t = 0)]
    pub deployment_block: u64,

    #[arg(long, env = "CONFIRMATIONS", default_value_t = 0)]
    pub confirmations: u64,

    #[arg(long, env = "MAX_BLOCK_RANGE", default_value_t = 2000)]
    pub max_block_range: u64,

    #[arg(long, env = "POLL_SECS", default_value_t = 5)]
    pub poll_secs: u64,

    /// Account whose submitted intents are tracked from startup.
    #[arg(long, env = "CONNECTED_ACCOUNT")]
    pub connected_account: Option<Address>,

    /// Signs approve/reject transactions. Actions are refused without it.
    #[arg(long, env = "MODERATOR_PRIVATE_KEY")]
    pub moderator_private_key: Option<PrivateKeySigner>,

    #[arg(long, env = "INITIAL_BACKOFF_MS", default_value_t = 1000)]
    pub initial_backoff_ms: u64,

    #[arg(long, env = "BACKOFF_FACTOR", default_value_t = 2)]
    pub backoff_factor: u32,

    #[arg(long, env = "MAX_BACKOFF_SECS", default_value_t = 60)]
    pub max_backoff_secs: u64,

    /// Comma separated `address=name[:identifier]` labels for forwarding paths.
    #[arg(long, env = "KNOWN_APPS", value_delimiter = ',')]
    pub known_apps: Vec<KnownApp>,
}
