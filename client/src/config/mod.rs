use serde::Deserialize;

/// Runtime configuration, environment-driven with working defaults.
///
/// Every key can be overridden with a `SECUREDEAL_`-prefixed variable
/// (e.g. `SECUREDEAL_RECIPIENT_ADDRESS`); a `.env` file is honored.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub solana_rpc_url: String,
    pub usdc_mint: String,
    pub recipient_address: String,
    pub payment_amount: f64,
    pub cache_path: String,
    pub request_timeout_secs: u64,
    pub media_upload_url: String,
    pub media_delete_url: String,
    pub media_upload_preset: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("api_base_url", "http://localhost:4000/api/v1")?
            .set_default("solana_rpc_url", "https://api.devnet.solana.com")?
            .set_default("usdc_mint", "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU")?
            .set_default(
                "recipient_address",
                "3E4kKNEfZVvhh8yAUjJa4brtWCQ7UUCoFePDbKHLb4Eq",
            )?
            .set_default("payment_amount", 1.0)?
            .set_default("cache_path", "securedeal.db")?
            .set_default("request_timeout_secs", 30i64)?
            .set_default(
                "media_upload_url",
                "https://api.cloudinary.com/v1_1/securedeal/auto/upload",
            )?
            .set_default(
                "media_delete_url",
                "https://api.cloudinary.com/v1_1/securedeal/image/destroy",
            )?
            .set_default("media_upload_preset", "securedeal_unsigned")?
            .add_source(config::Environment::with_prefix("SECUREDEAL"))
            .build()?;
        cfg.try_deserialize()
    }
}
