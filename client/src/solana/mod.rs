//! USDC payment orchestration.
//!
//! Collects a fixed-amount SPL token payment from the connected wallet to
//! the configured recipient. Key custody stays behind the [`WalletAdapter`]
//! seam; this module only queries balances, assembles the transaction
//! (creating the recipient's token account when absent), and records the
//! outcome. Nothing here retries: every failure is surfaced as a distinct
//! message state and the user must trigger the action again.

use chrono::Utc;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_associated_token_account::get_associated_token_address;
use std::path::Path;
use std::str::FromStr;

use crate::models::PaymentResult;

pub const USDC_DECIMALS: u8 = 6;

#[derive(Debug)]
pub enum PaymentError {
    InvalidRecipient(String),
    InvalidMint(String),
    InsufficientBalance { required: u64, available: u64 },
    BalanceQuery(String),
    Wallet(String),
    Signing(String),
    Submission(String),
    Confirmation(String),
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentError::InvalidRecipient(addr) => {
                write!(f, "invalid recipient address in configuration: {addr}")
            }
            PaymentError::InvalidMint(addr) => {
                write!(f, "invalid token mint in configuration: {addr}")
            }
            PaymentError::InsufficientBalance { required, available } => write!(
                f,
                "insufficient USDC balance: you need {} USDC but only have {} USDC",
                format_usdc(*required),
                format_usdc(*available)
            ),
            PaymentError::BalanceQuery(e) => write!(f, "failed to fetch balances: {e}"),
            PaymentError::Wallet(e) => write!(f, "wallet error: {e}"),
            PaymentError::Signing(e) => write!(f, "signing failed: {e}"),
            PaymentError::Submission(e) => write!(f, "payment submission failed: {e}"),
            PaymentError::Confirmation(e) => write!(f, "payment confirmation failed: {e}"),
        }
    }
}

impl std::error::Error for PaymentError {}

/// `true` when the string looks like a Solana address: base58, 32–44 chars.
pub fn is_valid_solana_address(address: &str) -> bool {
    let len = address.chars().count();
    (32..=44).contains(&len) && bs58::decode(address).into_vec().is_ok()
}

pub fn validate_recipient(address: &str) -> Result<Pubkey, PaymentError> {
    if !is_valid_solana_address(address) {
        return Err(PaymentError::InvalidRecipient(address.to_string()));
    }
    Pubkey::from_str(address).map_err(|_| PaymentError::InvalidRecipient(address.to_string()))
}

/// USDC carries 6 decimals; amounts convert with floor rounding.
pub fn to_micro_usdc(amount: f64) -> u64 {
    (amount * 1_000_000.0).floor() as u64
}

pub fn format_usdc(micro: u64) -> String {
    format!("{:.2}", micro as f64 / 1_000_000.0)
}

pub fn format_sol(lamports: u64) -> String {
    format!("{:.4}", lamports as f64 / 1_000_000_000.0)
}

/// External signing collaborator. The application never holds private keys
/// itself; anything that can produce a signed, submitted transaction for an
/// address satisfies this seam.
pub trait WalletAdapter {
    fn address(&self) -> Pubkey;

    async fn sign_and_send(
        &self,
        tx: Transaction,
        rpc: &RpcClient,
    ) -> Result<Signature, PaymentError>;
}

/// Wallet backed by a local keypair file, the CLI's stand-in for a browser
/// wallet extension.
pub struct LocalWallet {
    keypair: Keypair,
}

impl LocalWallet {
    pub fn from_file(path: &Path) -> Result<Self, PaymentError> {
        let keypair = solana_sdk::signer::keypair::read_keypair_file(path)
            .map_err(|e| PaymentError::Wallet(format!("failed to read keypair file: {e}")))?;
        Ok(Self { keypair })
    }
}

impl WalletAdapter for LocalWallet {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_send(
        &self,
        mut tx: Transaction,
        rpc: &RpcClient,
    ) -> Result<Signature, PaymentError> {
        let blockhash = rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| PaymentError::Submission(format!("failed to fetch blockhash: {e}")))?;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| PaymentError::Signing(e.to_string()))?;
        rpc.send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| PaymentError::Confirmation(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balances {
    /// Native balance in lamports.
    pub sol: u64,
    /// Token balance in micro-USDC.
    pub usdc: u64,
}

pub struct PaymentClient<W: WalletAdapter> {
    rpc: RpcClient,
    wallet: W,
    usdc_mint: Pubkey,
    recipient: String,
    balances: Balances,
}

impl<W: WalletAdapter> PaymentClient<W> {
    pub fn new(
        rpc_url: &str,
        wallet: W,
        usdc_mint: &str,
        recipient: &str,
    ) -> Result<Self, PaymentError> {
        let usdc_mint = Pubkey::from_str(usdc_mint)
            .map_err(|_| PaymentError::InvalidMint(usdc_mint.to_string()))?;
        Ok(Self {
            rpc: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
            wallet,
            usdc_mint,
            recipient: recipient.to_string(),
            balances: Balances::default(),
        })
    }

    pub fn wallet_address(&self) -> Pubkey {
        self.wallet.address()
    }

    pub fn balances(&self) -> Balances {
        self.balances
    }

    /// Fetch native and token balances for the connected address.
    pub async fn refresh_balances(&mut self) -> Result<Balances, PaymentError> {
        let owner = self.wallet.address();
        let sol = self
            .rpc
            .get_balance(&owner)
            .await
            .map_err(|e| PaymentError::BalanceQuery(e.to_string()))?;

        let token_account = get_associated_token_address(&owner, &self.usdc_mint);
        // the token account might not exist yet
        let usdc = match self.rpc.get_token_account_balance(&token_account).await {
            Ok(amount) => amount
                .amount
                .parse::<u64>()
                .map_err(|e| PaymentError::BalanceQuery(format!("invalid token amount: {e}")))?,
            Err(_) => 0,
        };

        self.balances = Balances { sol, usdc };
        Ok(self.balances)
    }

    /// Send `amount` USDC to the configured recipient.
    ///
    /// Guards run in order before any transaction is built: recipient must
    /// parse, then the last-fetched token balance must cover the amount.
    /// The recipient's token account is created in the same transaction when
    /// it does not exist yet.
    pub async fn send_usdc(&mut self, amount: f64) -> Result<PaymentResult, PaymentError> {
        let sender = self.wallet.address();
        let recipient = validate_recipient(&self.recipient)?;

        let required = to_micro_usdc(amount);
        if required > self.balances.usdc {
            return Err(PaymentError::InsufficientBalance {
                required,
                available: self.balances.usdc,
            });
        }

        let sender_token_account = get_associated_token_address(&sender, &self.usdc_mint);
        let recipient_token_account = get_associated_token_address(&recipient, &self.usdc_mint);

        let mut instructions = Vec::with_capacity(2);
        if self.rpc.get_account(&recipient_token_account).await.is_err() {
            instructions.push(
                spl_associated_token_account::instruction::create_associated_token_account(
                    &sender,
                    &recipient,
                    &self.usdc_mint,
                    &spl_token::id(),
                ),
            );
        }
        instructions.push(
            spl_token::instruction::transfer_checked(
                &spl_token::id(),
                &sender_token_account,
                &self.usdc_mint,
                &recipient_token_account,
                &sender,
                &[],
                required,
                USDC_DECIMALS,
            )
            .map_err(|e| PaymentError::Submission(format!("failed to build transfer: {e}")))?,
        );

        let tx = Transaction::new_with_payer(&instructions, Some(&sender));
        let signature = self.wallet.sign_and_send(tx, &self.rpc).await?;
        log::info!("payment confirmed: {signature}");

        let result = PaymentResult {
            success: true,
            tx_hash: Some(signature.to_string()),
            amount: format_usdc(required),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            error: None,
        };

        if let Err(e) = self.refresh_balances().await {
            log::warn!("balance refresh after payment failed: {e}");
        }
        Ok(result)
    }

    /// Record for a payment attempt that did not go through, kept in the
    /// same shape the backend expects.
    pub fn failure_result(&self, amount: f64, error: &PaymentError) -> PaymentResult {
        PaymentResult {
            success: false,
            tx_hash: None,
            amount: format_usdc(to_micro_usdc(amount)),
            sender: self.wallet.address().to_string(),
            recipient: self.recipient.clone(),
            timestamp: Utc::now().timestamp_millis(),
            error: Some(error.to_string()),
        }
    }
}
