use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use securedeal_client::api::SignupRequest;
use securedeal_client::media::MediaClient;
use securedeal_client::models::{Platform, User, WalletKind};
use securedeal_client::solana::{format_sol, format_usdc, LocalWallet, PaymentClient};
use securedeal_client::{auth, deals, profile, wizard};
use securedeal_client::{ApiClient, AppConfig, AppState, CacheStore};

#[derive(Parser)]
#[command(name = "securedeal", about = "SecureDeal escrow marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Request an email verification code for login or signup.
    SendCode {
        email: String,
        #[arg(long, default_value = "login")]
        action: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account with the emailed verification code.
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        code: String,
    },
    /// Log in with credentials and the emailed verification code.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        code: String,
    },
    /// End the session and clear all locally cached data.
    Logout,
    /// Show the current user.
    Whoami,
    /// Deal list and lifecycle operations.
    Deals {
        #[command(subcommand)]
        command: DealsCommand,
    },
    /// The deal creation wizard, resumable between invocations.
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
    /// Profile, contact, and wallet management.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Pay the escrow amount in USDC from a local keypair.
    Pay {
        #[arg(long)]
        keypair: PathBuf,
        #[arg(long)]
        amount: Option<f64>,
    },
}

#[derive(Subcommand)]
enum DealsCommand {
    /// List the current user's deals (cached list shown when offline).
    List {
        #[arg(long)]
        page: Option<u32>,
    },
    /// List deal requests awaiting your approval.
    Requests,
    Show {
        deal_id: String,
    },
    Accept {
        deal_id: String,
    },
    Decline {
        deal_id: String,
    },
    Cancel {
        deal_id: String,
    },
    Delete {
        deal_id: String,
    },
}

#[derive(Subcommand)]
enum DraftCommand {
    /// Show the draft and which step it is on.
    Show,
    /// Set basic fields on the draft.
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        secure_id: Option<String>,
        #[arg(long)]
        duration: Option<String>,
    },
    /// Validate the current step and move to the next one.
    Next,
    Back,
    AddDeliverable {
        description: String,
    },
    RemoveDeliverable {
        index: usize,
    },
    AttachFile {
        path: PathBuf,
    },
    AttachImage {
        path: PathBuf,
    },
    RemoveFile {
        public_id: String,
    },
    RemoveImage {
        public_id: String,
    },
    /// Resolve the counterparty, confirm, and create the deal.
    Submit {
        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },
    Clear,
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Set {
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    AddContact {
        #[arg(long)]
        platform: String,
        #[arg(long)]
        handle: String,
        #[arg(long, default_value = "+1")]
        country_code: String,
    },
    AddWallet {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        wallet_type: String,
    },
    RemoveWallet {
        address: String,
    },
}

fn print_deal_row(deal: &securedeal_client::models::Deal) {
    let expired = if deal.is_request_expired(chrono::Utc::now()) {
        " (request expired)"
    } else {
        ""
    };
    println!(
        "{}  {:<18}  {} {}  {}{}",
        deal.id, deal.progress_status, deal.price, deal.currency, deal.title, expired
    );
}

async fn require_session(
    api: &ApiClient,
    cache: &CacheStore,
    state: &mut AppState,
) -> Result<User, Box<dyn std::error::Error>> {
    auth::bootstrap(api, cache, state).await?;
    if let Some(err) = &state.deals.error {
        eprintln!("warning: could not refresh deals: {err}");
    }
    state
        .current_user
        .clone()
        .ok_or_else(|| "no active session; run `securedeal login`".into())
}

fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let cache = CacheStore::open(&config.cache_path)?;
    let mut api = ApiClient::new(
        config.api_base_url.as_str(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    if let Some(token) = cache.load_token()? {
        api.set_token(Some(token));
    }
    let mut state = AppState::default();

    match cli.command {
        Command::SendCode {
            email,
            action,
            password,
        } => {
            if action == "signup" {
                auth::request_signup_code(&api, &email).await?;
            } else {
                auth::request_login_code(&api, &email, password.as_deref().unwrap_or_default())
                    .await?;
            }
            println!("verification code sent to {email}");
        }
        Command::Signup {
            first_name,
            last_name,
            email,
            password,
            location,
            code,
        } => {
            let user = auth::signup(
                &api,
                &SignupRequest {
                    first_name,
                    last_name,
                    email,
                    password,
                    location,
                    verification_code: code,
                },
            )
            .await?;
            println!(
                "account created for {}; your Secure ID is {}",
                user.email, user.secure_id
            );
        }
        Command::Login {
            email,
            password,
            code,
        } => {
            let user = auth::login(&mut api, &cache, &mut state, &email, &password, &code).await?;
            println!("logged in as {} ({})", user.email, user.secure_id);
        }
        Command::Logout => {
            auth::logout(&mut api, &cache, &mut state).await?;
            println!("logged out");
        }
        Command::Whoami => {
            let user = require_session(&api, &cache, &mut state).await?;
            println!("{} {} <{}>", user.first_name, user.last_name, user.email);
            println!("secure id: {}", user.secure_id);
            if let Some(business) = &user.business_name {
                println!("business:  {business}");
            }
        }
        Command::Deals { command } => {
            let user = require_session(&api, &cache, &mut state).await?;
            match command {
                DealsCommand::List { page } => {
                    if let Some(page) = page {
                        state.deals.pagination.page = page;
                        deals::sync_deals(&api, &cache, &mut state.deals, &user).await;
                    }
                    if state.deals.deals.is_empty() {
                        println!("no deals yet");
                    }
                    for deal in &state.deals.deals {
                        print_deal_row(deal);
                    }
                    if state.deals.pagination.total_pages > 1 {
                        println!(
                            "page {} of {}",
                            state.deals.pagination.page, state.deals.pagination.total_pages
                        );
                    }
                }
                DealsCommand::Requests => {
                    for deal in api.user_requests().await? {
                        print_deal_row(&deal);
                    }
                }
                DealsCommand::Show { deal_id } => match state.deals.find(&deal_id) {
                    Some(deal) => {
                        print_deal_row(deal);
                        println!("from: {}", deal.from.as_deref().unwrap_or("-"));
                        println!("to:   {}", deal.to.as_deref().unwrap_or("-"));
                        println!("deadline: {}", deal.deadline().format("%b %e, %Y"));
                        for d in &deal.deliverables {
                            let mark = if d.completed { "x" } else { " " };
                            println!("  [{mark}] {}", d.description);
                        }
                        for file in &deal.files {
                            println!("  doc: {} ({})", file.name, file.url);
                        }
                    }
                    None => println!("deal {deal_id} not found"),
                },
                DealsCommand::Accept { deal_id } => {
                    deals::respond_to_request(&api, &cache, &mut state.deals, &user, &deal_id, true)
                        .await?;
                    println!("deal accepted; now awaiting payment");
                }
                DealsCommand::Decline { deal_id } => {
                    deals::respond_to_request(
                        &api,
                        &cache,
                        &mut state.deals,
                        &user,
                        &deal_id,
                        false,
                    )
                    .await?;
                    println!("deal declined");
                }
                DealsCommand::Cancel { deal_id } => {
                    deals::cancel_deal(&api, &cache, &mut state.deals, &user, &deal_id).await?;
                    println!("deal canceled");
                }
                DealsCommand::Delete { deal_id } => {
                    deals::delete_deal(&api, &cache, &mut state.deals, &user, &deal_id).await?;
                    println!("deal deleted");
                }
            }
        }
        Command::Draft { command } => {
            let mut draft = wizard::load_or_default(&cache);
            match command {
                DraftCommand::Show => {
                    println!("step {} of {}", draft.step, wizard::FINAL_STEP);
                    println!("title:       {}", draft.title);
                    println!("price:       {} {}", draft.price, draft.currency);
                    println!("duration:    {} days", draft.duration);
                    println!("seller:      {}", draft.secure_id);
                    println!("description: {}", draft.description);
                    for (i, d) in draft.deliverables.iter().enumerate() {
                        println!("  {}. {}", i + 1, d.description);
                    }
                    println!(
                        "{} document(s), {} image(s)",
                        draft.files.len(),
                        draft.images.len()
                    );
                    if let Some(warning) = wizard::document_warning(&draft) {
                        println!("warning: {warning}");
                    }
                }
                DraftCommand::Set {
                    title,
                    price,
                    currency,
                    description,
                    secure_id,
                    duration,
                } => {
                    if let Some(v) = title {
                        draft.title = v;
                    }
                    if let Some(v) = price {
                        draft.price = v;
                    }
                    if let Some(v) = currency {
                        draft.currency = v;
                    }
                    if let Some(v) = description {
                        draft.description = v;
                    }
                    if let Some(v) = secure_id {
                        draft.secure_id = v;
                    }
                    if let Some(v) = duration {
                        draft.duration = v;
                    }
                    wizard::save(&cache, &draft);
                    println!("draft saved");
                }
                DraftCommand::Next => {
                    wizard::advance(&cache, &mut draft)?;
                    println!("now on step {} of {}", draft.step, wizard::FINAL_STEP);
                    if draft.step == 3 {
                        if let Some(warning) = wizard::document_warning(&draft) {
                            println!("warning: {warning}");
                        }
                    }
                }
                DraftCommand::Back => {
                    wizard::back(&cache, &mut draft);
                    println!("now on step {} of {}", draft.step, wizard::FINAL_STEP);
                }
                DraftCommand::AddDeliverable { description } => {
                    if wizard::add_deliverable(&cache, &mut draft, &description) {
                        println!("deliverable added");
                    } else {
                        println!("deliverable description cannot be empty");
                    }
                }
                DraftCommand::RemoveDeliverable { index } => {
                    if wizard::remove_deliverable(&cache, &mut draft, index) {
                        println!("deliverable removed");
                    } else {
                        println!("no deliverable at index {index}");
                    }
                }
                DraftCommand::AttachFile { path } => {
                    let media = media_client(&config)?;
                    let file = wizard::attach_file(
                        &media,
                        &cache,
                        &mut draft,
                        &path,
                        print_progress,
                    )
                    .await?;
                    println!("uploaded {} ({})", file.name, file.public_id);
                }
                DraftCommand::AttachImage { path } => {
                    let media = media_client(&config)?;
                    let image = wizard::attach_image(
                        &media,
                        &cache,
                        &mut draft,
                        &path,
                        print_progress,
                    )
                    .await?;
                    println!("uploaded image {}", image.public_id);
                }
                DraftCommand::RemoveFile { public_id } => {
                    let media = media_client(&config)?;
                    wizard::remove_file(&media, &cache, &mut draft, &public_id).await?;
                    println!("file removed");
                }
                DraftCommand::RemoveImage { public_id } => {
                    let media = media_client(&config)?;
                    wizard::remove_image(&media, &cache, &mut draft, &public_id).await?;
                    println!("image removed");
                }
                DraftCommand::Submit { yes } => {
                    let user = require_session(&api, &cache, &mut state).await?;
                    let counterparty =
                        wizard::resolve_counterparty(&api, &user, &draft).await?;
                    println!(
                        "seller: {} {} ({})",
                        counterparty.first_name,
                        counterparty.last_name,
                        counterparty
                            .business_name
                            .as_deref()
                            .unwrap_or(&counterparty.secure_id)
                    );
                    if !yes && !confirm("create this deal?")? {
                        println!("aborted; draft kept");
                        return Ok(());
                    }
                    let deal = wizard::confirm_and_submit(
                        &api,
                        &cache,
                        &mut state.deals,
                        &user,
                        &draft,
                        &counterparty,
                    )
                    .await?;
                    println!("deal {} created; waiting for seller to accept", deal.id);
                }
                DraftCommand::Clear => {
                    cache.clear_draft()?;
                    println!("draft cleared");
                }
            }
        }
        Command::Profile { command } => {
            let mut user = require_session(&api, &cache, &mut state).await?;
            match command {
                ProfileCommand::Show => {
                    println!("{} {} ({})", user.first_name, user.last_name, user.secure_id);
                    if let Some(business) = &user.business_name {
                        println!("business: {business}");
                    }
                    for contact in &user.contacts {
                        println!("contact: {:?} {}", contact.platform, contact.username);
                    }
                    for wallet in &user.wallets {
                        println!("wallet: {} {}", wallet.name, wallet.address);
                    }
                }
                ProfileCommand::Set {
                    business_name,
                    description,
                } => {
                    profile::save_profile(&api, &cache, &mut state, business_name, description)
                        .await?;
                    println!("profile saved");
                }
                ProfileCommand::AddContact {
                    platform,
                    handle,
                    country_code,
                } => {
                    let platform: Platform = platform.parse().map_err(std::io::Error::other)?;
                    profile::add_contact(&mut user, platform, &handle, &country_code)?;
                    state.current_user = Some(user);
                    profile::save_profile(&api, &cache, &mut state, None, None).await?;
                    println!("contact added");
                }
                ProfileCommand::AddWallet {
                    name,
                    address,
                    wallet_type,
                } => {
                    let kind: WalletKind = wallet_type.parse().map_err(std::io::Error::other)?;
                    profile::add_wallet(&mut user, &name, &address, kind)?;
                    state.current_user = Some(user);
                    profile::save_profile(&api, &cache, &mut state, None, None).await?;
                    println!("wallet added");
                }
                ProfileCommand::RemoveWallet { address } => {
                    if !profile::remove_wallet(&mut user, &address) {
                        println!("no wallet with that address");
                        return Ok(());
                    }
                    state.current_user = Some(user);
                    profile::save_profile(&api, &cache, &mut state, None, None).await?;
                    println!("wallet removed");
                }
            }
        }
        Command::Pay { keypair, amount } => {
            let wallet = LocalWallet::from_file(&keypair)?;
            let mut payment = PaymentClient::new(
                &config.solana_rpc_url,
                wallet,
                &config.usdc_mint,
                &config.recipient_address,
            )?;
            let balances = payment.refresh_balances().await?;
            println!(
                "balances: {} SOL, {} USDC",
                format_sol(balances.sol),
                format_usdc(balances.usdc)
            );

            let amount = amount.unwrap_or(config.payment_amount);
            match payment.send_usdc(amount).await {
                Ok(result) => {
                    println!("payment successful");
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    let refreshed = payment.balances();
                    println!(
                        "balances: {} SOL, {} USDC",
                        format_sol(refreshed.sol),
                        format_usdc(refreshed.usdc)
                    );
                }
                Err(e) => {
                    let record = payment.failure_result(amount, &e);
                    eprintln!("{e}");
                    eprintln!("{}", serde_json::to_string_pretty(&record)?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn media_client(config: &AppConfig) -> Result<MediaClient, Box<dyn std::error::Error>> {
    Ok(MediaClient::new(
        config.media_upload_url.as_str(),
        config.media_delete_url.as_str(),
        config.media_upload_preset.as_str(),
        Duration::from_secs(config.request_timeout_secs.max(60)),
    )?)
}

fn print_progress(sent: u64, total: u64) {
    if total == 0 {
        return;
    }
    let pct = sent * 100 / total;
    eprint!("\ruploading... {pct}%");
    if sent >= total {
        eprintln!();
    }
}
