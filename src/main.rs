use eyre::{eyre, Result, WrapErr};
use futures_util::future::join;
use rust_decimal::Decimal;
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{info, warn};
use wallet_client::{
    config::{self, Config},
    db::SqliteSessionStorage,
    hooks::{
        AuthHook, AuthOutcome, DebinHook, FetchOutcome, SubmitOutcome, TransferErrorKind,
        TransferHistoryHook, TransferHistoryState, TransferHook, WalletHook, WalletState,
    },
    logging,
    models::DebinSubmission,
    Connectivity, HttpClient, SessionStore, UnauthorizedCoordinator, UnauthorizedHandler,
    WalletApi,
};

const USAGE: &str = "\
usage: wallet-client <command> [args]

  register <email> <password>
  login <email> <password>
  logout
  status
  ping
  balance
  history [pages]
  send <email> <amount>
  debin <service-name> <service-type> <email> <amount>";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cfg = config::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    // Durable session, in-memory if the database cannot be opened
    let session = match SqliteSessionStorage::open(&cfg.session_db_path) {
        Ok(storage) => Arc::new(SessionStore::new(storage)),
        Err(e) => {
            warn!(error = %e, path = %cfg.session_db_path, "session will not persist");
            Arc::new(SessionStore::in_memory())
        }
    };
    session.load();

    let coordinator = Arc::new(UnauthorizedCoordinator::new(Arc::clone(&session)));
    let expired = Arc::new(AtomicBool::new(false));
    let on_expired: UnauthorizedHandler = {
        let expired = Arc::clone(&expired);
        Arc::new(move || expired.store(true, Ordering::SeqCst))
    };
    coordinator.register(Some(on_expired));

    let http = Arc::new(HttpClient::new(&cfg, Arc::clone(&coordinator))?);
    let api = WalletApi::new(http);

    let result = run(command, rest, &api, &cfg).await;

    coordinator.register(None);
    if expired.load(Ordering::SeqCst) {
        println!("Your session has expired. Sign in again with `wallet-client login <email> <password>`.");
    }
    result
}

async fn run(command: &str, args: &[String], api: &WalletApi, cfg: &Config) -> Result<()> {
    match (command, args) {
        ("register", [email, password]) => {
            let auth = AuthHook::new(api.clone());
            match auth.register(email, password).await {
                AuthOutcome::SignedIn(s) => println!("Registered and signed in as {}", s.user_identifier),
                AuthOutcome::Registered => println!("Registered. Sign in with `wallet-client login`."),
                _ => return Err(eyre!(auth.state().error.unwrap_or_default())),
            }
        }
        ("login", [email, password]) => {
            let auth = AuthHook::new(api.clone());
            match auth.login(email, password).await {
                AuthOutcome::SignedIn(s) => println!("Signed in as {}", s.user_identifier),
                _ => return Err(eyre!(auth.state().error.unwrap_or_default())),
            }
        }
        ("logout", []) => {
            AuthHook::new(api.clone()).sign_out();
            println!("Signed out.");
        }
        ("status", []) => match api.http().session().current() {
            Some(s) => println!(
                "Signed in as {} since {}",
                s.user_identifier,
                s.established_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => println!("Not signed in."),
        },
        ("ping", []) => {
            let info = cfg.network_info();
            println!(
                "Backend: {} (localhost: {}, https: {})",
                info.base_url, info.is_localhost, info.is_https
            );
            match api.health().await {
                Connectivity::Reachable { status } => println!("Server is reachable ({status})"),
                Connectivity::ErrorStatus { status, message } => {
                    return Err(eyre!("server responded with {status}: {message}"))
                }
                Connectivity::Unreachable { error } => {
                    return Err(eyre!("connection failed: {error}"))
                }
            }
        }
        ("balance", []) => {
            let wallet = WalletHook::new(api.clone());
            require_session(wallet.fetch().await)?;
            print_wallet(&wallet.state())?;
        }
        ("history", rest) if rest.len() <= 1 => {
            let pages: u32 = match rest.first() {
                Some(p) => p.parse().wrap_err("pages must be a number")?,
                None => 1,
            };
            let history = TransferHistoryHook::new(api.clone(), cfg.history_page_size);
            require_session(history.refetch().await)?;
            for _ in 1..pages {
                if history.load_more().await != FetchOutcome::Updated {
                    break;
                }
            }
            print_history(&history.state())?;
        }
        ("send", [email, amount]) => {
            let amount = parse_amount(amount)?;
            let transfer = TransferHook::new(api.clone());
            match transfer.submit(email, amount).await {
                SubmitOutcome::Succeeded => {
                    println!("Sent ${amount:.2} to {email}");
                    refresh_dashboard(api, cfg).await?;
                }
                _ => {
                    let Some(err) = transfer.state().error else {
                        return Err(eyre!("transfer not completed"));
                    };
                    return match err.kind {
                        TransferErrorKind::RecipientNotFound => Err(eyre!(
                            "{} (recipient: {})",
                            err.message,
                            err.recipient_identity.unwrap_or_default()
                        )),
                        _ => Err(eyre!(err.message)),
                    };
                }
            }
        }
        ("debin", [service, service_type, email, amount]) => {
            let amount = parse_amount(amount)?;
            let debin = DebinHook::new(api.clone());
            let request = DebinSubmission {
                external_service_name: service.clone(),
                service_type: service_type.clone(),
                external_email: email.clone(),
                amount,
            };
            match debin.submit(request).await {
                SubmitOutcome::Succeeded => {
                    println!("Deb-in request for ${amount:.2} submitted successfully!");
                    refresh_dashboard(api, cfg).await?;
                }
                _ => {
                    return Err(eyre!(debin
                        .state()
                        .error
                        .unwrap_or_else(|| "deb-in request not completed".to_string())))
                }
            }
        }
        _ => {
            println!("{USAGE}");
            return Err(eyre!("unrecognised command: {command}"));
        }
    }
    Ok(())
}

/// Balance and first history page, fetched concurrently after a mutation.
async fn refresh_dashboard(api: &WalletApi, cfg: &Config) -> Result<()> {
    let wallet = WalletHook::new(api.clone());
    let history = TransferHistoryHook::new(api.clone(), cfg.history_page_size);

    let (wallet_outcome, history_outcome) = join(wallet.refetch(), history.refetch()).await;
    info!(?wallet_outcome, ?history_outcome, "dashboard refreshed");

    print_wallet(&wallet.state())?;
    print_history(&history.state())
}

fn require_session(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Skipped => Err(eyre!("not signed in")),
        _ => Ok(()),
    }
}

fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).wrap_err_with(|| format!("invalid amount: {raw}"))
}

fn print_wallet(state: &WalletState) -> Result<()> {
    if let Some(wallet) = &state.wallet {
        println!("Balance: {:.2} {}", wallet.balance_amount, wallet.currency_code);
    }
    match &state.error {
        Some(err) => Err(eyre!(err.clone())),
        None => Ok(()),
    }
}

fn print_history(state: &TransferHistoryState) -> Result<()> {
    println!(
        "Transfers ({} of {}):",
        state.items.len(),
        state.total_elements
    );
    for record in &state.items {
        let when = record
            .occurred_at()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| record.timestamp.clone());
        println!(
            "  {when}  {:<13} {:>10.2}  {}",
            format!("{:?}", record.kind),
            record.amount,
            record.counterparty().email
        );
    }
    if state.has_more {
        println!("  ... more available");
    }
    match &state.error {
        Some(err) => Err(eyre!(err.clone())),
        None => Ok(()),
    }
}
