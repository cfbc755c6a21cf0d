//! Command parsing and execution.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

use mpadmin_core::guard::{resolve_return_path, Navigation, Navigator, NoticeSlot, RouteGuard};
use mpadmin_core::{
    ApiClient, Config, Decision, GuardedRoute, LoginCredentials, SessionState, SessionStore,
    SystemClock,
};

const ENV_EMAIL: &str = "MPADMIN_EMAIL";
const ENV_PASSWORD: &str = "MPADMIN_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        email: Option<String>,
        from: Option<String>,
    },
    Logout,
    Status { json: bool },
    Check { path: String, json: bool },
    Nav,
    WhoAmI,
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter().map(String::as_str);
        let name = match iter.next() {
            Some(name) => name,
            None => return Ok(Command::Help),
        };
        let rest: Vec<&str> = iter.collect();
        let json = rest.contains(&"--json");

        match name {
            "login" => {
                let mut email = None;
                let mut from = None;
                let mut it = rest.iter();
                while let Some(arg) = it.next() {
                    match *arg {
                        "--email" => email = Some(it.next().ok_or_else(|| anyhow!("--email needs a value"))?.to_string()),
                        "--from" => from = Some(it.next().ok_or_else(|| anyhow!("--from needs a value"))?.to_string()),
                        other => bail!("Unexpected argument '{}'", other),
                    }
                }
                Ok(Command::Login { email, from })
            }
            "logout" => Ok(Command::Logout),
            "status" => Ok(Command::Status { json }),
            "check" => {
                let path = rest
                    .iter()
                    .find(|a| !a.starts_with("--"))
                    .ok_or_else(|| anyhow!("check needs a PATH"))?;
                Ok(Command::Check {
                    path: path.to_string(),
                    json,
                })
            }
            "nav" => Ok(Command::Nav),
            "whoami" => Ok(Command::WhoAmI),
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => bail!("Unknown command '{}'", other),
        }
    }
}

/// Prints redirects instead of following them, and surfaces the one-time
/// unauthorized notice the fallback page would show.
#[derive(Default)]
struct TerminalNavigator {
    notice: Mutex<NoticeSlot>,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, to: &Navigation) {
        let href = to.href();
        let mut slot = self.notice.lock().unwrap_or_else(|e| e.into_inner());
        match slot.offer(&href) {
            Some(clean) => {
                if let Some(notice) = slot.take() {
                    eprintln!("! {}", notice.message);
                }
                eprintln!("-> {}", clean);
            }
            None => eprintln!("-> {}", href),
        }
    }
}

struct Runtime {
    config: Config,
    client: ApiClient,
    store: SessionStore,
    navigator: Arc<TerminalNavigator>,
}

impl Runtime {
    fn new(config: Config) -> Result<Self> {
        let client = config.api_client()?;
        let storage = config.credential_storage()?;
        let navigator = Arc::new(TerminalNavigator::default());
        let store = SessionStore::new(
            Arc::new(client.clone()),
            storage,
            Arc::new(SystemClock),
            navigator.clone(),
        );
        Ok(Self {
            config,
            client,
            store,
            navigator,
        })
    }
}

pub async fn run(command: Command, config: Config) -> Result<()> {
    let mut rt = Runtime::new(config)?;
    match command {
        Command::Login { email, from } => login(&mut rt, email, from).await,
        Command::Logout => {
            rt.store.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Status { json } => status(&rt, json).await,
        Command::Check { path, json } => check(&rt, &path, json).await,
        Command::Nav => nav(&rt).await,
        Command::WhoAmI => whoami(&rt).await,
        Command::Help => Ok(()),
    }
}

fn prompt_email(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), default) {
        (true, Some(last)) => Ok(last.to_string()),
        _ => Ok(input.to_string()),
    }
}

async fn login(rt: &mut Runtime, email: Option<String>, from: Option<String>) -> Result<()> {
    let email = match email.or_else(|| std::env::var(ENV_EMAIL).ok()) {
        Some(email) => email,
        None => prompt_email(rt.config.last_email.as_deref())?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };
    if email.trim().is_empty() || password.is_empty() {
        bail!("Email and password required");
    }

    println!("Authenticating...");
    let identity = match rt.store.login(LoginCredentials::new(email.trim(), &password)).await {
        Ok(identity) => identity,
        Err(e) => bail!("{}", e.user_message()),
    };

    rt.config.last_email = Some(identity.email().to_string());
    if let Err(e) = rt.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {} ({}).", identity.name(), identity.role());
    let landing = resolve_return_path(from.as_deref());
    rt.navigator.navigate(&Navigation::Path(landing));
    Ok(())
}

async fn status(rt: &Runtime, json: bool) -> Result<()> {
    let state = rt.store.hydrate().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&state.identity())?);
        return Ok(());
    }
    match state {
        SessionState::Authenticated(identity) => {
            println!("Signed in as {} <{}>", identity.name(), identity.email());
            println!("Role:    {}", identity.role());
            println!(
                "Expires: {} ({} min)",
                identity.expires_at().to_rfc3339(),
                identity.minutes_until_expiry(Utc::now())
            );
        }
        _ => println!("Not signed in."),
    }
    Ok(())
}

async fn check(rt: &Runtime, path: &str, json: bool) -> Result<()> {
    rt.store.hydrate().await;
    let mut route = GuardedRoute::new(RouteGuard::default(), rt.navigator.clone());
    let mut session = rt.store.subscribe();
    let decision = route.settle(&mut session, path).await;
    debug!(path = path, decision = ?decision, "Guard evaluated");

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }
    match decision {
        Decision::Render => println!("render {}", path),
        Decision::Loading => println!("loading"),
        Decision::RedirectToLogin { return_path } => println!("login required (return to {})", return_path),
        Decision::RedirectToFallback { reason } => println!("denied: {}", reason),
    }
    Ok(())
}

async fn nav(rt: &Runtime) -> Result<()> {
    let state = rt.store.hydrate().await;
    let identity = state.identity().ok_or_else(|| anyhow!("Not signed in."))?;
    for item in RouteGuard::default().policy().visible_nav(identity.role()) {
        println!("{:<12} {}", item.name, item.href);
    }
    Ok(())
}

async fn whoami(rt: &Runtime) -> Result<()> {
    rt.store.hydrate().await;
    let token = rt
        .store
        .access_token()
        .await
        .ok_or_else(|| anyhow!("Not signed in."))?;
    let account = rt
        .client
        .current_account(&token)
        .await
        .context("Failed to fetch account")?;
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}
