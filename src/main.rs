use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use registrar::auth::{self, Credentials, SIGNED_UP};
use registrar::config::{ConfigError, PortalConfig};
use registrar::messages::FailureKind;
use registrar::net::endpoints::{ME, PING, admin_delete_path};
use registrar::net::{ApiClient, ApiError, Backend};
use registrar::state::identity::{Gate, gate_admin};
use registrar::state::resource::{Record, Resource};
use registrar::state::store::{CookieFile, IdentityStore, StoreError};
use serde_json::{Value, json};
use tracing::level_filters::LevelFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("--data must be a JSON object")]
    NotAnObject,
    #[error("not signed in")]
    NotSignedIn,
    #[error("admin only; redirecting to {redirect}")]
    Gated { redirect: &'static str },
    #[error("{0}")]
    Failed(String),
}

#[derive(Parser, Debug)]
#[command(name = "registrar", about = "Registrar portal API CLI")]
struct Cli {
    /// Backend API root; overrides `PORTAL_BASE_URL`.
    #[arg(long, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    /// Where the identity and session cookies persist; overrides `PORTAL_STATE_DIR`.
    #[arg(long, env = "PORTAL_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Log more (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reach the backend and obtain the anti-forgery cookie.
    Ping,
    Signin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Signup {
        /// Registration record as a JSON object.
        #[arg(long)]
        data: String,
    },
    Signout,
    /// Show the locally stored identity.
    Whoami,
    /// Fetch the signed-in member's profile from the server.
    Me,
    /// Update profile fields; `--member-mid` edits another member.
    Profile {
        #[arg(long)]
        data: String,
        #[arg(long)]
        member_mid: Option<String>,
    },
    /// List a collection, e.g. `departments` or `staff?role=PROF`.
    List { path: String },
    Create {
        path: String,
        #[arg(long)]
        data: String,
        /// Comma-separated fields that must be non-blank.
        #[arg(long, value_delimiter = ',')]
        require: Vec<String>,
    },
    /// Admin-only delete of `admin/<resource>/<id>`.
    Delete { resource: String, id: String },
}

struct CliContext {
    client: ApiClient,
    identity: IdentityStore,
    cookies: CookieFile,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = PortalConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }

    let ctx = CliContext {
        client: ApiClient::new(&config)?,
        identity: IdentityStore::new(&config.state_dir),
        cookies: CookieFile::new(&config.state_dir),
    };
    if let Some(header) = ctx.cookies.load() {
        ctx.client.restore_cookies(&header);
    }

    let result = run(&ctx, cli.command).await;
    persist_cookies(&ctx)?;
    result
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Ping => {
            ctx.client.get(PING).await?;
            let token = if ctx.client.csrf_token().is_some() { "present" } else { "missing" };
            eprintln!("anti-forgery cookie {token}");
            println!("ok");
            Ok(())
        }
        Command::Signin { username, password } => {
            let credentials = Credentials { username, password };
            let signed_in = auth::sign_in(&ctx.client, &ctx.identity, &credentials)
                .await
                .map_err(CliError::Failed)?;
            eprintln!("signed in as {}", signed_in.identity.username);
            print_json(&json!({
                "username": signed_in.identity.username,
                "isAdmin": signed_in.identity.is_admin,
                "landing": signed_in.landing.path(),
            }))
        }
        Command::Signup { data } => {
            let registration = parse_record(&data)?;
            let created = auth::sign_up(&ctx.client, &registration)
                .await
                .map_err(CliError::Failed)?;
            eprintln!("{SIGNED_UP}");
            print_json(&created)
        }
        Command::Signout => {
            auth::sign_out(&ctx.client, &ctx.identity)
                .await
                .map_err(CliError::Failed)?;
            eprintln!("signed out");
            Ok(())
        }
        Command::Whoami => {
            let identity = ctx.identity.load().ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(identity)?)
        }
        Command::Me => {
            let member = ctx.client.get(ME).await?;
            print_json(&member)
        }
        Command::Profile { data, member_mid } => {
            let profile = parse_record(&data)?;
            let updated = auth::update_profile(&ctx.client, &profile, member_mid.as_deref())
                .await
                .map_err(CliError::Failed)?;
            eprintln!("profile updated");
            if !updated.is_null() {
                print_json(&updated)?;
            }
            Ok(())
        }
        Command::List { path } => run_list(ctx, path).await,
        Command::Create { path, data, require } => run_create(ctx, path, &data, &require).await,
        Command::Delete { resource, id } => run_delete(ctx, &resource, &id).await,
    }
}

async fn run_list(ctx: &CliContext, path: String) -> Result<(), CliError> {
    let resource = Resource::new(Arc::new(ctx.client.clone()), path, Record::new());
    resource.fetch().await;
    let snapshot = resource.snapshot();
    if let Some(message) = snapshot.error {
        if snapshot.failure == Some(FailureKind::Unauthorized) {
            if let Some(redirect) = Gate::SignIn.redirect() {
                eprintln!("redirecting to {redirect}");
            }
        }
        return Err(CliError::Failed(message));
    }
    print_json(&Value::Array(snapshot.items))
}

async fn run_create(ctx: &CliContext, path: String, data: &str, require: &[String]) -> Result<(), CliError> {
    let required: Vec<&str> = require.iter().map(String::as_str).collect();
    let resource = Resource::new(Arc::new(ctx.client.clone()), path, Record::new()).with_required(&required);
    resource.set_draft(parse_record(data)?);

    let Some(created) = resource.create().await else {
        let message = resource.error().unwrap_or_else(|| "create was not applied".to_owned());
        return Err(CliError::Failed(message));
    };
    if let Some(notice) = resource.snapshot().notice {
        eprintln!("{notice}");
    }
    print_json(&created)
}

async fn run_delete(ctx: &CliContext, resource: &str, id: &str) -> Result<(), CliError> {
    let gate = gate_admin(ctx.identity.load().as_ref());
    if let Some(redirect) = gate.redirect() {
        return Err(CliError::Gated { redirect });
    }
    let response = ctx.client.delete(&admin_delete_path(resource, id)).await?;
    eprintln!("deleted {resource} {id}");
    if !response.is_null() {
        print_json(&response)?;
    }
    Ok(())
}

fn persist_cookies(ctx: &CliContext) -> Result<(), CliError> {
    match ctx.client.cookie_header() {
        Some(header) => ctx.cookies.save(&header)?,
        None => ctx.cookies.clear()?,
    }
    Ok(())
}

fn parse_record(data: &str) -> Result<Record, CliError> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(record) => Ok(record),
        _ => Err(CliError::NotAnObject),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
