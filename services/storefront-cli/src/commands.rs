//! Subcommands

use anyhow::{Context, Result, bail};
use api_client::{Resource, StorefrontClient};
use clap::Subcommand;
use common::Secret;
use serde_json::Value;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to STOREFRONT_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Password (falls back to STOREFRONT_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// End the session
    Logout,
    /// List a resource collection (products, donations, testimonials, faqs)
    List { resource: String },
    /// Fetch one item of a resource collection
    Get { resource: String, id: String },
    /// Show whether a session is stored
    Whoami,
}

impl Commands {
    pub async fn execute(self, client: &StorefrontClient) -> Result<()> {
        match self {
            Commands::Login { email, password } => {
                let password = resolve_password(password)?;
                client
                    .auth()
                    .login(&email, password.expose())
                    .await
                    .context("sign-in failed")?;
                println!("Signed in as {email}");
            }
            Commands::Register {
                name,
                email,
                password,
            } => {
                let password = resolve_password(password)?;
                client
                    .auth()
                    .register(&name, &email, password.expose())
                    .await
                    .context("registration failed")?;
                println!("Registered and signed in as {email}");
            }
            Commands::Logout => {
                client.auth().logout().await?;
            }
            Commands::List { resource } => {
                let resource = parse_resource(&resource)?;
                let body = client
                    .resource(resource)
                    .list()
                    .await
                    .with_context(|| format!("failed to list {resource}"))?;
                print_json(&body)?;
            }
            Commands::Get { resource, id } => {
                let resource = parse_resource(&resource)?;
                let body = client
                    .resource(resource)
                    .get(&id)
                    .await
                    .with_context(|| format!("failed to get {resource} {id}"))?;
                print_json(&body)?;
            }
            Commands::Whoami => {
                if client.is_authenticated() {
                    println!("Signed in");
                } else {
                    println!("Not signed in");
                }
            }
        }
        info!("command completed");
        Ok(())
    }
}

fn resolve_password(arg: Option<String>) -> Result<Secret<String>> {
    match arg.or_else(|| std::env::var("STOREFRONT_PASSWORD").ok()) {
        Some(p) if !p.is_empty() => Ok(Secret::new(p)),
        _ => bail!("no password given: pass --password or set STOREFRONT_PASSWORD"),
    }
}

fn parse_resource(name: &str) -> Result<Resource> {
    name.parse::<Resource>()
        .context("expected one of: products, donations, testimonials, faqs")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
