// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! vamp CLI - operator client for the vamp service-mesh control plane
//!
//! The binary takes its display name from how it was invoked, so a copy
//! installed as `meshctl` reads `~/.meshctl/config.yaml` and says `meshctl`
//! in its help.

mod cli;
mod commands;
mod context;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vamp_cli_config::app_name_from_argv0;
use vamp_client::{CancellationToken, SecretString};
use zeroize::Zeroizing;

use crate::cli::{Cli, Command, ConfigCommand, LoginArgs};
use crate::context::AppContext;

fn init_tracing(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vamp=debug"));
	let layer = fmt::layer()
		.with_writer(io::stderr)
		.with_target(true)
		.with_file(true)
		.with_line_number(true);

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(layer.json())
			.init();
	} else {
		tracing_subscriber::registry().with(filter).with(layer).init();
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	let argv0 = std::env::args().next();
	let app_name = app_name_from_argv0(argv0.as_deref());
	let cli = cli::parse(&app_name);

	if cli.verbose {
		init_tracing(cli.json_logs);
	}

	match run(cli, app_name).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{e:#}");
			ExitCode::FAILURE
		}
	}
}

async fn run(cli: Cli, app_name: String) -> Result<()> {
	let ctx = AppContext::load(&cli, app_name).await?;
	debug!(app = %ctx.app_name, config = %ctx.config_store.path().display(), "running command");

	let output = match cli.command {
		Command::Login(args) => login(&ctx, args).await?,
		Command::Logout => commands::logout(&ctx.client()?).await?,
		Command::Refresh => commands::refresh(&ctx.client()?).await?,
		Command::Create(args) => {
			let client = ctx.client()?;
			let document = commands::load_document(&client, &args.source).await?;
			commands::create(&client, args.target.kind, &args.target.name, &document, &ctx.scope).await?
		}
		Command::Update(args) => {
			let client = ctx.client()?;
			let document = commands::load_document(&client, &args.source).await?;
			commands::update(&client, args.target.kind, &args.target.name, &document, &ctx.scope).await?
		}
		Command::Merge(args) => {
			let client = ctx.client()?;
			let patch = commands::load_document(&client, &args.source).await?;
			commands::merge(&client, args.target.kind, &args.target.name, &patch, &ctx.scope).await?
		}
		Command::Delete(args) => commands::delete(&ctx.client()?, args.kind, &args.name, &ctx.scope).await?,
		Command::Get(args) => {
			commands::get(
				&ctx.client()?,
				args.target.kind,
				&args.target.name,
				args.output,
				&ctx.scope,
			)
			.await?
		}
		Command::Spec(args) => {
			commands::spec(
				&ctx.client()?,
				args.target.kind,
				&args.target.name,
				args.output,
				&ctx.scope,
			)
			.await?
		}
		Command::List(args) => {
			commands::list(&ctx.client()?, args.kind, args.output, &ctx.scope, args.simple).await?
		}
		Command::Passwd(args) => {
			let password = match args.password {
				Some(password) => SecretString::from(password),
				None => prompt_secret(&format!("New password for {}: ", args.username))?,
			};
			commands::passwd(&ctx.client()?, &args.username, password, &ctx.scope).await?
		}
		Command::PushMetric(args) => {
			let client = ctx.client()?;
			let document = commands::load_document(&client, &args.source).await?;
			commands::push_metric(&client, &args.name, &document, &ctx.scope).await?
		}
		Command::AddRole(args) => {
			commands::add_role(&ctx.client()?, &args.username, &args.role, &ctx.scope).await?
		}
		Command::RemoveRole(args) => {
			commands::remove_role(&ctx.client()?, &args.username, &args.role, &ctx.scope).await?
		}
		Command::Ping => commands::ping(&ctx.client()?).await?,
		Command::Notifications(args) => {
			let client = ctx.client()?;
			let stream = client.notifications(ctx.scope.clone(), CancellationToken::new());
			let mut stdout = io::stdout().lock();
			let shutdown = async {
				if tokio::signal::ctrl_c().await.is_err() {
					std::future::pending::<()>().await;
				}
			};
			commands::follow_notifications(stream, args.output, &mut stdout, shutdown).await?;
			return Ok(());
		}
		Command::Config(ConfigCommand::Show) => commands::show_config(&ctx.config)?,
		Command::Config(ConfigCommand::Path) => ctx.config_store.path().display().to_string(),
		Command::Config(ConfigCommand::Set { key, value }) => {
			commands::set_config(&ctx.config_store, ctx.config.clone(), &key, &value).await?
		}
	};

	let output = output.trim_end();
	if !output.is_empty() {
		println!("{output}");
	}
	Ok(())
}

/// Store the URL and CA from the flags, then authenticate.
async fn login(ctx: &AppContext, args: LoginArgs) -> Result<String> {
	let mut config = ctx.config.clone();
	if let Some(url) = &args.url {
		config.set("url", url)?;
	}
	if let Some(cert) = &args.cert {
		let pem = tokio::fs::read_to_string(cert)
			.await
			.with_context(|| format!("failed to read certificate {}", cert.display()))?;
		config.set("cert", &pem)?;
	}
	if config.url.is_empty() {
		bail!("no control plane URL configured; pass --url");
	}

	let username = match args.username {
		Some(username) => username,
		None if !config.username.is_empty() => config.username.clone(),
		None => prompt("Username: ")?,
	};
	if username.is_empty() {
		bail!("a user name is required");
	}
	let password = match args.password {
		Some(password) => SecretString::from(password),
		None => prompt_secret("Password: ")?,
	};

	config.username = username.clone();
	ctx.config_store.write(&config).await?;
	info!(url = %config.url, username = %username, "logging in");

	let client = ctx.client_with(config)?;
	commands::login(&client, &username, password).await
}

fn prompt(label: &str) -> Result<String> {
	Ok(read_line(label)?.to_string())
}

fn prompt_secret(label: &str) -> Result<SecretString> {
	let secret = SecretString::from(read_line(label)?.as_str());
	if secret.is_empty() {
		bail!("an empty password was given");
	}
	Ok(secret)
}

/// One line from stdin without its line ending, in a buffer wiped on drop.
fn read_line(label: &str) -> Result<Zeroizing<String>> {
	let mut stderr = io::stderr();
	write!(stderr, "{label}")?;
	stderr.flush()?;
	Ok(read_trimmed_line(&mut io::stdin().lock())?)
}

fn read_trimmed_line(reader: &mut impl BufRead) -> io::Result<Zeroizing<String>> {
	let mut line = Zeroizing::new(String::with_capacity(256));
	reader.read_line(&mut line)?;
	let trimmed = line.trim_end_matches(['\r', '\n']).len();
	line.truncate(trimmed);
	Ok(line)
}
