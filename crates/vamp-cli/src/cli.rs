// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command-line surface.
//!
//! Help texts use the `$AppName` placeholder, replaced at startup with the
//! name the binary was invoked as.

use std::path::PathBuf;

use clap::{ArgGroup, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use vamp_cli_config::substitute_app_name;
use vamp_client::{Format, ResourceKind, ScopeParams};

/// Command-line client for the $AppName service-mesh control plane
#[derive(Parser, Debug)]
#[command(name = "vamp", version, about, long_about = None)]
pub struct Cli {
	/// Path to the configuration file (default: $CONFIG or ~/.$AppName/config.yaml)
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Log to stderr with timestamps and source locations
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Emit --verbose logs as JSON
	#[arg(long, global = true)]
	pub json_logs: bool,

	#[command(flatten)]
	pub scope: ScopeArgs,

	#[command(subcommand)]
	pub command: Command,
}

/// Scope overrides; unset flags fall back to the stored defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
	/// Project to operate in
	#[arg(long, global = true)]
	pub project: Option<String>,

	/// Cluster to operate in
	#[arg(long, global = true)]
	pub cluster: Option<String>,

	/// Virtual cluster to operate in
	#[arg(long, global = true)]
	pub virtual_cluster: Option<String>,

	/// Application to operate on
	#[arg(long, global = true)]
	pub application: Option<String>,

	#[arg(long, global = true, hide = true)]
	pub destination: Option<String>,

	#[arg(long, global = true, hide = true)]
	pub experiment: Option<String>,

	#[arg(long, global = true, hide = true)]
	pub port: Option<String>,

	#[arg(long, global = true, hide = true)]
	pub subset: Option<String>,
}

impl ScopeArgs {
	pub fn to_scope(&self) -> ScopeParams {
		let value = |flag: &Option<String>| flag.clone().unwrap_or_default();
		ScopeParams {
			application: value(&self.application),
			cluster: value(&self.cluster),
			destination: value(&self.destination),
			experiment: value(&self.experiment),
			port: value(&self.port),
			project: value(&self.project),
			subset: value(&self.subset),
			virtual_cluster: value(&self.virtual_cluster),
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Log in to the $AppName control plane
	Login(LoginArgs),
	/// Forget the stored session
	Logout,
	/// Rotate the session tokens now
	Refresh,
	/// Create a resource
	Create(WriteArgs),
	/// Replace a resource
	Update(WriteArgs),
	/// Deep-merge a patch into the stored spec of a resource
	Merge(WriteArgs),
	/// Delete a resource
	Delete(TargetArgs),
	/// Show a resource
	Get(ReadArgs),
	/// Show the stored spec of a resource
	Spec(ReadArgs),
	/// List resources of one kind
	List(ListArgs),
	/// Change a user's password
	Passwd(PasswdArgs),
	/// Push a value for a metric
	PushMetric(MetricArgs),
	/// Grant a role to a user
	AddRole(RoleArgs),
	/// Revoke a role from a user
	RemoveRole(RoleArgs),
	/// Check that the $AppName control plane is reachable
	Ping,
	/// Follow control-plane notifications until interrupted
	Notifications(NotificationArgs),
	/// Inspect or edit the $AppName configuration
	#[command(subcommand)]
	Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
	/// Control plane URL, stored for later commands
	#[arg(long)]
	pub url: Option<String>,

	/// PEM file with the CA certificate to pin
	#[arg(long)]
	pub cert: Option<PathBuf>,

	/// User name (prompted when absent and not stored)
	#[arg(short, long = "user")]
	pub username: Option<String>,

	/// Password (prompted when absent)
	#[arg(long, env = "VAMP_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
	/// Resource kind, e.g. project, virtual_cluster, vamp-service
	pub kind: ResourceKind,

	/// Resource name
	pub name: String,
}

/// Where a document comes from.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "spec"])))]
pub struct SourceArgs {
	/// File path or http(s) URL of the document
	#[arg(short, long)]
	pub file: Option<String>,

	/// Inline document
	#[arg(short, long)]
	pub spec: Option<String>,

	/// Document format (default: from the file extension, else yaml)
	#[arg(long)]
	pub format: Option<Format>,

	/// Extra host for a vamp service (repeatable)
	#[arg(long = "host")]
	pub hosts: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
	#[command(flatten)]
	pub target: TargetArgs,

	#[command(flatten)]
	pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
	#[command(flatten)]
	pub target: TargetArgs,

	/// Output format
	#[arg(short, long, default_value = "yaml")]
	pub output: Format,
}

#[derive(Args, Debug)]
pub struct ListArgs {
	/// Resource kind
	pub kind: ResourceKind,

	/// Output format
	#[arg(short, long, default_value = "yaml")]
	pub output: Format,

	/// Ask the server for the short listing
	#[arg(long)]
	pub simple: bool,
}

#[derive(Args, Debug)]
pub struct PasswdArgs {
	/// User whose password changes
	pub username: String,

	/// New password (prompted when absent)
	#[arg(long, env = "VAMP_NEW_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct MetricArgs {
	/// Metric name
	pub name: String,

	#[command(flatten)]
	pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct RoleArgs {
	pub username: String,
	pub role: String,
}

#[derive(Args, Debug)]
pub struct NotificationArgs {
	/// Print records as yaml or json instead of one line each
	#[arg(short, long)]
	pub output: Option<Format>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
	/// Print the configuration with credentials redacted
	Show,
	/// Print the configuration file path
	Path,
	/// Set one key (url, cert, username, project, cluster, virtualcluster, apiversion)
	Set {
		key: String,
		/// New value; for `cert`, a PEM file path
		value: String,
	},
}

/// The clap command with `$AppName` substituted throughout the help.
pub fn command(app_name: &str) -> clap::Command {
	substitute_help(Cli::command(), app_name)
		.name(app_name.to_string())
		.bin_name(app_name.to_string())
}

fn substitute_help(mut cmd: clap::Command, app_name: &str) -> clap::Command {
	if let Some(about) = cmd.get_about().map(|s| substitute_app_name(&s.to_string(), app_name)) {
		cmd = cmd.about(about);
	}
	if let Some(long_about) = cmd
		.get_long_about()
		.map(|s| substitute_app_name(&s.to_string(), app_name))
	{
		cmd = cmd.long_about(long_about);
	}
	let args: Vec<String> = cmd
		.get_arguments()
		.filter(|arg| {
			arg.get_help()
				.is_some_and(|help| help.to_string().contains(vamp_cli_config::APP_NAME_PLACEHOLDER))
		})
		.map(|arg| arg.get_id().as_str().to_string())
		.collect();
	for id in args {
		cmd = cmd.mut_arg(id, |arg| {
			let help = arg
				.get_help()
				.map(|help| substitute_app_name(&help.to_string(), app_name))
				.unwrap_or_default();
			arg.help(help)
		});
	}
	let subcommands: Vec<String> = cmd
		.get_subcommands()
		.map(|sub| sub.get_name().to_string())
		.collect();
	for name in subcommands {
		cmd = cmd.mut_subcommand(name, |sub| substitute_help(sub, app_name));
	}
	cmd
}

/// Parse the process arguments, exiting with clap's usage on error.
pub fn parse(app_name: &str) -> Cli {
	let matches = command(app_name).get_matches();
	Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}
