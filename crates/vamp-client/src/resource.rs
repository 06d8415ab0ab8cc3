// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource kinds and their REST path segments.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// A resource type the control plane manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Project,
	Cluster,
	VirtualCluster,
	Application,
	Deployment,
	Service,
	Destination,
	Gateway,
	VampService,
	CanaryRelease,
	Experiment,
	Metric,
	Policy,
	User,
	Role,
	Permission,
}

/// `(kind, name, path segment)` for every kind, in declaration order.
const KIND_TABLE: &[(ResourceKind, &str, &str)] = &[
	(ResourceKind::Project, "project", "projects"),
	(ResourceKind::Cluster, "cluster", "clusters"),
	(ResourceKind::VirtualCluster, "virtual_cluster", "virtual_clusters"),
	(ResourceKind::Application, "application", "applications"),
	(ResourceKind::Deployment, "deployment", "deployments"),
	(ResourceKind::Service, "service", "services"),
	(ResourceKind::Destination, "destination", "destinations"),
	(ResourceKind::Gateway, "gateway", "gateways"),
	(ResourceKind::VampService, "vamp_service", "vamp_services"),
	(ResourceKind::CanaryRelease, "canary_release", "canary_releases"),
	(ResourceKind::Experiment, "experiment", "experiments"),
	(ResourceKind::Metric, "metric", "metrics"),
	(ResourceKind::Policy, "policy", "policies"),
	(ResourceKind::User, "user", "users"),
	(ResourceKind::Role, "role", "roles"),
	(ResourceKind::Permission, "permission", "permissions"),
];

impl ResourceKind {
	pub fn all() -> impl Iterator<Item = ResourceKind> {
		KIND_TABLE.iter().map(|(kind, _, _)| *kind)
	}

	fn entry(&self) -> &'static (ResourceKind, &'static str, &'static str) {
		&KIND_TABLE[*self as usize]
	}

	/// Singular snake_case name, e.g. `virtual_cluster`.
	pub fn name(&self) -> &'static str {
		self.entry().1
	}

	/// Plural REST path segment, e.g. `virtual_clusters`.
	pub fn path(&self) -> &'static str {
		self.entry().2
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for ResourceKind {
	type Err = ClientError;

	/// Accepts the snake_case name, kebab-case, the plural path segment, or
	/// either of those with separators removed (`virtualcluster`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
		let squashed = normalized.replace('_', "");
		KIND_TABLE
			.iter()
			.find(|(_, name, path)| {
				normalized == *name
					|| normalized == *path
					|| squashed == name.replace('_', "")
					|| squashed == path.replace('_', "")
			})
			.map(|(kind, _, _)| *kind)
			.ok_or_else(|| ClientError::UnknownResource(s.to_string()))
	}
}
