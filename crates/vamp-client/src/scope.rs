// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope query parameters attached to resource requests.

use vamp_cli_config::ClientConfig;

/// Which slice of the control plane a request targets.
///
/// Empty values are omitted from the query string; the rest are sent in
/// alphabetical key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeParams {
	pub application: String,
	pub cluster: String,
	pub destination: String,
	pub experiment: String,
	pub port: String,
	pub project: String,
	pub subset: String,
	pub virtual_cluster: String,
}

impl ScopeParams {
	/// Defaults taken from the stored project, cluster and virtual cluster.
	pub fn from_config(config: &ClientConfig) -> Self {
		Self {
			project: config.project.clone(),
			cluster: config.cluster.clone(),
			virtual_cluster: config.virtual_cluster.clone(),
			..Self::default()
		}
	}

	pub fn with_project(mut self, project: impl Into<String>) -> Self {
		self.project = project.into();
		self
	}

	pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
		self.cluster = cluster.into();
		self
	}

	pub fn with_virtual_cluster(mut self, virtual_cluster: impl Into<String>) -> Self {
		self.virtual_cluster = virtual_cluster.into();
		self
	}

	pub fn with_application(mut self, application: impl Into<String>) -> Self {
		self.application = application.into();
		self
	}

	pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
		self.destination = destination.into();
		self
	}

	pub fn with_experiment(mut self, experiment: impl Into<String>) -> Self {
		self.experiment = experiment.into();
		self
	}

	pub fn with_port(mut self, port: impl Into<String>) -> Self {
		self.port = port.into();
		self
	}

	pub fn with_subset(mut self, subset: impl Into<String>) -> Self {
		self.subset = subset.into();
		self
	}

	/// Layer `overrides` on top of `self`: non-empty override values win.
	pub fn overlay(mut self, overrides: &ScopeParams) -> Self {
		let pairs = [
			(&mut self.application, &overrides.application),
			(&mut self.cluster, &overrides.cluster),
			(&mut self.destination, &overrides.destination),
			(&mut self.experiment, &overrides.experiment),
			(&mut self.port, &overrides.port),
			(&mut self.project, &overrides.project),
			(&mut self.subset, &overrides.subset),
			(&mut self.virtual_cluster, &overrides.virtual_cluster),
		];
		for (slot, value) in pairs {
			if !value.is_empty() {
				*slot = value.clone();
			}
		}
		self
	}

	/// Non-empty entries as query pairs, sorted by key.
	pub fn to_query(&self) -> Vec<(&'static str, String)> {
		[
			("application", &self.application),
			("cluster", &self.cluster),
			("destination", &self.destination),
			("experiment", &self.experiment),
			("port", &self.port),
			("project", &self.project),
			("subset", &self.subset),
			("virtual_cluster", &self.virtual_cluster),
		]
		.into_iter()
		.filter(|(_, value)| !value.is_empty())
		.map(|(key, value)| (key, value.clone()))
		.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.to_query().is_empty()
	}
}
