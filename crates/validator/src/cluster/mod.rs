//! Kubernetes access for the validator.
//!
//! All resource reads go through [`ClusterClient`]; the port-forward fallback
//! in [`forward`] is the only place kubectl is shelled out to.

pub mod forward;
pub mod resolver;

use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{Pod, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

/// Namespaced Kubernetes client for the platform under validation.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
    namespace: String,
}

impl ClusterClient {
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Connect using the named kubeconfig context, or infer the config from
    /// the environment when no context is given.
    ///
    /// # Errors
    /// Returns an error if the kubeconfig cannot be read or the client cannot
    /// be created.
    pub async fn connect(context: Option<&str>, namespace: &str) -> Result<Self> {
        let config = match context {
            Some(ctx) => {
                let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;
                Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(ctx.to_string()),
                        ..KubeConfigOptions::default()
                    },
                )
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{ctx}'"))?
            }
            None => Config::infer()
                .await
                .context("Failed to infer Kubernetes configuration")?,
        };

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        info!(namespace = %namespace, context = context.unwrap_or("(default)"), "Connected to cluster");

        Ok(Self::new(client, namespace))
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List every resource of one kind in the platform namespace.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn list<K>(&self) -> Result<Vec<K>>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + serde::de::DeserializeOwned,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list {}", K::kind(&K::DynamicType::default())))?;
        Ok(list.items)
    }

    pub async fn pods(&self) -> Result<Vec<Pod>> {
        self.list::<Pod>().await
    }

    pub async fn deployments(&self) -> Result<Vec<Deployment>> {
        self.list::<Deployment>().await
    }

    pub async fn services(&self) -> Result<Vec<Service>> {
        self.list::<Service>().await
    }

    pub async fn ingresses(&self) -> Result<Vec<Ingress>> {
        self.list::<Ingress>().await
    }

    pub async fn cron_jobs(&self) -> Result<Vec<CronJob>> {
        self.list::<CronJob>().await
    }

    pub async fn network_policies(&self) -> Result<Vec<NetworkPolicy>> {
        self.list::<NetworkPolicy>().await
    }

    pub async fn service_accounts(&self) -> Result<Vec<ServiceAccount>> {
        self.list::<ServiceAccount>().await
    }

    pub async fn secrets(&self) -> Result<Vec<Secret>> {
        self.list::<Secret>().await
    }
}
