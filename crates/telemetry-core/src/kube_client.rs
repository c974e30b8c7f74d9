use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::error::TelemetryError;

/// Build a cluster API client.
///
/// With an explicit kubeconfig path the client is built from that file;
/// otherwise the default chain applies (in-cluster service account or
/// `~/.kube/config`).
///
/// # Errors
///
/// - [`TelemetryError::ConnectionFailed`] if the config cannot be read or the
///   client cannot be constructed
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<TelemetryError>> {
    let client = match kubeconfig {
        Some(kubeconfig_path) => {
            let kubeconfig = Kubeconfig::read_from(&kubeconfig_path).change_context(
                TelemetryError::ConnectionFailed {
                    message: format!(
                        "failed to read kubeconfig file: {}",
                        kubeconfig_path.display()
                    ),
                },
            )?;

            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .change_context(TelemetryError::ConnectionFailed {
                    message: format!(
                        "failed to create config from kubeconfig: {}",
                        kubeconfig_path.display()
                    ),
                })?;

            Client::try_from(config).change_context(TelemetryError::ConnectionFailed {
                message: "failed to create cluster client from custom kubeconfig".to_string(),
            })?
        }
        None => Client::try_default()
            .await
            .change_context(TelemetryError::ConnectionFailed {
                message: "failed to create cluster client".to_string(),
            })?,
    };
    Ok(client)
}
