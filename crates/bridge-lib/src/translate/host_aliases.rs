//! `/etc/hosts` entries from `extra_hosts`

use crate::models::Container;
use k8s_openapi::api::core::v1::HostAlias;

/// One alias per `hostname:ip` entry, split on the first `:`
///
/// Entries without a `:` are skipped. Entries sharing an IP are not merged.
pub fn host_aliases(container: &Container) -> Vec<HostAlias> {
    container
        .extra_hosts
        .iter()
        .filter_map(|entry| entry.split_once(':'))
        .map(|(hostname, ip)| HostAlias {
            ip: Some(ip.to_string()),
            hostnames: Some(vec![hostname.to_string()]),
        })
        .collect()
}
