//! Container security context

use crate::models::Container;
use k8s_openapi::api::core::v1::{Capabilities, SecurityContext};

/// Map privilege, read-only and capability settings onto a security context
///
/// `privileged` and `read_only_root_filesystem` are always set explicitly,
/// the target distinguishes unset from false.
pub fn security_context(container: &Container) -> SecurityContext {
    let capabilities = if container.cap_add.is_empty() && container.cap_drop.is_empty() {
        None
    } else {
        Some(Capabilities {
            add: non_empty(&container.cap_add),
            drop: non_empty(&container.cap_drop),
        })
    };

    SecurityContext {
        privileged: Some(container.privileged),
        read_only_root_filesystem: Some(container.read_only),
        capabilities,
        ..Default::default()
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_context() {
        let context = security_context(&Container {
            privileged: true,
            read_only: true,
            cap_add: vec!["capadd1".to_string(), "capadd2".to_string()],
            cap_drop: vec!["capdrop1".to_string(), "capdrop2".to_string()],
            ..Default::default()
        });

        assert_eq!(context.privileged, Some(true));
        assert_eq!(context.read_only_root_filesystem, Some(true));

        let capabilities = context.capabilities.unwrap();
        assert_eq!(
            capabilities.add,
            Some(vec!["capadd1".to_string(), "capadd2".to_string()])
        );
        assert_eq!(
            capabilities.drop,
            Some(vec!["capdrop1".to_string(), "capdrop2".to_string()])
        );
    }

    #[test]
    fn test_flags_are_explicitly_false() {
        let context = security_context(&Container::default());

        assert_eq!(context.privileged, Some(false));
        assert_eq!(context.read_only_root_filesystem, Some(false));
        assert!(context.capabilities.is_none());
    }

    #[test]
    fn test_capability_order_is_preserved() {
        let context = security_context(&Container {
            cap_drop: vec!["NET_RAW".to_string(), "ALL".to_string(), "CHOWN".to_string()],
            ..Default::default()
        });

        let capabilities = context.capabilities.unwrap();
        assert!(capabilities.add.is_none());
        assert_eq!(
            capabilities.drop.unwrap(),
            vec!["NET_RAW", "ALL", "CHOWN"]
        );
    }
}
