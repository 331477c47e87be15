//! Shared Kubernetes utilities using kube-rs
//!
//! Helpers for addressing untyped resources (Gardener `Worker`, MCM
//! `MachineClass`) through `DynamicObject`, plus the deterministic digest used
//! wherever a hash ends up in a resource name.

use kube::discovery::ApiResource;

/// Irregular plurals for kinds we address dynamically
const KIND_PLURALS: &[(&str, &str)] = &[("machineclass", "machineclasses")];

/// Parse API version into (group, version)
///
/// `"machine.sapcloud.io/v1alpha1"` becomes `("machine.sapcloud.io", "v1alpha1")`,
/// core versions like `"v1"` have an empty group.
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an `ApiResource` from an explicit apiVersion and kind
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Lowercase plural resource name for a kind
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    for (singular, plural) in KIND_PLURALS {
        if *singular == lower {
            return (*plural).to_string();
        }
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Hex-encoded SHA-256 of `input`, truncated to `len` characters.
///
/// Uses SHA-256 rather than `DefaultHasher`, which is NOT stable across Rust
/// releases; the result ends up in resource names and must survive upgrades.
pub fn sha256_hex_prefix(input: &[u8], len: usize) -> String {
    use aws_lc_rs::digest;
    use std::fmt::Write;

    let hash = digest::digest(&digest::SHA256, input);
    let mut out = hash
        .as_ref()
        .iter()
        .fold(String::with_capacity(64), |mut s, b| {
            let _ = write!(s, "{:02x}", b);
            s
        });
    out.truncate(len);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grouped_and_core_versions() {
        assert_eq!(
            parse_api_version("machine.sapcloud.io/v1alpha1"),
            ("machine.sapcloud.io".to_string(), "v1alpha1".to_string())
        );
        assert_eq!(
            parse_api_version("v1"),
            (String::new(), "v1".to_string())
        );
    }

    #[test]
    fn builds_machine_class_resource() {
        let ar = build_api_resource("machine.sapcloud.io/v1alpha1", "MachineClass");
        assert_eq!(ar.group, "machine.sapcloud.io");
        assert_eq!(ar.version, "v1alpha1");
        assert_eq!(ar.plural, "machineclasses");

        let ar = build_api_resource("extensions.gardener.cloud/v1alpha1", "Worker");
        assert_eq!(ar.plural, "workers");
    }

    #[test]
    fn pluralizes_regular_kinds() {
        assert_eq!(pluralize_kind("Policy"), "policies");
        assert_eq!(pluralize_kind("Gateway"), "gateways");
        assert_eq!(pluralize_kind("Ingress"), "ingresses");
    }

    #[test]
    fn sha256_prefix_is_stable() {
        // echo -n "" | sha256sum
        assert_eq!(sha256_hex_prefix(b"", 8), "e3b0c442");
        assert_eq!(sha256_hex_prefix(b"", 64).len(), 64);
        assert_eq!(sha256_hex_prefix(b"abc", 5), "ba781");
        assert_ne!(sha256_hex_prefix(b"a", 5), sha256_hex_prefix(b"b", 5));
    }
}
