//! Proxy and auxiliary service drift rules.

use super::{Drift, ensure_eq};
use dockerkit::{PortBinding, RuntimeContainer};

/// Proxy: image and published ports.
pub fn proxy_matches(image: &str, ports: &[PortBinding], container: &RuntimeContainer) -> Drift {
    let check = || -> Result<(), String> {
        ensure_eq("image", &container.image, image)?;
        let mut expected = ports.to_vec();
        expected.sort();
        if container.ports != expected {
            return Err("published ports changed".to_string());
        }
        Ok(())
    };
    check().into()
}

/// Service: image, plus any variables that must carry exact values.
pub fn service_matches(
    image: &str,
    required_env: &[(String, String)],
    container: &RuntimeContainer,
) -> Drift {
    let check = || -> Result<(), String> {
        ensure_eq("image", &container.image, image)?;
        for (key, expected) in required_env {
            ensure_eq(key, container.env_var(key).unwrap_or_default(), expected)?;
        }
        Ok(())
    };
    check().into()
}
