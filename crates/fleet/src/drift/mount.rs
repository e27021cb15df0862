//! Mount drift rules.

use super::{Drift, ensure_eq};
use crate::spec::MountSpec;
use dockerkit::RuntimeContainer;
use std::path::Path;

pub fn matches(mount: &MountSpec, container: &RuntimeContainer) -> Drift {
    check(mount, container).into()
}

fn check(mount: &MountSpec, container: &RuntimeContainer) -> Result<(), String> {
    ensure_eq("php version", container.image_tag(), &mount.php_version)?;

    let binds: Vec<_> = container.bind_mounts().collect();
    match binds.as_slice() {
        [bind] if Path::new(&bind.source) == mount.path => Ok(()),
        [bind] => Err(format!(
            "mounts {}, want {}",
            bind.source,
            mount.path.display()
        )),
        _ => Err(format!("{} bind mounts, want 1", binds.len())),
    }
}
