//! Database drift rules.
//!
//! The engine label is never compared: mysql and mariadb share the `mysql`
//! compatibility class, and only the image check sees an engine swap.

use super::{Drift, ensure_eq, ensure_label};
use crate::identity::DATABASE_COMPATIBILITY;
use crate::spec::DatabaseSpec;
use dockerkit::{PortBinding, RuntimeContainer};

pub fn image(db: &DatabaseSpec) -> String {
    format!("docker.io/library/{}:{}", db.engine, db.version)
}

pub fn port_binding(db: &DatabaseSpec) -> PortBinding {
    PortBinding::new(db.port, db.engine.container_port())
}

pub fn matches(db: &DatabaseSpec, container: &RuntimeContainer) -> Drift {
    check(db, container).into()
}

fn check(db: &DatabaseSpec, container: &RuntimeContainer) -> Result<(), String> {
    ensure_eq("image", &container.image, &image(db))?;
    ensure_label(container, DATABASE_COMPATIBILITY, db.engine.compatibility())?;

    let expected = port_binding(db);
    if container.ports != [expected] {
        let actual: Vec<String> = container.ports.iter().map(ToString::to_string).collect();
        return Err(format!(
            "ports are [{}], want [{expected}]",
            actual.join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DATABASE_ENGINE;
    use crate::spec::DatabaseEngine;
    use dockerkit::Labels;

    fn container(db: &DatabaseSpec, compatibility: &str, engine_label: &str) -> RuntimeContainer {
        RuntimeContainer {
            image: image(db),
            labels: Labels::from([
                (DATABASE_COMPATIBILITY.to_string(), compatibility.to_string()),
                (DATABASE_ENGINE.to_string(), engine_label.to_string()),
            ]),
            ports: vec![port_binding(db)],
            running: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_match() {
        let db = DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306);
        assert!(matches(&db, &container(&db, "mysql", "mysql")).is_match());
    }

    #[test]
    fn test_engine_label_is_not_compared() {
        let db = DatabaseSpec::new(DatabaseEngine::Mariadb, "10.11", 3306);
        // Same compatibility class, different engine label
        assert!(matches(&db, &container(&db, "mysql", "mysql")).is_match());
    }

    #[test]
    fn test_engine_swap_is_image_drift() {
        let mysql = DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306);
        let mariadb = DatabaseSpec::new(DatabaseEngine::Mariadb, "8.0", 3306);
        let drift = matches(&mariadb, &container(&mysql, "mysql", "mysql"));
        assert!(drift.reason().unwrap().starts_with("image"));
    }

    #[test]
    fn test_compatibility_drift() {
        let db = DatabaseSpec::new(DatabaseEngine::Postgres, "15", 5432);
        let drift = matches(&db, &container(&db, "mysql", "postgres"));
        assert!(drift.reason().unwrap().contains("database.compatibility"));
    }

    #[test]
    fn test_port_drift() {
        let db = DatabaseSpec::new(DatabaseEngine::Mysql, "8.0", 3306);
        let mut c = container(&db, "mysql", "mysql");
        c.ports = vec![PortBinding::new(3307, 3306)];
        assert!(matches(&db, &c).reason().unwrap().contains("ports"));
    }
}
