//! Custom container drift rules.

use super::{Drift, ensure_eq, ensure_label};
use crate::identity::{CONTAINER, ENV_KEYS};
use crate::spec::CustomContainerSpec;
use dockerkit::RuntimeContainer;
use std::collections::BTreeSet;

/// Sorted, comma-joined keys of an env file, as recorded in the
/// `env-keys` label at create time.
pub fn env_keys(env: &[(String, String)]) -> String {
    let keys: BTreeSet<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
    keys.into_iter().collect::<Vec<_>>().join(",")
}

/// `env` is the env file's current contents, read by the caller.
pub fn matches(
    spec: &CustomContainerSpec,
    env: &[(String, String)],
    container: &RuntimeContainer,
) -> Drift {
    check(spec, env, container).into()
}

fn check(
    spec: &CustomContainerSpec,
    env: &[(String, String)],
    container: &RuntimeContainer,
) -> Result<(), String> {
    ensure_eq("image", &container.image, &spec.image_ref())?;
    ensure_label(container, CONTAINER, &spec.name)?;
    ensure_label(container, ENV_KEYS, &env_keys(env))?;

    for (key, expected) in env {
        match container.env_var(key) {
            Some(actual) => ensure_eq(key, actual, expected)?,
            None => return Err(format!("{key} is not set")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockerkit::Labels;

    fn spec() -> CustomContainerSpec {
        CustomContainerSpec {
            name: "search".into(),
            image: "docker.io/library/elasticsearch".into(),
            tag: "8.11.1".into(),
            ports: Vec::new(),
            volumes: Vec::new(),
            env_file: None,
        }
    }

    fn container() -> RuntimeContainer {
        RuntimeContainer {
            image: "docker.io/library/elasticsearch:8.11.1".into(),
            labels: Labels::from([(CONTAINER.to_string(), "search".to_string())]),
            env: vec!["discovery.type=single-node".into(), "PATH=/usr/bin".into()],
            ..Default::default()
        }
    }

    fn with_env_keys(mut container: RuntimeContainer, keys: &str) -> RuntimeContainer {
        container.labels.insert(ENV_KEYS.to_string(), keys.to_string());
        container
    }

    #[test]
    fn test_match_without_env_file() {
        assert!(matches(&spec(), &[], &container()).is_match());
    }

    #[test]
    fn test_env_file_contents_compared() {
        let c = with_env_keys(container(), "discovery.type");
        let env = vec![("discovery.type".to_string(), "single-node".to_string())];
        assert!(matches(&spec(), &env, &c).is_match());

        let env = vec![("discovery.type".to_string(), "multi-node".to_string())];
        assert!(!matches(&spec(), &env, &c).is_match());
    }

    #[test]
    fn test_key_added_to_env_file() {
        let c = with_env_keys(container(), "discovery.type");
        let env = vec![
            ("discovery.type".to_string(), "single-node".to_string()),
            ("ES_JAVA_OPTS".to_string(), "-Xmx1g".to_string()),
        ];
        assert!(matches(&spec(), &env, &c).reason().unwrap().contains("env-keys"));
    }

    #[test]
    fn test_key_removed_from_env_file() {
        let mut c = with_env_keys(container(), "SECRET,discovery.type");
        c.env.push("SECRET=old".into());

        let env = vec![("discovery.type".to_string(), "single-node".to_string())];
        assert!(!matches(&spec(), &env, &c).is_match());
    }

    #[test]
    fn test_env_keys_are_sorted_and_unique() {
        let env = vec![
            ("b".to_string(), "1".to_string()),
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ];
        assert_eq!(env_keys(&env), "a,b");
        assert_eq!(env_keys(&[]), "");
    }

    #[test]
    fn test_tag_drift() {
        let mut s = spec();
        s.tag = "8.12.0".into();
        assert!(!matches(&s, &[], &container()).is_match());
    }

    #[test]
    fn test_name_label_drift() {
        let mut c = container();
        c.labels.clear();
        assert!(!matches(&spec(), &[], &c).is_match());
    }
}
