//! Cloud-init payload rendering

use fleet_core::traits::PayloadRenderer;
use fleet_core::{Error, Result, UserSpec};
use serde_yaml::{Mapping, Value};
use std::path::Path;

const HEADER: &str = "#cloud-config\n";

/// Renders a `#cloud-config` document per user
///
/// The optional base document is the operator's shared setup (packages,
/// run commands); each user gets their own hostname and login on top.
#[derive(Debug, Clone, Default)]
pub struct CloudConfigRenderer {
    base: Mapping,
}

impl CloudConfigRenderer {
    /// Renderer without a base document
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer on top of a YAML base document
    pub fn with_base_document(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| Error::render(format!("invalid base cloud-config: {}", e)))?;

        let base = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err(Error::render("base cloud-config must be a YAML mapping")),
        };

        Ok(Self { base })
    }

    /// Renderer on top of the base document stored at `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read userdata {}: {}", path.display(), e))
        })?;
        Self::with_base_document(&text)
    }

    fn user_entry(user: &UserSpec) -> Value {
        let mut entry = Mapping::new();
        entry.insert("name".into(), user.identity.clone().into());
        entry.insert("groups".into(), "sudo".into());
        entry.insert("shell".into(), "/bin/bash".into());
        entry.insert("sudo".into(), "ALL=(ALL) NOPASSWD:ALL".into());
        entry.insert(
            "ssh_authorized_keys".into(),
            Value::Sequence(user.authorized_keys.iter().cloned().map(Value::from).collect()),
        );
        Value::Mapping(entry)
    }
}

impl PayloadRenderer for CloudConfigRenderer {
    fn render(&self, user: &UserSpec) -> Result<String> {
        let mut doc = self.base.clone();

        doc.insert("hostname".into(), user.identity.clone().into());
        doc.insert("fqdn".into(), user.resource_name.clone().into());

        let entry = Self::user_entry(user);
        match doc.get_mut("users") {
            Some(Value::Sequence(users)) => users.push(entry),
            Some(_) => return Err(Error::render("base cloud-config `users` must be a list")),
            None => {
                doc.insert("users".into(), Value::Sequence(vec![entry]));
            }
        }

        let body = serde_yaml::to_string(&Value::Mapping(doc))
            .map_err(|e| Error::render(format!("cannot serialize cloud-config: {}", e)))?;

        Ok(format!("{}{}", HEADER, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserSpec {
        UserSpec::new("Alice", "encero.xyz", vec!["ssh-ed25519 AAAA alice".to_string()])
    }

    fn parse(rendered: &str) -> Value {
        assert!(rendered.starts_with("#cloud-config\n"));
        serde_yaml::from_str(rendered).unwrap()
    }

    #[test]
    fn renders_hostname_and_user() {
        let doc = parse(&CloudConfigRenderer::new().render(&alice()).unwrap());

        assert_eq!(doc["hostname"], Value::from("alice"));
        assert_eq!(doc["fqdn"], Value::from("alice.encero.xyz"));
        assert_eq!(doc["users"][0]["name"], Value::from("alice"));
        assert_eq!(
            doc["users"][0]["ssh_authorized_keys"][0],
            Value::from("ssh-ed25519 AAAA alice")
        );
    }

    #[test]
    fn base_document_is_kept() {
        let renderer = CloudConfigRenderer::with_base_document(
            "packages:\n  - docker.io\nusers:\n  - default\n",
        )
        .unwrap();

        let doc = parse(&renderer.render(&alice()).unwrap());

        assert_eq!(doc["packages"][0], Value::from("docker.io"));
        assert_eq!(doc["users"][0], Value::from("default"));
        assert_eq!(doc["users"][1]["name"], Value::from("alice"));
    }

    #[test]
    fn empty_base_document_is_allowed() {
        let renderer = CloudConfigRenderer::with_base_document("").unwrap();
        assert!(renderer.render(&alice()).is_ok());
    }

    #[test]
    fn non_mapping_base_is_rejected() {
        let err = CloudConfigRenderer::with_base_document("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn scalar_users_in_base_fails_rendering() {
        let renderer = CloudConfigRenderer::with_base_document("users: nobody\n").unwrap();
        assert!(matches!(renderer.render(&alice()), Err(Error::Render(_))));
    }
}
