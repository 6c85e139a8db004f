//! User list loading
//!
//! One attendee per line, `name;ssh-key`, the key part optional:
//!
//! ```text
//! # platform team
//! Alice.Smith
//! bob;ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAA... bob@laptop
//! ```

use fleet_core::{Error, RawUser, Result};
use std::path::Path;

/// Parse the contents of a user list
pub fn parse_users(text: &str) -> Result<Vec<RawUser>> {
    let mut users = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (name, key) = match line.split_once(';') {
            Some((name, key)) => (name.trim(), Some(key.trim())),
            None => (line, None),
        };

        if name.is_empty() {
            return Err(Error::config(format!(
                "user list line {}: missing user name",
                index + 1
            )));
        }

        let key = key.filter(|k| !k.is_empty()).map(String::from);
        users.push(RawUser::new(name, key));
    }

    Ok(users)
}

/// Read and parse a user list file
pub fn load_users(path: &Path) -> Result<Vec<RawUser>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("cannot read user list {}: {}", path.display(), e))
    })?;
    parse_users(&text)
}
