//! Desired/observed diff
//!
//! Set subtraction keyed on the resource name: a user is missing when no
//! observed instance carries exactly its resource name. An instance renamed
//! by hand is treated as unrelated.
//!
//! Raw names that normalize to the same resource name (`Alice`, `alice`,
//! ` alice `) describe one instance. Only the first of them is kept.

use crate::identity::UserSpec;
use crate::traits::ObservedInstance;
use std::collections::HashSet;
use tracing::warn;

/// Users that have no instance yet, in desired order
///
/// Each resource name appears at most once in the result.
pub fn diff(desired: &[UserSpec], observed: &[ObservedInstance]) -> Vec<UserSpec> {
    let present: HashSet<&str> = observed.iter().map(|i| i.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut missing = Vec::new();

    for user in desired {
        if !seen.insert(user.resource_name.as_str()) {
            warn!(
                "Ignoring duplicate user {:?}: {} is already requested",
                user.identity, user.resource_name
            );
            continue;
        }

        if !present.contains(user.resource_name.as_str()) {
            missing.push(user.clone());
        }
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserSpec {
        UserSpec::new(name, "encero.xyz", vec!["ssh-ed25519 KEY".to_string()])
    }

    fn instance(name: &str) -> ObservedInstance {
        ObservedInstance {
            id: format!("id-{}", name),
            name: name.to_string(),
            public_address: None,
            tags: vec!["nice-workshop".to_string()],
            status: "active".to_string(),
        }
    }

    fn identities(users: &[UserSpec]) -> Vec<&str> {
        users.iter().map(|u| u.identity.as_str()).collect()
    }

    #[test]
    fn missing_users_keep_desired_order() {
        let desired = vec![user("a"), user("b"), user("c")];
        let observed = vec![instance("b.encero.xyz")];

        assert_eq!(identities(&diff(&desired, &observed)), vec!["a", "c"]);
    }

    #[test]
    fn superset_of_observed_yields_nothing() {
        let desired = vec![user("a"), user("b")];
        let observed = vec![
            instance("b.encero.xyz"),
            instance("a.encero.xyz"),
            instance("stray.encero.xyz"),
        ];

        assert!(diff(&desired, &observed).is_empty());
    }

    #[test]
    fn renamed_instance_does_not_count() {
        let desired = vec![user("alice")];
        let observed = vec![instance("alice-old.encero.xyz"), instance("Alice.encero.xyz")];

        assert_eq!(identities(&diff(&desired, &observed)), vec!["alice"]);
    }

    #[test]
    fn users_sharing_a_resource_name_are_requested_once() {
        let desired = vec![user("Alice"), user("bob"), user(" alice "), user("alice")];

        let missing = diff(&desired, &[]);

        assert_eq!(identities(&missing), vec!["alice", "bob"]);
        assert_eq!(missing[0].resource_name, "alice.encero.xyz");
    }

    #[test]
    fn duplicate_of_an_observed_user_stays_out() {
        let desired = vec![user("bob"), user("Bob"), user("carol")];
        let observed = vec![instance("bob.encero.xyz")];

        assert_eq!(identities(&diff(&desired, &observed)), vec!["carol"]);
    }

    #[test]
    fn nothing_observed_means_everyone_is_missing() {
        let desired = vec![user("a"), user("b")];
        assert_eq!(diff(&desired, &[]).len(), 2);
    }
}
