//! Naming guard checks.

use jass_core::naming::{valid_for_create, valid_for_delete};

/// Checks `name` for creation, or as a delete selector when `delete` is
/// set. Returns the verdict and the line to print.
pub fn run(name: &str, tenant: &str, class: &str, delete: bool) -> (bool, String) {
    let (valid, action) = if delete {
        (valid_for_delete(name, tenant, class), "delete")
    } else {
        (valid_for_create(name, tenant, class), "create")
    };
    let verdict = if valid { "valid" } else { "invalid" };
    (valid, format!("{verdict} for {action}: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_delete_verdicts() {
        assert_eq!(
            run("acme_dd_docs_type", "acme", "_dd_", false),
            (true, "valid for create: acme_dd_docs_type".to_string())
        );
        assert!(!run("acme_dd_docs_*", "acme", "_dd_", false).0);
        assert!(run("acme_dd_docs_*", "acme", "_dd_", true).0);
        assert!(!run("acme_dd_a*,acme_dd_b", "acme", "_dd_", true).0);
        assert!(!run("other_dd_docs", "acme", "_dd_", true).0);
    }
}
