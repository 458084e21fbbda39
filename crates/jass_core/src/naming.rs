//! Index naming guard.
//!
//! Every create and delete this layer sends to the engine passes through
//! these checks first. They are pure and never touch the engine.

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn is_word(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_word_char)
}

fn valid_delete_entry(entry: &str, prefix: &str) -> bool {
    entry.starts_with(prefix) && is_word(entry)
}

/// Returns true if `name` may be created by a class of a tenant.
///
/// The name must start with `tenant_id + class_prefix`, be strictly longer
/// than that prefix, and contain only word characters and `-`.
#[must_use]
pub fn valid_for_create(name: &str, tenant_id: &str, class_prefix: &str) -> bool {
    let prefix_len = tenant_id.len() + class_prefix.len();
    name.len() > prefix_len
        && name.starts_with(tenant_id)
        && name[tenant_id.len()..].starts_with(class_prefix)
        && is_word(name)
}

/// Returns true if `selector` may be deleted by a class of a tenant.
///
/// A single entry may end with one `*`. A comma separated list may not
/// contain any wildcard, and every entry must be non-empty. Each entry
/// must start with `tenant_id + class_prefix`.
#[must_use]
pub fn valid_for_delete(selector: &str, tenant_id: &str, class_prefix: &str) -> bool {
    let prefix = format!("{tenant_id}{class_prefix}");
    if selector.contains(',') {
        if selector.contains('*') {
            return false;
        }
        return selector
            .split(',')
            .all(|entry| valid_delete_entry(entry, &prefix));
    }
    let entry = selector.strip_suffix('*').unwrap_or(selector);
    valid_delete_entry(entry, &prefix)
}

/// Turns an arbitrary string into an id: characters outside `[\w-]` are
/// dropped and the rest lowercased.
#[must_use]
pub fn string_to_id(value: &str) -> String {
    value
        .chars()
        .filter(|c| is_word_char(*c))
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT: &str = "env_";
    const CLASS: &str = "class_";

    #[test]
    fn delete_accepts() {
        assert!(valid_for_delete("env_CLASS_A", TENANT, "CLASS_"));
        for name in [
            "env_class_*",
            "env_class_index1_-a",
            "env_class_",
            "env_class_index1,env_class_index2",
        ] {
            assert!(valid_for_delete(name, TENANT, CLASS), "{name}");
        }
    }

    #[test]
    fn delete_rejects() {
        for name in [
            "env_class_index%$,env_class_index2",
            "envX_class_index1",
            "env_classY_index1",
            "env_class_index,env_class_index2*",
            "env_class_a,",
            "*env_class_a",
            "env_class_a*b",
            "",
        ] {
            assert!(!valid_for_delete(name, TENANT, CLASS), "{name}");
        }
    }

    #[test]
    fn create_accepts() {
        assert!(valid_for_create("env_class_index1_-a", TENANT, CLASS));
        assert!(valid_for_create("env_CLASS_A", TENANT, "CLASS_"));
    }

    #[test]
    fn create_rejects() {
        for name in [
            "env_class_*",
            "env_class_",
            "env_class_a,",
            "*env_class_a",
            "env_class_a b",
            "other_class_a",
        ] {
            assert!(!valid_for_create(name, TENANT, CLASS), "{name}");
        }
    }

    #[test]
    fn ids_from_strings() {
        assert_eq!(string_to_id("My Corpus #1"), "mycorpus1");
        assert_eq!(string_to_id("a-b_C"), "a-b_c");
        assert_eq!(string_to_id("%$"), "");
    }
}
