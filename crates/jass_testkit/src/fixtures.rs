//! Test fixtures and tenant helpers.
//!
//! Provides a provisioned tenant over an in-memory engine and helpers for
//! building documents.

use jass_core::{ConnectionProvider, DocumentDirectory, Settings, TenantEnvironment};
use jass_engine::{Document, InMemoryEngine};
use serde_json::Value;
use std::sync::Arc;

/// Tenant id used by fixtures unless another is given.
pub const TEST_TENANT: &str = "jasstest";

/// A provisioned tenant over its own in-memory engine.
pub struct TestTenant {
    /// The engine, for inspection and fault injection.
    pub engine: Arc<InMemoryEngine>,
    /// The shared connection.
    pub conn: Arc<ConnectionProvider>,
    /// Settings the tenant was provisioned with.
    pub settings: Settings,
    env: TenantEnvironment,
}

impl TestTenant {
    /// Provisions [`TEST_TENANT`] with default settings.
    pub fn new() -> Self {
        Self::with_settings(Settings::default().tenant_id(TEST_TENANT))
    }

    /// Provisions `settings.tenant_id`.
    pub fn with_settings(settings: Settings) -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        let conn = Arc::new(ConnectionProvider::for_engine(engine.clone()));
        let env = TenantEnvironment::provision(&settings.tenant_id, &settings, conn.clone())
            .expect("Failed to provision test tenant");
        Self {
            engine,
            conn,
            settings,
            env,
        }
    }

    /// Creates a directory with a bound default type.
    pub fn directory(&self, id: &str) -> DocumentDirectory {
        self.env
            .directories()
            .create_directory(id, None, true)
            .expect("Failed to create test directory")
    }

    /// Consumes the fixture, returning the environment for teardown.
    pub fn into_env(self) -> TenantEnvironment {
        self.env
    }
}

impl Default for TestTenant {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestTenant {
    type Target = TenantEnvironment;

    fn deref(&self) -> &Self::Target {
        &self.env
    }
}

/// Runs a test with a freshly provisioned tenant.
///
/// # Example
///
/// ```rust,ignore
/// use jass_testkit::with_test_tenant;
///
/// #[test]
/// fn my_test() {
///     with_test_tenant(|tenant| {
///         assert!(tenant.directories().exists().unwrap());
///     });
/// }
/// ```
pub fn with_test_tenant<F, R>(f: F) -> R
where
    F: FnOnce(&TestTenant) -> R,
{
    let tenant = TestTenant::new();
    f(&tenant)
}

/// Builds a document from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixture_provisions_both_registries() {
        with_test_tenant(|tenant| {
            assert!(tenant.directories().exists().unwrap());
            assert!(tenant.schemas().exists().unwrap());
            assert_eq!(tenant.tenant_id(), TEST_TENANT);
        });
    }

    #[test]
    fn fixture_directory_has_default_type() {
        let tenant = TestTenant::new();
        let docs = tenant.directory("docs");
        assert!(docs.binding("default").unwrap().is_some());
        tenant.into_env().teardown().unwrap();
    }

    #[test]
    fn doc_accepts_objects() {
        assert_eq!(doc(json!({"a": 1})).len(), 1);
    }
}
