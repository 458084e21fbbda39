//! Tenant environments.

use crate::config::Settings;
use crate::connection::ConnectionProvider;
use crate::directory::DirectoryRegistry;
use crate::error::{CoreError, CoreResult};
use crate::schema::SchemaRegistry;
use std::sync::Arc;
use tracing::info;

/// Everything one tenant owns: its directory registry and its schema
/// registry.
#[derive(Debug)]
pub struct TenantEnvironment {
    tenant_id: String,
    directories: DirectoryRegistry,
    schemas: SchemaRegistry,
}

impl TenantEnvironment {
    fn handles(tenant_id: &str, settings: &Settings, conn: Arc<ConnectionProvider>) -> Self {
        let settings = settings.clone().tenant_id(tenant_id);
        Self {
            tenant_id: tenant_id.to_string(),
            directories: DirectoryRegistry::new(conn.clone(), &settings),
            schemas: SchemaRegistry::new(conn, &settings),
        }
    }

    /// Creates both registries of `tenant_id`. Existing ones are kept.
    ///
    /// # Errors
    ///
    /// `InvalidName` if the tenant id produces unsafe index names, or
    /// engine errors.
    pub fn provision(
        tenant_id: &str,
        settings: &Settings,
        conn: Arc<ConnectionProvider>,
    ) -> CoreResult<Self> {
        let env = Self::handles(tenant_id, settings, conn);
        env.directories.create()?;
        env.schemas.create()?;
        info!(tenant = tenant_id, "tenant provisioned");
        Ok(env)
    }

    /// Attaches to a provisioned tenant.
    ///
    /// # Errors
    ///
    /// `NotFound` if either registry is missing.
    pub fn open(
        tenant_id: &str,
        settings: &Settings,
        conn: Arc<ConnectionProvider>,
    ) -> CoreResult<Self> {
        let env = Self::handles(tenant_id, settings, conn);
        if !env.directories.exists()? || !env.schemas.exists()? {
            return Err(CoreError::not_found("tenant", tenant_id));
        }
        Ok(env)
    }

    /// Tenant id.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The directory registry.
    #[must_use]
    pub fn directories(&self) -> &DirectoryRegistry {
        &self.directories
    }

    /// The schema registry.
    #[must_use]
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Deletes every directory and both registries.
    ///
    /// Both registries are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// `DeleteFailed` listing every failure.
    pub fn teardown(self) -> CoreResult<()> {
        let mut failures = Vec::new();
        match self.directories.delete() {
            Ok(()) => {}
            Err(CoreError::DeleteFailed { failures: steps }) => failures.extend(steps),
            Err(err) => failures.push(err.to_string()),
        }
        if let Err(err) = self.schemas.delete() {
            failures.push(err.to_string());
        }
        if failures.is_empty() {
            info!(tenant = %self.tenant_id, "tenant torn down");
            Ok(())
        } else {
            Err(CoreError::DeleteFailed { failures })
        }
    }
}
