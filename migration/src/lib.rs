//! Database migrations for the IAM Registry.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_resource_types;
mod m2025_01_10_000002_create_resources;
mod m2025_01_10_000003_create_roles;
mod m2025_01_10_000004_create_permissions;
mod m2025_01_10_000005_create_master_catalog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_resource_types::Migration),
            Box::new(m2025_01_10_000002_create_resources::Migration),
            Box::new(m2025_01_10_000003_create_roles::Migration),
            Box::new(m2025_01_10_000004_create_permissions::Migration),
            Box::new(m2025_01_10_000005_create_master_catalog::Migration),
        ]
    }
}
