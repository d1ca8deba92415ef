use sea_orm::*;
use tracing::info;

use crate::entity::{role, role_permission};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["solver", "challenge_owner", "admin", "super_admin"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Super admin: everything an admin has, plus admin role management
    ("super_admin", "challenge:create"),
    ("super_admin", "challenge:manage"),
    ("super_admin", "challenge:review"),
    ("super_admin", "challenge:delete"),
    ("super_admin", "submission:submit"),
    ("super_admin", "submission:manage"),
    ("super_admin", "submission:export"),
    ("super_admin", "user:manage"),
    ("super_admin", "user:manage_admins"),
    ("super_admin", "agency:manage"),
    ("super_admin", "log:export"),
    ("super_admin", "dashboard:view"),
    ("super_admin", "certification:decide"),
    // Admin
    ("admin", "challenge:create"),
    ("admin", "challenge:manage"),
    ("admin", "challenge:review"),
    ("admin", "challenge:delete"),
    ("admin", "submission:submit"),
    ("admin", "submission:manage"),
    ("admin", "submission:export"),
    ("admin", "user:manage"),
    ("admin", "agency:manage"),
    ("admin", "log:export"),
    ("admin", "dashboard:view"),
    ("admin", "certification:decide"),
    // Challenge owner
    ("challenge_owner", "challenge:create"),
    ("challenge_owner", "submission:export"),
    // Solver
    ("solver", "submission:submit"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Permissions granted to `role`, as stored in `role_permission`.
pub async fn permissions_for_role<C: ConnectionTrait>(
    db: &C,
    role: &str,
) -> Result<Vec<String>, DbErr> {
    let rows = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role))
        .order_by_asc(role_permission::Column::Permission)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|rp| rp.permission).collect())
}
