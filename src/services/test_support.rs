// src/services/test_support.rs
//
// Dados mínimos para os testes com banco (#[sqlx::test]).

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    db::{
        inventory_repo::NewRequirement, vessel_repo::VesselFields, InventoryRepository, OrgRepository,
        UserRepository, VesselRepository,
    },
    middleware::tenancy::OrgContext,
    models::{
        inventory::InventoryRequirement,
        organization::{MembershipStatus, OrgRole},
        vessel::Vessel,
    },
};

/// Usuário ADMIN de uma organização nova, com uma embarcação.
pub async fn seed_vessel(pool: &PgPool) -> (OrgContext, Vessel) {
    let user = UserRepository::new(pool.clone())
        .upsert_from_identity("default", "user_captain", "captain@example.com", Some("Ana"))
        .await
        .expect("user");

    let org_repo = OrgRepository::new(pool.clone());
    let org = org_repo.create_org(pool, "Blue Water Charters").await.expect("org");
    org_repo
        .create_membership(pool, org.id, user.id, OrgRole::Admin, MembershipStatus::Active)
        .await
        .expect("membership");

    let vessel = VesselRepository::new(pool.clone())
        .create(pool, org.id, "Sea Breeze", &VesselFields::default())
        .await
        .expect("vessel");

    (OrgContext { user, org_id: org.id, role: OrgRole::Admin }, vessel)
}

/// Item com consumo automático ligado.
pub async fn seed_consumable(
    pool: &PgPool,
    vessel: &Vessel,
    current_quantity: i32,
    consume_per_hour: Decimal,
) -> InventoryRequirement {
    InventoryRepository::new(pool.clone())
        .create_requirement(
            pool,
            &NewRequirement {
                vessel_id: vessel.id,
                parent_group_id: None,
                item_name: "Engine oil",
                required_quantity: 2,
                category: Some("Engine"),
                critical: false,
                notes: None,
                sort_order: 0,
                current_quantity,
                auto_consume_enabled: true,
                consume_per_hour: Some(consume_per_hour),
            },
        )
        .await
        .expect("requirement")
}
