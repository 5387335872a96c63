// src/services/trip_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{inventory_repo::NewAdjustment, InventoryRepository, TripRepository, VesselRepository},
    middleware::tenancy::OrgContext,
    models::{
        inventory::REASON_TRIP,
        trips::{TotalHours, TripLogged, VesselTrip},
    },
    rules::{consumption::trip_consumption, RuleError},
    services::vessel_service::require_vessel,
};

pub const DEFAULT_TRIP_LIMIT: i64 = 50;
pub const MAX_TRIP_LIMIT: i64 = 200;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TRIP_LIMIT).clamp(1, MAX_TRIP_LIMIT)
}

/// Maior valor que cabe em NUMERIC(12,4).
pub const MAX_TRIP_HOURS: Decimal = Decimal::from_parts(
    (999_999_999_999_u64 & 0xFFFF_FFFF) as u32,
    (999_999_999_999_u64 >> 32) as u32,
    0,
    false,
    4,
);

/// Arredonda para 4 casas como o Postgres faria e valida o intervalo.
/// O valor devolvido é o que vai para o banco e para o cálculo de consumo.
fn normalize_hours(hours: Decimal) -> Result<Decimal, RuleError> {
    let hours = hours.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    if hours <= Decimal::ZERO {
        Err(RuleError::new("hours", "must_be_positive"))
    } else if hours > MAX_TRIP_HOURS {
        Err(RuleError::new("hours", "range"))
    } else {
        Ok(hours)
    }
}

#[derive(Clone)]
pub struct TripService {
    pool: PgPool,
    trip_repo: TripRepository,
    vessel_repo: VesselRepository,
    inventory_repo: InventoryRepository,
}

impl TripService {
    pub fn new(
        pool: PgPool,
        trip_repo: TripRepository,
        vessel_repo: VesselRepository,
        inventory_repo: InventoryRepository,
    ) -> Self {
        Self { pool, trip_repo, vessel_repo, inventory_repo }
    }

    pub async fn list(&self, ctx: &OrgContext, vessel_id: Uuid, limit: Option<i64>) -> Result<Vec<VesselTrip>, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        self.trip_repo.list(vessel_id, clamp_limit(limit)).await
    }

    /// Registra a viagem e consome o estoque dos itens com consumo automático.
    /// Tudo numa transação; os itens ficam travados (FOR UPDATE) até o commit,
    /// então viagens simultâneas na mesma embarcação não perdem baixas.
    pub async fn log_trip(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        hours: Decimal,
        logged_at: Option<DateTime<Utc>>,
        note: Option<&str>,
    ) -> Result<TripLogged, AppError> {
        let hours = normalize_hours(hours)?;

        let mut tx = self.pool.begin().await?;
        require_vessel(&self.vessel_repo, &mut *tx, ctx, vessel_id).await?;

        let trip = self
            .trip_repo
            .create(&mut *tx, vessel_id, hours, logged_at, note, ctx.user.id)
            .await?;

        let mut adjustments = Vec::new();
        let requirements = self
            .inventory_repo
            .auto_consume_requirements_for_update(&mut *tx, vessel_id)
            .await?;

        for requirement in requirements {
            let rate = requirement.consume_per_hour.unwrap_or(Decimal::ZERO);
            let Some(change) = trip_consumption(hours, rate, requirement.current_quantity) else {
                continue;
            };

            let adjustment = self
                .inventory_repo
                .insert_adjustment(
                    &mut *tx,
                    &NewAdjustment {
                        requirement_id: requirement.id,
                        reason: REASON_TRIP,
                        reference_trip_id: Some(trip.id),
                        change,
                        note: None,
                        created_by_user_id: ctx.user.id,
                    },
                )
                .await?;
            self.inventory_repo
                .set_current_quantity(&mut *tx, requirement.id, change.after_qty)
                .await?;
            adjustments.push(adjustment);
        }

        tx.commit().await?;
        tracing::info!(
            "🚤 Viagem {} ({} h) registrada na embarcação {}: {} ajuste(s) de estoque",
            trip.id,
            hours,
            vessel_id,
            adjustments.len()
        );

        Ok(TripLogged { trip, adjustments })
    }

    async fn require_trip(&self, ctx: &OrgContext, vessel_id: Uuid, trip_id: Uuid) -> Result<VesselTrip, AppError> {
        self.trip_repo
            .find_in_org(&self.pool, ctx.org_id, trip_id)
            .await?
            .filter(|trip| trip.vessel_id == vessel_id)
            .ok_or(AppError::NotFound("trip"))
    }

    /// Edição não reaplica o consumo.
    pub async fn update(
        &self,
        ctx: &OrgContext,
        vessel_id: Uuid,
        trip_id: Uuid,
        hours: Option<Decimal>,
        logged_at: Option<DateTime<Utc>>,
        note: Option<Option<&str>>,
    ) -> Result<VesselTrip, AppError> {
        let hours = hours.map(normalize_hours).transpose()?;
        self.require_trip(ctx, vessel_id, trip_id).await?;
        self.trip_repo.update(trip_id, hours, logged_at, note).await
    }

    pub async fn delete(&self, ctx: &OrgContext, vessel_id: Uuid, trip_id: Uuid) -> Result<(), AppError> {
        self.require_trip(ctx, vessel_id, trip_id).await?;
        self.trip_repo.delete(trip_id).await
    }

    pub async fn total_hours(&self, ctx: &OrgContext, vessel_id: Uuid) -> Result<TotalHours, AppError> {
        require_vessel(&self.vessel_repo, &self.pool, ctx, vessel_id).await?;
        let total_hours = self.trip_repo.total_hours(&self.pool, vessel_id).await?;
        Ok(TotalHours { vessel_id, total_hours })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_consumable, seed_vessel};

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(500)), 200);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(20)), 20);
    }

    #[test]
    fn hours_must_be_strictly_positive() {
        assert_eq!(normalize_hours(Decimal::new(1, 4)), Ok(Decimal::new(1, 4)));
        assert_eq!(normalize_hours(Decimal::ZERO), Err(RuleError::new("hours", "must_be_positive")));
        assert!(normalize_hours(Decimal::new(-5, 1)).is_err());
    }

    #[test]
    fn hours_are_rounded_to_the_stored_precision() {
        assert_eq!(normalize_hours(Decimal::new(12345, 5)), Ok(Decimal::new(1235, 4)));
        // 0.00004 vira 0 no banco
        assert_eq!(
            normalize_hours(Decimal::new(4, 5)),
            Err(RuleError::new("hours", "must_be_positive"))
        );
        assert_eq!(normalize_hours(Decimal::new(5, 5)), Ok(Decimal::new(1, 4)));
    }

    #[test]
    fn hours_must_fit_the_column() {
        assert_eq!(MAX_TRIP_HOURS.to_string(), "99999999.9999");
        assert_eq!(normalize_hours(MAX_TRIP_HOURS), Ok(MAX_TRIP_HOURS));
        assert_eq!(
            normalize_hours(Decimal::from(1_000_000_000)),
            Err(RuleError::new("hours", "range"))
        );
    }

    fn service(pool: &PgPool) -> TripService {
        TripService::new(
            pool.clone(),
            TripRepository::new(pool.clone()),
            VesselRepository::new(pool.clone()),
            InventoryRepository::new(pool.clone()),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn trip_consumes_rounded_hours_times_rate(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let requirement = seed_consumable(&pool, &vessel, 10, Decimal::new(15, 1)).await;

        let logged = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::from(4), None, Some("Sunset cruise"))
            .await
            .expect("trip");

        assert_eq!(logged.adjustments.len(), 1);
        let adjustment = &logged.adjustments[0];
        assert_eq!(adjustment.requirement_id, requirement.id);
        assert_eq!(adjustment.reason, "trip");
        assert_eq!(adjustment.reference_trip_id, Some(logged.trip.id));
        assert_eq!((adjustment.delta, adjustment.before_qty, adjustment.after_qty), (-6, 10, 4));

        let total = service(&pool).total_hours(&ctx, vessel.id).await.expect("total");
        assert_eq!(total.total_hours, Decimal::from(4));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn trip_consumption_stops_at_zero(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        seed_consumable(&pool, &vessel, 3, Decimal::new(15, 1)).await;

        let logged = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::from(4), None, None)
            .await
            .expect("trip");

        let adjustment = &logged.adjustments[0];
        assert_eq!((adjustment.delta, adjustment.before_qty, adjustment.after_qty), (-3, 3, 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn trips_of_another_vessel_are_not_found(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let logged = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::from(2), None, None)
            .await
            .expect("trip");

        let result = service(&pool).delete(&ctx, Uuid::new_v4(), logged.trip.id).await;
        assert!(matches!(result, Err(AppError::NotFound("trip"))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn smallest_stored_hour_fraction_is_accepted(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;

        let logged = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::new(1, 4), None, None)
            .await
            .expect("0.0001 h");
        assert_eq!(logged.trip.hours, Decimal::new(1, 4));

        let rounded = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::new(12345, 5), None, None)
            .await
            .expect("0.12345 h");
        assert_eq!(rounded.trip.hours, Decimal::new(1235, 4));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn out_of_range_hours_are_rule_violations(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);

        for hours in [Decimal::ZERO, Decimal::new(1, 5), Decimal::from(1_000_000_000)] {
            let result = service.log_trip(&ctx, vessel.id, hours, None, None).await;
            assert!(matches!(result, Err(AppError::RuleViolation(_))), "hours = {}", hours);
        }
        assert!(service.list(&ctx, vessel.id, None).await.expect("list").is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn failed_adjustment_rolls_back_the_trip(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let requirement = seed_consumable(&pool, &vessel, 10, Decimal::new(15, 1)).await;

        sqlx::raw_sql(
            r#"
            CREATE FUNCTION reject_adjustments() RETURNS trigger AS $$
            BEGIN
                RAISE EXCEPTION 'adjustments disabled';
            END
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER reject_adjustments BEFORE INSERT ON inventory_adjustments
            FOR EACH ROW EXECUTE FUNCTION reject_adjustments();
            "#,
        )
        .execute(&pool)
        .await
        .expect("trigger");

        let result = service(&pool).log_trip(&ctx, vessel.id, Decimal::from(4), None, None).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        assert!(service(&pool).list(&ctx, vessel.id, None).await.expect("list").is_empty());
        let stock: i32 = sqlx::query_scalar("SELECT current_quantity FROM vessel_inventory_requirements WHERE id = $1")
            .bind(requirement.id)
            .fetch_one(&pool)
            .await
            .expect("stock");
        assert_eq!(stock, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn trip_list_is_stable_between_reads(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let service = service(&pool);
        for hours in [1, 2, 3] {
            service
                .log_trip(&ctx, vessel.id, Decimal::from(hours), None, None)
                .await
                .expect("trip");
        }

        let ids = |trips: Vec<VesselTrip>| trips.into_iter().map(|t| t.id).collect::<Vec<_>>();
        let first = ids(service.list(&ctx, vessel.id, None).await.expect("first"));
        let second = ids(service.list(&ctx, vessel.id, None).await.expect("second"));
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de DATABASE_URL"]
    async fn trip_note_can_be_cleared(pool: PgPool) {
        let (ctx, vessel) = seed_vessel(&pool).await;
        let logged = service(&pool)
            .log_trip(&ctx, vessel.id, Decimal::from(2), None, Some("Fuel dock"))
            .await
            .expect("trip");

        let kept = service(&pool)
            .update(&ctx, vessel.id, logged.trip.id, Some(Decimal::from(3)), None, None)
            .await
            .expect("update");
        assert_eq!(kept.note.as_deref(), Some("Fuel dock"));

        let cleared = service(&pool)
            .update(&ctx, vessel.id, logged.trip.id, None, None, Some(None))
            .await
            .expect("clear");
        assert_eq!(cleared.note, None);
        assert_eq!(cleared.hours, Decimal::from(3));
    }
}
