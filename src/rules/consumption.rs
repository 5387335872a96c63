// src/rules/consumption.rs
//
// Movimentação de estoque: consumo automático por viagem e ajustes manuais.
// Toda mudança vira um `StockChange` coerente: after = before + delta, after >= 0.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::rules::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub delta: i32,
    pub before_qty: i32,
    pub after_qty: i32,
}

/// Unidades consumidas em `hours` horas, arredondadas (meio para o par).
pub fn rounded_consumption(hours: Decimal, consume_per_hour: Decimal) -> i64 {
    (hours * consume_per_hour)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Consumo de uma viagem sobre um item com auto consumo.
/// `None` quando nada é consumido (taxa <= 0 ou arredondou para zero).
/// A quantidade nunca fica negativa: o delta real pode ser menor que o desejado.
pub fn trip_consumption(
    hours: Decimal,
    consume_per_hour: Decimal,
    current_quantity: i32,
) -> Option<StockChange> {
    if consume_per_hour <= Decimal::ZERO {
        return None;
    }

    let wanted_delta = -rounded_consumption(hours, consume_per_hour);
    if wanted_delta >= 0 {
        return None;
    }

    let before_qty = current_quantity.max(0);
    let after_qty = (i64::from(before_qty) + wanted_delta).max(0) as i32;

    Some(StockChange {
        delta: after_qty - before_qty,
        before_qty,
        after_qty,
    })
}

/// Ajuste manual com delta assinado. Estoque negativo é rejeitado (não é truncado).
pub fn manual_adjustment(current_quantity: i32, delta: i32) -> Result<StockChange, RuleError> {
    if delta == 0 {
        return Err(RuleError::new("delta", "zero_delta"));
    }
    let after = i64::from(current_quantity) + i64::from(delta);
    if after < 0 {
        return Err(RuleError::new("delta", "negative_stock"));
    }
    let after_qty = i32::try_from(after).map_err(|_| RuleError::new("delta", "range"))?;

    Ok(StockChange {
        delta,
        before_qty: current_quantity,
        after_qty,
    })
}

/// Reconciliação de conferência: leva o estoque até a quantidade contada.
/// `None` quando já bate.
pub fn reconcile_to_count(current_quantity: i32, counted: i32) -> Option<StockChange> {
    let counted = counted.max(0);
    if counted == current_quantity {
        return None;
    }
    Some(StockChange {
        delta: counted - current_quantity,
        before_qty: current_quantity,
        after_qty: counted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn four_hours_at_one_and_a_half_consumes_six() {
        let change = trip_consumption(dec("4"), dec("1.5"), 10).unwrap();
        assert_eq!(
            change,
            StockChange { delta: -6, before_qty: 10, after_qty: 4 }
        );
    }

    #[test]
    fn consumption_clamps_at_zero() {
        let change = trip_consumption(dec("4"), dec("1.5"), 3).unwrap();
        assert_eq!(
            change,
            StockChange { delta: -3, before_qty: 3, after_qty: 0 }
        );
    }

    #[test]
    fn empty_stock_still_records_a_zero_change() {
        let change = trip_consumption(dec("4"), dec("1.5"), 0).unwrap();
        assert_eq!(change.delta, 0);
        assert_eq!(change.after_qty, 0);
    }

    #[test]
    fn consumption_rounding_to_zero_is_skipped() {
        assert_eq!(trip_consumption(dec("0.0001"), dec("1"), 10), None);
        assert_eq!(trip_consumption(dec("1"), dec("0.4"), 10), None);
    }

    #[test]
    fn zero_or_negative_rate_is_skipped() {
        assert_eq!(trip_consumption(dec("10"), dec("0"), 10), None);
        assert_eq!(trip_consumption(dec("10"), dec("-1"), 10), None);
    }

    #[test]
    fn midpoints_round_half_to_even() {
        assert_eq!(rounded_consumption(dec("1"), dec("2.5")), 2);
        assert_eq!(rounded_consumption(dec("1"), dec("3.5")), 4);
        assert_eq!(rounded_consumption(dec("1"), dec("0.5")), 0);
    }

    #[test]
    fn keeps_four_decimal_places_of_precision() {
        // 3.3333 * 3 = 9.9999 -> 10
        assert_eq!(rounded_consumption(dec("3.3333"), dec("3")), 10);
        // 0.0001 * 15000 = 1.5 -> 2
        assert_eq!(rounded_consumption(dec("0.0001"), dec("15000")), 2);
    }

    #[test]
    fn manual_adjustment_is_consistent() {
        let change = manual_adjustment(5, -2).unwrap();
        assert_eq!(change.after_qty, change.before_qty + change.delta);
        assert_eq!(change.after_qty, 3);
    }

    #[test]
    fn manual_adjustment_below_zero_is_rejected() {
        assert_eq!(manual_adjustment(1, -2).unwrap_err().code, "negative_stock");
        assert_eq!(manual_adjustment(1, 0).unwrap_err().code, "zero_delta");
    }

    #[test]
    fn reconcile_only_when_count_differs() {
        assert_eq!(reconcile_to_count(4, 4), None);
        assert_eq!(
            reconcile_to_count(4, 7),
            Some(StockChange { delta: 3, before_qty: 4, after_qty: 7 })
        );
    }
}
