// src/rules/maintenance.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{models::maintenance::CadenceType, rules::RuleError};

/// Campos de cadência de uma tarefa (já resolvidos: payload ou valor salvo).
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub cadence_type: CadenceType,
    pub interval_days: Option<i32>,
    pub interval_hours: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Alterações de cadência vindas de um PATCH. `None` = não enviado;
/// `Some(None)` = limpar o campo.
#[derive(Debug, Clone, Copy, Default)]
pub struct CadencePatch {
    pub cadence_type: Option<CadenceType>,
    pub interval_days: Option<Option<i32>>,
    pub interval_hours: Option<Option<Decimal>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub next_due_at: Option<DateTime<Utc>>,
}

impl CadencePatch {
    fn touches_cadence(&self) -> bool {
        self.cadence_type.is_some()
            || self.interval_days.is_some()
            || self.interval_hours.is_some()
            || self.due_date.is_some()
    }
}

/// Maior valor que cabe em NUMERIC(14,4).
pub const MAX_INTERVAL_HOURS: Decimal = Decimal::from_parts(
    (99_999_999_999_999_u64 & 0xFFFF_FFFF) as u32,
    (99_999_999_999_999_u64 >> 32) as u32,
    0,
    false,
    4,
);

pub fn validate_cadence(cadence: &Cadence) -> Result<(), RuleError> {
    if cadence.interval_days.is_some_and(|days| days < 1) {
        return Err(RuleError::new("interval_days", "must_be_positive"));
    }
    if let Some(hours) = cadence.interval_hours {
        // 4 casas, como a coluna guarda
        let stored = hours.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
        if stored <= Decimal::ZERO {
            return Err(RuleError::new("interval_hours", "must_be_positive"));
        }
        if stored > MAX_INTERVAL_HOURS {
            return Err(RuleError::new("interval_hours", "range"));
        }
    }

    match cadence.cadence_type {
        CadenceType::Interval => {
            if cadence.interval_days.is_none() && cadence.interval_hours.is_none() {
                return Err(RuleError::new("interval_days", "interval_required"));
            }
        }
        CadenceType::SpecificDate => {
            if cadence.due_date.is_none() {
                return Err(RuleError::new("due_date", "due_date_required"));
            }
        }
    }
    Ok(())
}

/// Próximo vencimento por calendário.
/// Intervalo só em horas não tem data: o vencimento é acompanhado pelas horas de uso.
pub fn compute_next_due(cadence: &Cadence, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match cadence.cadence_type {
        CadenceType::Interval => cadence
            .interval_days
            .map(|days| from + Duration::days(i64::from(days))),
        CadenceType::SpecificDate => cadence.due_date,
    }
}

/// Criação: valida e define `next_due_at` (o explícito tem prioridade).
pub fn schedule_new_task(
    cadence: &Cadence,
    explicit_next_due: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, RuleError> {
    validate_cadence(cadence)?;
    Ok(explicit_next_due.or_else(|| compute_next_due(cadence, now)))
}

/// Atualização. Retorna `Some(novo next_due_at)` quando ele deve ser gravado.
/// Qualquer campo de cadência no PATCH revalida a combinação (valor novo ou salvo);
/// só uma troca de `cadence_type` recalcula o vencimento.
pub fn reschedule_on_update(
    stored: &Cadence,
    patch: &CadencePatch,
    now: DateTime<Utc>,
) -> Result<Option<Option<DateTime<Utc>>>, RuleError> {
    let merged = Cadence {
        cadence_type: patch.cadence_type.unwrap_or(stored.cadence_type),
        interval_days: patch.interval_days.unwrap_or(stored.interval_days),
        interval_hours: patch.interval_hours.unwrap_or(stored.interval_hours),
        due_date: patch.due_date.unwrap_or(stored.due_date),
    };
    if patch.touches_cadence() {
        validate_cadence(&merged)?;
    }

    if patch.cadence_type.is_none() {
        return Ok(patch.next_due_at.map(Some));
    }
    match patch.next_due_at {
        Some(explicit) => Ok(Some(Some(explicit))),
        None => Ok(Some(compute_next_due(&merged, now))),
    }
}

/// Conclusão registrada: rola o vencimento a partir de `performed_at`.
/// Retorna `None` quando a tarefa não tem intervalo em dias (vencimento não muda).
pub fn rollforward_after_log(
    cadence: &Cadence,
    performed_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (cadence.cadence_type, cadence.interval_days) {
        (CadenceType::Interval, Some(days)) => Some(performed_at + Duration::days(i64::from(days))),
        _ => None,
    }
}

/// Projeção por horas: (vence_em_horas, horas_restantes).
pub fn hours_projection(
    interval_hours: Option<Decimal>,
    last_completed_total_hours: Option<Decimal>,
    current_total_hours: Decimal,
) -> (Option<Decimal>, Option<Decimal>) {
    match interval_hours {
        Some(interval) => {
            let baseline = last_completed_total_hours.unwrap_or(Decimal::ZERO);
            let due_at = baseline + interval;
            (Some(due_at), Some(due_at - current_total_hours))
        }
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn interval(days: Option<i32>) -> Cadence {
        Cadence {
            cadence_type: CadenceType::Interval,
            interval_days: days,
            interval_hours: None,
            due_date: None,
        }
    }

    #[test]
    fn interval_task_without_next_due_gets_now_plus_days() {
        let next = schedule_new_task(&interval(Some(90)), None, now()).unwrap();
        assert_eq!(next, Some(now() + Duration::days(90)));
    }

    #[test]
    fn explicit_next_due_wins_on_create() {
        let explicit = now() + Duration::days(3);
        let next = schedule_new_task(&interval(Some(90)), Some(explicit), now()).unwrap();
        assert_eq!(next, Some(explicit));
    }

    #[test]
    fn interval_without_days_or_hours_is_rejected() {
        let err = schedule_new_task(&interval(None), None, now()).unwrap_err();
        assert_eq!(err, RuleError::new("interval_days", "interval_required"));
    }

    #[test]
    fn hours_only_interval_is_valid_and_has_no_calendar_due() {
        let cadence = Cadence {
            interval_hours: Some(Decimal::new(100, 0)),
            ..interval(None)
        };
        assert_eq!(schedule_new_task(&cadence, None, now()).unwrap(), None);
    }

    #[test]
    fn specific_date_requires_due_date_and_uses_it() {
        let mut cadence = Cadence {
            cadence_type: CadenceType::SpecificDate,
            interval_days: None,
            interval_hours: None,
            due_date: None,
        };
        assert_eq!(
            schedule_new_task(&cadence, None, now()).unwrap_err().code,
            "due_date_required"
        );

        let due = now() + Duration::days(10);
        cadence.due_date = Some(due);
        assert_eq!(schedule_new_task(&cadence, None, now()).unwrap(), Some(due));
    }

    #[test]
    fn switching_to_interval_falls_back_to_stored_days() {
        let stored = Cadence {
            cadence_type: CadenceType::SpecificDate,
            interval_days: Some(30),
            interval_hours: None,
            due_date: Some(now()),
        };
        let patch = CadencePatch {
            cadence_type: Some(CadenceType::Interval),
            ..Default::default()
        };
        let next = reschedule_on_update(&stored, &patch, now()).unwrap();
        assert_eq!(next, Some(Some(now() + Duration::days(30))));
    }

    #[test]
    fn switching_to_interval_without_any_interval_fails() {
        let stored = Cadence {
            cadence_type: CadenceType::SpecificDate,
            interval_days: None,
            interval_hours: None,
            due_date: Some(now()),
        };
        let patch = CadencePatch {
            cadence_type: Some(CadenceType::Interval),
            ..Default::default()
        };
        assert!(reschedule_on_update(&stored, &patch, now()).is_err());
    }

    #[test]
    fn update_without_cadence_change_only_applies_explicit_next_due() {
        let stored = interval(Some(30));
        let untouched = reschedule_on_update(&stored, &CadencePatch::default(), now()).unwrap();
        assert_eq!(untouched, None);

        let explicit = now() + Duration::days(1);
        let patch = CadencePatch {
            next_due_at: Some(explicit),
            ..Default::default()
        };
        assert_eq!(reschedule_on_update(&stored, &patch, now()).unwrap(), Some(Some(explicit)));
    }

    #[test]
    fn non_positive_intervals_are_rejected() {
        let zero_hours = Cadence {
            interval_hours: Some(Decimal::ZERO),
            ..interval(None)
        };
        assert_eq!(
            schedule_new_task(&zero_hours, None, now()).unwrap_err(),
            RuleError::new("interval_hours", "must_be_positive")
        );

        let tiny_hours = Cadence {
            interval_hours: Some(Decimal::new(4, 5)),
            ..interval(Some(30))
        };
        assert_eq!(
            schedule_new_task(&tiny_hours, None, now()).unwrap_err().field,
            "interval_hours"
        );

        let negative_days = interval(Some(-3));
        assert_eq!(
            schedule_new_task(&negative_days, None, now()).unwrap_err(),
            RuleError::new("interval_days", "must_be_positive")
        );
    }

    #[test]
    fn oversized_interval_hours_are_rejected() {
        assert_eq!(MAX_INTERVAL_HOURS.to_string(), "9999999999.9999");
        let cadence = Cadence {
            interval_hours: Some(Decimal::from(10_000_000_000_i64)),
            ..interval(None)
        };
        assert_eq!(
            schedule_new_task(&cadence, None, now()).unwrap_err(),
            RuleError::new("interval_hours", "range")
        );
    }

    #[test]
    fn clearing_the_only_interval_is_rejected() {
        let stored = interval(Some(30));
        let patch = CadencePatch {
            interval_days: Some(None),
            ..Default::default()
        };
        assert_eq!(
            reschedule_on_update(&stored, &patch, now()).unwrap_err(),
            RuleError::new("interval_days", "interval_required")
        );

        let with_hours = CadencePatch {
            interval_days: Some(None),
            interval_hours: Some(Some(Decimal::new(250, 0))),
            ..Default::default()
        };
        assert_eq!(reschedule_on_update(&stored, &with_hours, now()).unwrap(), None);
    }

    #[test]
    fn zero_hours_in_update_is_rejected() {
        let patch = CadencePatch {
            interval_hours: Some(Some(Decimal::ZERO)),
            ..Default::default()
        };
        assert_eq!(
            reschedule_on_update(&interval(Some(30)), &patch, now()).unwrap_err().code,
            "must_be_positive"
        );
    }

    #[test]
    fn log_rolls_interval_forward_from_performed_at() {
        let performed = now() - Duration::days(5);
        assert_eq!(
            rollforward_after_log(&interval(Some(90)), performed),
            Some(performed + Duration::days(90))
        );
    }

    #[test]
    fn log_does_not_move_specific_date_tasks() {
        let cadence = Cadence {
            cadence_type: CadenceType::SpecificDate,
            interval_days: Some(10),
            interval_hours: None,
            due_date: Some(now()),
        };
        assert_eq!(rollforward_after_log(&cadence, now()), None);
    }

    #[test]
    fn hour_projection_uses_baseline() {
        let (due, remaining) = hours_projection(
            Some(Decimal::new(100, 0)),
            Some(Decimal::new(250, 0)),
            Decimal::new(3105, 1),
        );
        assert_eq!(due, Some(Decimal::new(350, 0)));
        assert_eq!(remaining, Some(Decimal::new(395, 1)));
        assert_eq!(hours_projection(None, None, Decimal::ONE), (None, None));
    }
}
