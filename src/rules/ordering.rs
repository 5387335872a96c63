// src/rules/ordering.rs
//
// Ordenação manual (tarefas, grupos e itens de estoque).

use std::collections::HashSet;
use uuid::Uuid;

use crate::rules::RuleError;

/// Próxima posição: max + 1, com "nenhuma linha" valendo -1 (a primeira fica em 0).
pub fn next_sort_order(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(-1) + 1
}

/// Valida uma reordenação: a lista enviada precisa ser exatamente o conjunto atual.
/// Retorna os pares (id, nova posição).
pub fn plan_reorder(
    field: &'static str,
    existing: &[Uuid],
    submitted: &[Uuid],
) -> Result<Vec<(Uuid, i32)>, RuleError> {
    let submitted_set: HashSet<Uuid> = submitted.iter().copied().collect();
    if submitted_set.len() != submitted.len() {
        return Err(RuleError::new(field, "reorder_duplicates"));
    }

    let existing_set: HashSet<Uuid> = existing.iter().copied().collect();
    if existing_set != submitted_set {
        return Err(RuleError::new(field, "reorder_mismatch"));
    }

    Ok(submitted
        .iter()
        .enumerate()
        .map(|(position, id)| (*id, position as i32))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_gets_zero() {
        assert_eq!(next_sort_order(None), 0);
        assert_eq!(next_sort_order(Some(4)), 5);
    }

    #[test]
    fn reorder_assigns_positions_in_submitted_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let plan = plan_reorder("task_ids", &[a, b, c], &[c, a, b]).unwrap();
        assert_eq!(plan, vec![(c, 0), (a, 1), (b, 2)]);
    }

    #[test]
    fn omitting_an_existing_id_is_rejected() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let err = plan_reorder("task_ids", &[a, b], &[a]).unwrap_err();
        assert_eq!(err.code, "reorder_mismatch");
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let a = Uuid::new_v4();
        let err = plan_reorder("task_ids", &[a], &[a, Uuid::new_v4()]).unwrap_err();
        assert_eq!(err.code, "reorder_mismatch");
    }

    #[test]
    fn duplicates_are_rejected() {
        let a = Uuid::new_v4();
        let err = plan_reorder("task_ids", &[a], &[a, a]).unwrap_err();
        assert_eq!(err.code, "reorder_duplicates");
    }

    #[test]
    fn empty_list_is_fine_when_nothing_exists() {
        assert!(plan_reorder("task_ids", &[], &[]).unwrap().is_empty());
    }
}
