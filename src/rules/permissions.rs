// src/rules/permissions.rs
//
// Quem pode o quê, por cargo. A associação ACTIVE é checada antes, no tenant guard.

use crate::models::organization::OrgRole;

pub fn can_manage_vessels(role: OrgRole) -> bool {
    matches!(role, OrgRole::Admin | OrgRole::Manager)
}

pub fn can_edit_inventory(role: OrgRole) -> bool {
    matches!(role, OrgRole::Admin | OrgRole::Manager)
}

pub fn can_edit_maintenance_tasks(role: OrgRole) -> bool {
    matches!(role, OrgRole::Admin | OrgRole::Manager)
}

pub fn can_log_trips(role: OrgRole) -> bool {
    matches!(role, OrgRole::Admin | OrgRole::Manager)
}

/// Convites, cargos, desativação de membros e cobrança.
pub fn can_administer_org(role: OrgRole) -> bool {
    role == OrgRole::Admin
}

/// Conferências, logs de manutenção e comentários: qualquer membro ativo.
pub fn can_participate(_role: OrgRole) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrgRole; 3] = [OrgRole::Admin, OrgRole::Manager, OrgRole::Tech];

    #[test]
    fn tech_cannot_edit_configuration() {
        assert!(!can_manage_vessels(OrgRole::Tech));
        assert!(!can_edit_inventory(OrgRole::Tech));
        assert!(!can_edit_maintenance_tasks(OrgRole::Tech));
        assert!(!can_log_trips(OrgRole::Tech));
    }

    #[test]
    fn managers_edit_but_do_not_administer() {
        assert!(can_manage_vessels(OrgRole::Manager));
        assert!(can_log_trips(OrgRole::Manager));
        assert!(!can_administer_org(OrgRole::Manager));
    }

    #[test]
    fn only_admin_administers() {
        let admins: Vec<_> = ALL.into_iter().filter(|r| can_administer_org(*r)).collect();
        assert_eq!(admins, vec![OrgRole::Admin]);
    }

    #[test]
    fn every_role_participates() {
        assert!(ALL.into_iter().all(can_participate));
    }
}
