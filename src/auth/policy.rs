//! Authorization policy: one decision function per protected operation
//! shape, shared by every workflow instead of inline per-endpoint checks.
//!
//! Policies are pure over the actor and the rows the caller has already
//! loaded; commands invoke them again inside their transaction so a role or
//! ownership change between check and write cannot slip through.

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::entities::{kit, return_request, seller, transfer};
use crate::errors::ServiceError;

/// Owner/admin of the given company: may create transfers and kits, accept
/// returns, receive stock.
pub fn ensure_company_manager(actor: &AuthUser, company_id: Uuid) -> Result<(), ServiceError> {
    if actor.company_id != company_id {
        return Err(ServiceError::Forbidden(
            "Actor does not belong to this company".into(),
        ));
    }
    if !actor.is_company_manager() {
        return Err(ServiceError::Forbidden(
            "Owner or admin role required".into(),
        ));
    }
    Ok(())
}

/// Account-scoped operations (quota checks): the actor's account must match.
pub fn ensure_account_member(actor: &AuthUser, account_id: Uuid) -> Result<(), ServiceError> {
    if actor.account_id != account_id {
        return Err(ServiceError::Forbidden(
            "Actor does not belong to this account".into(),
        ));
    }
    Ok(())
}

/// The acting seller identity, taken from the authenticated actor. Never
/// inferred from company membership.
pub fn acting_seller_id(actor: &AuthUser) -> Result<Uuid, ServiceError> {
    actor
        .seller_id
        .ok_or_else(|| ServiceError::Forbidden("Seller identity required".into()))
}

/// A seller row usable as a transfer/kit destination: active and owned by
/// the actor's company.
pub fn ensure_assignable_seller(actor: &AuthUser, seller: &seller::Model) -> Result<(), ServiceError> {
    if seller.company_id != actor.company_id {
        return Err(ServiceError::NotFound(format!(
            "Seller {} not found",
            seller.id
        )));
    }
    if !seller.active {
        return Err(ServiceError::ValidationError(format!(
            "Seller {} is inactive",
            seller.id
        )));
    }
    Ok(())
}

/// Only the transfer's destination seller may accept or reject it.
pub fn ensure_transfer_recipient(
    actor: &AuthUser,
    transfer: &transfer::Model,
) -> Result<(), ServiceError> {
    let seller_id = acting_seller_id(actor)?;
    if transfer.seller_id != seller_id || transfer.company_id != actor.company_id {
        return Err(ServiceError::Forbidden(
            "Transfer is addressed to a different seller".into(),
        ));
    }
    Ok(())
}

/// Only the kit's destination seller may accept or reject it.
pub fn ensure_kit_recipient(actor: &AuthUser, kit: &kit::Model) -> Result<(), ServiceError> {
    let seller_id = acting_seller_id(actor)?;
    if kit.seller_id != seller_id || kit.company_id != actor.company_id {
        return Err(ServiceError::Forbidden(
            "Kit is addressed to a different seller".into(),
        ));
    }
    Ok(())
}

/// Returns are raised by the seller who holds the stock; owners/admins may
/// raise one on a seller's behalf.
pub fn ensure_return_initiator(actor: &AuthUser, seller_id: Uuid) -> Result<(), ServiceError> {
    if actor.is_company_manager() {
        return Ok(());
    }
    if actor.seller_id == Some(seller_id) {
        return Ok(());
    }
    Err(ServiceError::Forbidden(
        "Only the holding seller or a company manager may raise this return".into(),
    ))
}

/// Return acceptance/rejection is a company-side decision on a return
/// raised within the actor's company.
pub fn ensure_return_processor(
    actor: &AuthUser,
    ret: &return_request::Model,
) -> Result<(), ServiceError> {
    ensure_company_manager(actor, ret.company_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::transfer::TransferStatus;
    use crate::entities::user::UserRole;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rstest::rstest;

    fn actor(role: UserRole, company_id: Uuid, seller_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id,
            account_id: Uuid::new_v4(),
            seller_id,
            role,
            token_id: "jti".into(),
        }
    }

    #[rstest]
    #[case(UserRole::Owner, true)]
    #[case(UserRole::Admin, true)]
    #[case(UserRole::Seller, false)]
    fn company_manager_requires_owner_or_admin(#[case] role: UserRole, #[case] allowed: bool) {
        let company_id = Uuid::new_v4();
        let result = ensure_company_manager(&actor(role, company_id, None), company_id);
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn company_manager_rejects_foreign_company() {
        let result = ensure_company_manager(
            &actor(UserRole::Owner, Uuid::new_v4(), None),
            Uuid::new_v4(),
        );
        assert_matches!(result, Err(ServiceError::Forbidden(_)));
    }

    #[test]
    fn transfer_recipient_must_match_acting_seller() {
        let company_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let transfer = transfer::Model {
            id: Uuid::new_v4(),
            company_id,
            seller_id,
            created_by: Uuid::new_v4(),
            status: TransferStatus::Created,
            total_items: 1,
            notes: None,
            rejection_reason: None,
            created_at: Utc::now(),
            processed_at: None,
        };

        let recipient = actor(UserRole::Seller, company_id, Some(seller_id));
        assert!(ensure_transfer_recipient(&recipient, &transfer).is_ok());

        let other = actor(UserRole::Seller, company_id, Some(Uuid::new_v4()));
        assert_matches!(
            ensure_transfer_recipient(&other, &transfer),
            Err(ServiceError::Forbidden(_))
        );

        let no_seller_identity = actor(UserRole::Admin, company_id, None);
        assert_matches!(
            ensure_transfer_recipient(&no_seller_identity, &transfer),
            Err(ServiceError::Forbidden(_))
        );
    }

    #[test]
    fn return_initiator_allows_manager_or_holding_seller() {
        let company_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();

        assert!(ensure_return_initiator(
            &actor(UserRole::Admin, company_id, None),
            seller_id
        )
        .is_ok());
        assert!(ensure_return_initiator(
            &actor(UserRole::Seller, company_id, Some(seller_id)),
            seller_id
        )
        .is_ok());
        assert_matches!(
            ensure_return_initiator(
                &actor(UserRole::Seller, company_id, Some(Uuid::new_v4())),
                seller_id
            ),
            Err(ServiceError::Forbidden(_))
        );
    }
}
