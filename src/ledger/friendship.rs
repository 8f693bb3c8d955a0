//! Sign convention for the per-friendship running balance.
//!
//! `total_owed` is stored from the requester's point of view: a positive value
//! means the recipient owes the requester, a negative value the reverse.

use super::money::Cents;

/// Change applied to `total_owed` when an expense of `amount` paid by `payer_id`
/// is recorded. Settling the same expense applies the negation.
pub fn expense_delta(requester_id: &str, payer_id: &str, amount: Cents) -> Cents {
    if payer_id == requester_id {
        amount
    } else {
        -amount
    }
}

/// Balance as seen by `viewer_id`. Positive means the friend owes the viewer.
pub fn balance_for(viewer_id: &str, requester_id: &str, total_owed: Cents) -> Cents {
    if viewer_id == requester_id {
        total_owed
    } else {
        -total_owed
    }
}

/// What `total_owed` must equal given the `(payer_id, amount)` of every
/// unsettled expense between the pair.
pub fn expected_total_owed<'a, I>(requester_id: &str, unsettled: I) -> Cents
where
    I: IntoIterator<Item = (&'a str, Cents)>,
{
    unsettled
        .into_iter()
        .map(|(payer_id, amount)| expense_delta(requester_id, payer_id, amount))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_paid_means_recipient_owes() {
        let delta = expense_delta("alice", "alice", 1500);
        assert_eq!(delta, 1500);
        assert_eq!(balance_for("alice", "alice", delta), 1500);
        assert_eq!(balance_for("bob", "alice", delta), -1500);
    }

    #[test]
    fn test_recipient_paid_means_requester_owes() {
        let delta = expense_delta("alice", "bob", 700);
        assert_eq!(delta, -700);
        assert_eq!(balance_for("bob", "alice", delta), 700);
    }

    #[test]
    fn test_settlement_reverses_expense() {
        let recorded = expense_delta("alice", "bob", 700);
        let total = recorded - expense_delta("alice", "bob", 700);
        assert_eq!(total, 0);
    }

    #[test]
    fn test_expected_total_owed() {
        let unsettled = vec![("alice", 1000), ("bob", 250), ("alice", 5)];
        assert_eq!(expected_total_owed("alice", unsettled), 755);
        assert_eq!(expected_total_owed("alice", Vec::<(&str, Cents)>::new()), 0);
    }
}
