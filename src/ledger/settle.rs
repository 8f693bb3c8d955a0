use serde::Serialize;
use std::collections::BTreeMap;

use super::money::Cents;

/// Net position per member: positive means the group owes them.
pub type Balances = BTreeMap<String, Cents>;

/// One group expense reduced to what the balance math needs.
#[derive(Clone, Debug)]
pub struct SharedExpense {
    pub payer: String,
    pub amount: Cents,
    pub shares: Vec<(String, Cents)>,
}

/// A single payment that moves money from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub from: String,
    pub to: String,
    pub amount: Cents,
}

pub fn compute_balances(expenses: &[SharedExpense]) -> Balances {
    let mut balances = Balances::new();
    for expense in expenses {
        *balances.entry(expense.payer.clone()).or_insert(0) += expense.amount;
        for (member, share) in &expense.shares {
            *balances.entry(member.clone()).or_insert(0) -= share;
        }
    }
    balances
}

// The exchanges that will be made if no simplification happens
fn naive_exchanges(expenses: &[SharedExpense]) -> Vec<Exchange> {
    let mut between_pairs: BTreeMap<(String, String), Cents> = BTreeMap::new();

    for expense in expenses {
        for (member, share) in &expense.shares {
            if *member == expense.payer || *share == 0 {
                continue;
            }
            // Keyed alphabetically so both directions of a pair net out;
            // positive means the first of the pair is owed
            let (key, amount) = if expense.payer < *member {
                ((expense.payer.clone(), member.clone()), *share)
            } else {
                ((member.clone(), expense.payer.clone()), -*share)
            };
            *between_pairs.entry(key).or_insert(0) += amount;
        }
    }

    between_pairs
        .into_iter()
        .filter(|(_, balance)| *balance != 0)
        .map(|((first, second), balance)| {
            if balance > 0 {
                Exchange { from: second, to: first, amount: balance }
            } else {
                Exchange { from: first, to: second, amount: -balance }
            }
        })
        .collect()
}

// Greedily pairs the largest debtor with the largest creditor
fn simplified_exchanges(balances: &Balances) -> Vec<Exchange> {
    let mut debtors: Vec<(String, Cents)> = Vec::new();
    let mut creditors: Vec<(String, Cents)> = Vec::new();
    for (member, balance) in balances {
        if *balance < 0 {
            debtors.push((member.clone(), -balance));
        } else if *balance > 0 {
            creditors.push((member.clone(), *balance));
        }
    }
    debtors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
    creditors.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

    let mut exchanges = Vec::new();
    while let (Some(debtor), Some(creditor)) = (debtors.last_mut(), creditors.last_mut()) {
        let amount = debtor.1.min(creditor.1);
        exchanges.push(Exchange {
            from: debtor.0.clone(),
            to: creditor.0.clone(),
            amount,
        });
        debtor.1 -= amount;
        creditor.1 -= amount;
        if debtor.1 == 0 {
            debtors.pop();
        }
        if creditor.1 == 0 {
            creditors.pop();
        }
    }
    exchanges
}

/// Payments that clear every balance in the group, using whichever of the
/// pairwise or simplified plans needs fewer transfers.
pub fn settle_up_plan(expenses: &[SharedExpense]) -> Vec<Exchange> {
    let naive = naive_exchanges(expenses);
    let simplified = simplified_exchanges(&compute_balances(expenses));

    if simplified.len() < naive.len() {
        simplified
    } else {
        naive
    }
}
