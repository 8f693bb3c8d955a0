use super::money::Cents;
use crate::error::AppError;

/// Split `total` into `parts` shares that differ by at most one cent and sum
/// exactly to `total`. Earlier shares absorb the remainder.
pub fn split_evenly(total: Cents, parts: usize) -> Result<Vec<Cents>, AppError> {
    if parts == 0 {
        return Err(AppError::Validation(
            "Cannot split an amount between zero people".to_string(),
        ));
    }
    if total < 0 {
        return Err(AppError::Validation("Cannot split a negative amount".to_string()));
    }

    let parts_i = parts as Cents;
    let base = total / parts_i;
    let remainder = (total % parts_i) as usize;

    Ok((0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        assert_eq!(split_evenly(900, 3).unwrap(), vec![300, 300, 300]);
    }

    #[test]
    fn test_remainder_goes_to_first_shares() {
        let shares = split_evenly(1000, 3).unwrap();
        assert_eq!(shares, vec![334, 333, 333]);
        assert_eq!(shares.iter().sum::<Cents>(), 1000);
    }

    #[test]
    fn test_fewer_cents_than_people() {
        assert_eq!(split_evenly(2, 4).unwrap(), vec![1, 1, 0, 0]);
        assert_eq!(split_evenly(0, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_zero_people_rejected() {
        assert!(matches!(split_evenly(100, 0), Err(AppError::Validation(_))));
    }
}
