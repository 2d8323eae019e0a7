//! The seed coupon set and pool loading.
//!
//! A pool is fixed for the life of the process. It is either the built-in
//! seed set or a JSON array of `{id, code, description}` objects read once at
//! start-up.

use std::collections::HashSet;

use crate::error::CouponError;
use crate::types::Coupon;

/// The built-in coupon set, in allocation order.
pub fn seed_coupons() -> Vec<Coupon> {
    vec![
        Coupon::new("1", "SAVE10", "10% off your purchase"),
        Coupon::new("2", "SAVE20", "20% off your purchase"),
        Coupon::new("3", "FREESHIP", "Free shipping on your order"),
        Coupon::new("4", "BOGO50", "Buy one get one 50% off"),
        Coupon::new("5", "WELCOME15", "15% off for new customers"),
    ]
}

/// Parse and validate a pool from a JSON array.
///
/// Any `isUsed` flags in the input are cleared so every loaded pool starts a
/// fresh round.
pub fn from_json(json: &str) -> Result<Vec<Coupon>, CouponError> {
    let mut coupons: Vec<Coupon> =
        serde_json::from_str(json).map_err(|e| CouponError::InvalidPool(e.to_string()))?;
    for coupon in &mut coupons {
        coupon.is_used = false;
    }
    validate(&coupons)?;
    Ok(coupons)
}

/// Check that a pool is non-empty, has unique ids and no blank fields.
pub fn validate(coupons: &[Coupon]) -> Result<(), CouponError> {
    if coupons.is_empty() {
        return Err(CouponError::EmptyPool);
    }
    let mut seen = HashSet::with_capacity(coupons.len());
    for (index, coupon) in coupons.iter().enumerate() {
        if coupon.id.trim().is_empty() {
            return Err(CouponError::EmptyField { field: "id", index });
        }
        if coupon.code.trim().is_empty() {
            return Err(CouponError::EmptyField { field: "code", index });
        }
        if !seen.insert(coupon.id.as_str()) {
            return Err(CouponError::DuplicateId(coupon.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_set_is_valid() {
        let seed = seed_coupons();
        assert_eq!(seed.len(), 5);
        assert!(validate(&seed).is_ok());
        assert!(seed.iter().all(|c| !c.is_used));
    }

    #[test]
    fn seed_codes_are_unique() {
        let seed = seed_coupons();
        let codes: HashSet<_> = seed.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes.len(), seed.len());
    }

    #[test]
    fn from_json_clears_used_flags() {
        let json = r#"[
            {"id": "a", "code": "A", "description": "first", "isUsed": true},
            {"id": "b", "code": "B", "description": "second"}
        ]"#;
        let pool = from_json(json).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|c| !c.is_used));
    }

    #[test]
    fn from_json_rejects_empty_array() {
        assert_eq!(from_json("[]"), Err(CouponError::EmptyPool));
    }

    #[test]
    fn from_json_rejects_duplicate_ids() {
        let json = r#"[
            {"id": "a", "code": "A", "description": ""},
            {"id": "a", "code": "B", "description": ""}
        ]"#;
        assert_eq!(from_json(json), Err(CouponError::DuplicateId("a".into())));
    }

    #[test]
    fn from_json_rejects_blank_code() {
        let json = r#"[{"id": "a", "code": "  ", "description": ""}]"#;
        assert_eq!(
            from_json(json),
            Err(CouponError::EmptyField { field: "code", index: 0 })
        );
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(matches!(
            from_json("{\"id\": 1}"),
            Err(CouponError::InvalidPool(_))
        ));
    }
}
