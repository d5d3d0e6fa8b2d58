use ethers::types::U256;

use crate::types::{ClientError, ClientResult};

/// 정수 금액을 토큰 최소 단위로 변환
///
/// `amount * 10^decimals`. 소수점, 음수, 256비트 초과는 설정 에러.
pub fn to_base_units(amount: &str, decimals: u32) -> ClientResult<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ClientError::Config("amount is required".to_string()));
    }
    if amount.starts_with('-') {
        return Err(ClientError::Config(format!("amount must not be negative: {}", amount)));
    }

    let whole = U256::from_dec_str(amount)
        .map_err(|e| ClientError::Config(format!("Invalid amount provided: {} ({})", amount, e)))?;

    if decimals > 77 {
        return Err(ClientError::Config(format!("unsupported token decimals: {}", decimals)));
    }

    whole
        .checked_mul(U256::exp10(decimals as usize))
        .ok_or_else(|| ClientError::Config(format!("amount overflows uint256: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_by_decimals() {
        assert_eq!(to_base_units("10", 6).unwrap(), U256::from(10_000_000u64));
        assert_eq!(to_base_units(" 1 ", 18).unwrap(), U256::exp10(18));
        assert_eq!(to_base_units("0", 6).unwrap(), U256::zero());
        assert_eq!(to_base_units("42", 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_rejects_malformed_amounts() {
        for input in ["", "   ", "-5", "1.5", "ten", "0x10"] {
            assert!(
                matches!(to_base_units(input, 6), Err(ClientError::Config(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_overflow_is_config_error() {
        let max = U256::MAX.to_string();
        assert!(matches!(to_base_units(&max, 6), Err(ClientError::Config(_))));
        assert!(matches!(to_base_units("1", 78), Err(ClientError::Config(_))));
    }
}
