use ethers::types::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Native token amounts (wei, gwei) as decimals for cost conversion.
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let value_str = value.to_string();
    let decimal_value = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    let divisor = 10u64
        .checked_pow(decimals as u32)
        .map(Decimal::from)
        .ok_or(ConversionError::Overflow)?;
    decimal_value
        .checked_div(divisor)
        .ok_or(ConversionError::Overflow)
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
}
