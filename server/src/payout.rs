use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rust_decimal::Decimal;
use thiserror::Error;

const WEI_DECIMALS: u32 = 18;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PayoutError {
    #[error("invalid amount `{0}`")]
    InvalidAmount(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("invalid wallet address `{0}`")]
    InvalidAddress(String),

    #[error("session key is malformed")]
    InvalidSessionKey,
}

/// Parses a positive decimal ether amount ("0.1") with at most 18 fraction
/// digits. Signs, exponents and digit separators are rejected.
pub fn parse_amount(amount: &str) -> Result<Decimal, PayoutError> {
    let invalid = || PayoutError::InvalidAmount(amount.to_string());

    let trimmed = amount.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }

    let value = Decimal::from_str(trimmed).map_err(|_| invalid())?;
    if value.scale() > WEI_DECIMALS {
        return Err(invalid());
    }
    if value.is_zero() {
        return Err(PayoutError::ZeroAmount);
    }
    Ok(value)
}

/// Parses a decimal ether amount into wei.
pub fn parse_ether(amount: &str) -> Result<u128, PayoutError> {
    let invalid = || PayoutError::InvalidAmount(amount.to_string());

    let value = parse_amount(amount)?;
    let mantissa = u128::try_from(value.mantissa()).map_err(|_| invalid())?;

    mantissa
        .checked_mul(10u128.pow(WEI_DECIMALS - value.scale()))
        .ok_or_else(invalid)
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value
        .strip_prefix("0x")
        .map(|digits| digits.len() == len && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

pub fn is_wallet_address(value: &str) -> bool {
    is_hex_of_len(value, 40)
}

pub fn is_session_key(value: &str) -> bool {
    is_hex_of_len(value, 64)
}

/// Lowercased form used as the identity of a wallet.
pub fn normalize_address(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// `0x1234...abcd`
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub tx_hash: String,
    pub wei: u128,
}

/// Stands in for the wallet transfer signed by a campaign's session key.
///
/// Inputs are validated the way a real transfer would need them, then the
/// confirmation is simulated and a random transaction hash is returned.
/// Nothing is broadcast.
pub struct SimulatedPayout {
    confirmation: Duration,
}

impl SimulatedPayout {
    pub fn new(confirmation: Duration) -> Self {
        Self { confirmation }
    }

    pub async fn send(
        &self,
        session_key: &str,
        to: &str,
        amount: &str,
    ) -> Result<PayoutReceipt, PayoutError> {
        if !is_session_key(session_key) {
            return Err(PayoutError::InvalidSessionKey);
        }
        if !is_wallet_address(to) {
            return Err(PayoutError::InvalidAddress(to.to_string()));
        }
        let wei = parse_ether(amount)?;

        let mut hash = [0u8; 32];
        StdRng::from_entropy().fill_bytes(&mut hash);
        let tx_hash = format!("0x{}", hex::encode(hash));

        tracing::info!(to, amount, wei = %wei, "signing payout with session key");

        if !self.confirmation.is_zero() {
            tokio::time::sleep(self.confirmation).await;
        }

        tracing::info!(%tx_hash, "payout confirmed");

        Ok(PayoutReceipt { tx_hash, wei })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

    #[test]
    fn parses_ether_amounts() {
        assert_eq!(parse_ether("1"), Ok(1_000_000_000_000_000_000));
        assert_eq!(parse_ether("0.1"), Ok(100_000_000_000_000_000));
        assert_eq!(parse_ether(" 2.50 "), Ok(2_500_000_000_000_000_000));
        assert_eq!(
            parse_ether("9007199254740993"),
            Ok(9_007_199_254_740_993_000_000_000_000_000_000)
        );
        assert_eq!(parse_ether("0.000000000000000001"), Ok(1));
    }

    #[test]
    fn rejects_bad_ether_amounts() {
        assert_eq!(parse_ether("0"), Err(PayoutError::ZeroAmount));
        assert_eq!(parse_ether("0.00"), Err(PayoutError::ZeroAmount));
        assert!(matches!(parse_ether(""), Err(PayoutError::InvalidAmount(_))));
        assert!(matches!(parse_ether("-1"), Err(PayoutError::InvalidAmount(_))));
        assert!(matches!(parse_ether("1e3"), Err(PayoutError::InvalidAmount(_))));
        assert!(matches!(parse_ether("1_000"), Err(PayoutError::InvalidAmount(_))));
        assert!(matches!(parse_ether("1.2.3"), Err(PayoutError::InvalidAmount(_))));
        assert!(matches!(
            parse_ether("0.0000000000000000001"),
            Err(PayoutError::InvalidAmount(_))
        ));
    }

    #[test]
    fn validates_hex_identifiers() {
        assert!(is_wallet_address(WALLET));
        assert!(!is_wallet_address("52908400098527886e0f7030069857d2e4169ee7"));
        assert!(!is_wallet_address("0x1234"));
        assert!(is_session_key(KEY));
        assert!(!is_session_key(WALLET));
    }

    #[test]
    fn shortens_addresses_for_display() {
        assert_eq!(short_address(WALLET), "0x5290...9ee7");
        assert_eq!(short_address("0x1234"), "0x1234");
    }

    #[tokio::test]
    async fn simulated_payout_returns_a_transaction_hash() {
        let payout = SimulatedPayout::new(Duration::ZERO);

        let receipt = payout.send(KEY, WALLET, "0.1").await.unwrap();

        assert!(is_session_key(&receipt.tx_hash));
        assert_eq!(receipt.wei, 100_000_000_000_000_000);
    }

    #[tokio::test]
    async fn simulated_payout_requires_a_session_key() {
        let payout = SimulatedPayout::new(Duration::ZERO);

        let err = payout.send("0xdead", WALLET, "0.1").await.unwrap_err();

        assert_eq!(err, PayoutError::InvalidSessionKey);
    }
}
