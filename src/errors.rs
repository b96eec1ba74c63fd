use crate::models::Venue;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("{venue} price unavailable: {reason}")]
    PriceUnavailable { venue: Venue, reason: String },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Contract error: {0}")]
    Contract(
        #[from]
        ethers::contract::ContractError<ethers::providers::Provider<ethers::providers::Http>>,
    ),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Decimal error: {0}")]
    Decimal(String),
}

/// Coarse classification used when an error is swallowed at the loop boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient, retried on the next iteration.
    PriceUnavailable,
    /// Trade build/sign/submit/confirm failure.
    Execution,
    /// Any other chain read failure (balances, fee level, nonce).
    Chain,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::PriceUnavailable => "price_unavailable",
            ErrorKind::Execution => "execution",
            ErrorKind::Chain => "chain",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}

impl AppError {
    pub fn price_unavailable(venue: Venue, reason: impl std::fmt::Display) -> Self {
        AppError::PriceUnavailable {
            venue,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::PriceUnavailable { .. } => ErrorKind::PriceUnavailable,
            AppError::Execution(_) | AppError::Wallet(_) => ErrorKind::Execution,
            AppError::Config(_) | AppError::Env(_) | AppError::UrlParse(_) => ErrorKind::Config,
            AppError::WebSocket(_)
            | AppError::Provider(_)
            | AppError::Contract(_)
            | AppError::SerdeJson(_)
            | AppError::Decimal(_) => ErrorKind::Chain,
        }
    }

    /// Re-classify any failure raised while building or submitting a trade.
    pub fn into_execution(self) -> Self {
        match self {
            AppError::Execution(_) => self,
            other => AppError::Execution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_unavailable_names_the_venue() {
        let err = AppError::price_unavailable(Venue::Cex, "timed out");
        assert_eq!(err.to_string(), "CEX price unavailable: timed out");
        assert_eq!(err.kind(), ErrorKind::PriceUnavailable);
    }

    #[test]
    fn wrapped_failures_become_execution_errors() {
        let err = AppError::Decimal("negative amount".into()).into_execution();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(err.to_string().contains("negative amount"), "Got: {}", err);
    }

    #[test]
    fn serde_error_is_a_chain_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AppError = serde_err.into();
        assert_eq!(err.kind(), ErrorKind::Chain);
    }
}
