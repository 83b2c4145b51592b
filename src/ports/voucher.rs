use crate::domain::voucher::Voucher;

#[mockall::automock]
#[async_trait::async_trait]
pub trait VoucherPort {
    /// Look up a voucher by its normalized code
    async fn get_voucher(&self, code: &str) -> Result<Voucher, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("voucher '{0}' does not exist")]
    VoucherDoesNotExist(String),

    /// Concrete adapter errors
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
