use std::future::Future;

use ed25519_dalek::SigningKey;

use crate::cell::{Cell, HashBytes};
use crate::error::TransferError;
use crate::models::{StateInit, StdAddr};
use crate::num::Tokens;
use crate::wallet::{
    HighloadWalletV1, HighloadWalletV2, QueryId, TransferV1Config, TransferV2Config,
};

/// Blockchain access used to query and control a highload wallet.
pub trait WalletProvider: Send + Sync {
    /// Provider error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the account balance.
    fn get_balance(
        &self,
        address: &StdAddr,
    ) -> impl Future<Output = Result<Tokens, Self::Error>> + Send;

    /// Returns the current wallet seqno, `0` for an undeployed account.
    fn get_seqno(&self, address: &StdAddr) -> impl Future<Output = Result<u32, Self::Error>> + Send;

    /// Returns the public key stored in the wallet data.
    fn get_public_key(
        &self,
        address: &StdAddr,
    ) -> impl Future<Output = Result<HashBytes, Self::Error>> + Send;

    /// Returns `true` if the wallet has already accepted the query.
    fn is_processed(
        &self,
        address: &StdAddr,
        query_id: QueryId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Submits an external message with the specified body.
    ///
    /// Implementations attach `state_init` when the account is not deployed yet.
    /// See [`build_external_message`].
    ///
    /// [`build_external_message`]: crate::models::build_external_message
    fn send_external(
        &self,
        address: &StdAddr,
        state_init: &StateInit,
        body: Cell,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Transfer submission error.
#[derive(Debug, thiserror::Error)]
pub enum SendError<E> {
    /// Failed to build the transfer.
    #[error(transparent)]
    Transfer(#[from] TransferError),
    /// Provider failed to handle the request.
    #[error("provider error")]
    Provider(#[source] E),
}

impl HighloadWalletV1 {
    /// Fetches the current seqno, builds a signed transfer and submits it.
    ///
    /// `config.seqno` is replaced with the fetched value.
    /// Returns the seqno used for the transfer.
    pub async fn send_transfer<P: WalletProvider>(
        &self,
        provider: &P,
        key: &SigningKey,
        mut config: TransferV1Config,
    ) -> Result<u32, SendError<P::Error>> {
        let address = self.address();

        config.seqno = match provider.get_seqno(address).await {
            Ok(seqno) => seqno,
            Err(e) => {
                tracing::warn!(%address, "failed to fetch wallet seqno: {e}");
                return Err(SendError::Provider(e));
            }
        };

        let body = self.create_transfer(key, &config)?;

        tracing::debug!(
            %address,
            seqno = config.seqno,
            messages = config.messages.len(),
            "sending highload transfer"
        );

        if let Err(e) = provider
            .send_external(address, self.state_init(), body)
            .await
        {
            tracing::warn!(%address, seqno = config.seqno, "failed to send transfer: {e}");
            return Err(SendError::Provider(e));
        }

        Ok(config.seqno)
    }

    /// Returns the wallet balance.
    pub async fn get_balance<P: WalletProvider>(&self, provider: &P) -> Result<Tokens, P::Error> {
        provider.get_balance(self.address()).await
    }

    /// Returns the current wallet seqno, `0` for an undeployed account.
    pub async fn get_seqno<P: WalletProvider>(&self, provider: &P) -> Result<u32, P::Error> {
        provider.get_seqno(self.address()).await
    }

    /// Returns the public key stored in the deployed wallet.
    pub async fn get_public_key<P: WalletProvider>(
        &self,
        provider: &P,
    ) -> Result<HashBytes, P::Error> {
        provider.get_public_key(self.address()).await
    }
}

impl HighloadWalletV2 {
    /// Builds a signed transfer and submits it.
    ///
    /// Returns the query id which can be used to check the transfer status.
    pub async fn send_transfer<P: WalletProvider>(
        &self,
        provider: &P,
        key: &SigningKey,
        config: &TransferV2Config,
    ) -> Result<QueryId, SendError<P::Error>> {
        let address = self.address();
        let transfer = self.create_transfer(key, config)?;

        tracing::debug!(
            %address,
            query_id = %transfer.query_id,
            messages = config.messages.len(),
            "sending highload transfer"
        );

        if let Err(e) = provider
            .send_external(address, self.state_init(), transfer.body)
            .await
        {
            tracing::warn!(
                %address,
                query_id = %transfer.query_id,
                "failed to send transfer: {e}"
            );
            return Err(SendError::Provider(e));
        }

        Ok(transfer.query_id)
    }

    /// Returns `true` if the wallet has already accepted the query.
    pub async fn is_processed<P: WalletProvider>(
        &self,
        provider: &P,
        query_id: QueryId,
    ) -> Result<bool, P::Error> {
        provider.is_processed(self.address(), query_id).await
    }

    /// Returns the wallet balance.
    pub async fn get_balance<P: WalletProvider>(&self, provider: &P) -> Result<Tokens, P::Error> {
        provider.get_balance(self.address()).await
    }

    /// Returns the public key stored in the deployed wallet.
    pub async fn get_public_key<P: WalletProvider>(
        &self,
        provider: &P,
    ) -> Result<HashBytes, P::Error> {
        provider.get_public_key(self.address()).await
    }
}
