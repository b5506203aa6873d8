//! alloy-backed Chain Gateway for the CarbonCredit ledger contract
//!
//! Writes are sent with `from` set to the acting wallet and signed by the
//! node (unlocked development accounts, as with ganache/anvil). Each write
//! is gas-estimated first, so contract reverts are classified before any
//! transaction is broadcast, then awaited under the configured timeout.

use alloy::{
    contract::SolCallBuilder,
    primitives::{Address, U256},
    providers::{PendingTransactionError, Provider, ProviderBuilder, RootProvider},
    rpc::types::{Log, TransactionReceipt},
    sol,
    sol_types::{SolCall, SolEvent},
    transports::{
        http::{Client, Http},
        RpcError,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::address::WalletAddress;
use crate::services::base_units::{from_base_units, to_base_units, UnitError};
use crate::services::chain_gateway::{
    classify_revert, CancelReceipt, ChainError, ChainGateway, Listing, ListingReceipt, MinedTx,
    PlatformStats, PurchaseReceipt,
};

/// Headroom added on top of the node's gas estimate (percent)
const GAS_BUFFER_PERCENT: u64 = 120;

sol! {
    #[sol(rpc)]
    interface ICarbonCredit {
        function balanceOf(address account) external view returns (uint256);
        function getActiveListings() external view returns (uint256[] memory);
        function listings(uint256 listingId) external view returns (
            address seller,
            uint256 amount,
            uint256 pricePerCredit,
            bool active,
            uint256 listingDate
        );
        function getUserListings(address user) external view returns (uint256[] memory);
        function listCredits(uint256 amount, uint256 pricePerCredit) external returns (uint256);
        function purchaseCredits(uint256 listingId) external payable;
        function cancelListing(uint256 listingId) external;
        function getPlatformStats() external view returns (
            uint256 totalSupply,
            uint256 creditsIssued,
            uint256 transactions,
            uint256 activeListingsCount
        );

        event CreditsListed(
            uint256 indexed listingId,
            address indexed seller,
            uint256 amount,
            uint256 pricePerCredit
        );

        event CreditsPurchased(
            uint256 indexed listingId,
            address indexed buyer,
            address indexed seller,
            uint256 amount,
            uint256 totalPrice
        );
    }
}

type HttpProvider = RootProvider<Http<Client>>;

/// Write call built from an instance bound to `&HttpProvider`.
type WriteCall<'a, 'p, C> = SolCallBuilder<Http<Client>, &'a &'p HttpProvider, C>;

pub struct ContractGateway {
    provider: HttpProvider,
    contract_address: Address,
    tx_timeout: Duration,
}

impl ContractGateway {
    /// Connect to the node and bind the ledger contract.
    ///
    /// # Errors
    ///
    /// `Unavailable` if the RPC URL is malformed or the node does not answer,
    /// `CallError` if the contract address cannot be parsed.
    pub async fn connect(
        rpc_url: &str,
        contract_address: &str,
        tx_timeout: Duration,
    ) -> Result<Self, ChainError> {
        info!(rpc_url = %rpc_url, contract = %contract_address, "Connecting chain gateway");

        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| ChainError::Unavailable(format!("Invalid RPC URL: {}", e)))?,
        );

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to reach ledger node");
            ChainError::Unavailable(format!("Connection failed: {}", e))
        })?;

        let contract_address = Address::from_str(contract_address).map_err(|e| {
            ChainError::CallError(format!("Invalid contract address: {}", e))
        })?;

        info!(
            chain_id = chain_id,
            contract = %contract_address,
            tx_timeout_secs = tx_timeout.as_secs(),
            "Chain gateway connected"
        );

        Ok(Self {
            provider,
            contract_address,
            tx_timeout,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    async fn fetch_listing(&self, id: U256) -> Result<Listing, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let raw = contract
            .listings(id)
            .call()
            .await
            .map_err(|e| map_contract_error(e, None))?;

        Ok(Listing {
            id: id.saturating_to::<u64>(),
            seller: wallet_from(raw.seller)?,
            amount: from_units(raw.amount)?,
            price_per_credit: from_units(raw.pricePerCredit)?,
            active: raw.active,
            listing_date: timestamp_from(raw.listingDate),
        })
    }

    /// Estimate, send and wait for the receipt of one contract write.
    async fn send_and_confirm<C>(
        &self,
        call: WriteCall<'_, '_, C>,
        method: &'static str,
        listing_id: Option<u64>,
    ) -> Result<TransactionReceipt, ChainError>
    where
        C: SolCall + Send + Sync,
    {
        let estimated = call
            .estimate_gas()
            .await
            .map_err(|e| map_contract_error(e, listing_id))?;
        let gas_limit = estimated.saturating_mul(GAS_BUFFER_PERCENT) / 100;
        debug!(method, estimated, gas_limit, "Gas estimation complete");

        let pending = call
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| map_contract_error(e, listing_id))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        info!(method, tx_hash = %tx_hash, "Transaction sent, waiting for confirmation");

        let receipt = match tokio::time::timeout(self.tx_timeout, pending.get_receipt()).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                error!(method, tx_hash = %tx_hash, error = %e, "Failed to get transaction receipt");
                return Err(map_pending_error(e));
            }
            Err(_) => {
                warn!(
                    method,
                    tx_hash = %tx_hash,
                    timeout_secs = self.tx_timeout.as_secs(),
                    "Transaction not mined in time; it may still confirm on-chain"
                );
                return Err(ChainError::Timeout(self.tx_timeout));
            }
        };

        if !receipt.status() {
            return Err(ChainError::CallError(format!(
                "{} transaction {} reverted",
                method, tx_hash
            )));
        }

        Ok(receipt)
    }
}

#[async_trait]
impl ChainGateway for ContractGateway {
    async fn get_balance(&self, address: &WalletAddress) -> Result<Decimal, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let result = contract
            .balanceOf(to_address(address)?)
            .call()
            .await
            .map_err(|e| map_contract_error(e, None))?;

        from_units(result._0)
    }

    async fn get_active_listings(&self) -> Result<Vec<Listing>, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let ids = contract
            .getActiveListings()
            .call()
            .await
            .map_err(|e| map_contract_error(e, None))?
            ._0;

        let mut listings = Vec::with_capacity(ids.len());
        for id in ids {
            let listing = self.fetch_listing(id).await?;
            if listing.active {
                listings.push(listing);
            }
        }

        debug!(count = listings.len(), "Fetched active listings");
        Ok(listings)
    }

    async fn get_user_listings(&self, address: &WalletAddress) -> Result<Vec<Listing>, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let ids = contract
            .getUserListings(to_address(address)?)
            .call()
            .await
            .map_err(|e| map_contract_error(e, None))?
            ._0;

        let mut listings = Vec::with_capacity(ids.len());
        for id in ids {
            listings.push(self.fetch_listing(id).await?);
        }
        Ok(listings)
    }

    async fn list_credits(
        &self,
        seller: &WalletAddress,
        amount: Decimal,
        price_per_credit: Decimal,
    ) -> Result<ListingReceipt, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let call = contract
            .listCredits(to_units(amount)?, to_units(price_per_credit)?)
            .from(to_address(seller)?);

        let receipt = self.send_and_confirm(call, "listCredits", None).await?;

        let event = find_event::<ICarbonCredit::CreditsListed>(receipt.inner.logs())?;

        Ok(ListingReceipt {
            listing_id: event.listingId.saturating_to::<u64>(),
            escrow_address: wallet_from(self.contract_address)?,
            tx: mined(&receipt),
        })
    }

    async fn purchase_credits(
        &self,
        buyer: &WalletAddress,
        listing_id: u64,
        total_price: Decimal,
    ) -> Result<PurchaseReceipt, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let call = contract
            .purchaseCredits(U256::from(listing_id))
            .from(to_address(buyer)?)
            .value(to_units(total_price)?);

        let receipt = self
            .send_and_confirm(call, "purchaseCredits", Some(listing_id))
            .await?;

        let event = find_event::<ICarbonCredit::CreditsPurchased>(receipt.inner.logs())?;

        Ok(PurchaseReceipt {
            listing_id: event.listingId.saturating_to::<u64>(),
            buyer: wallet_from(event.buyer)?,
            seller: wallet_from(event.seller)?,
            amount: from_units(event.amount)?,
            total_price: from_units(event.totalPrice)?,
            tx: mined(&receipt),
        })
    }

    async fn cancel_listing(
        &self,
        seller: &WalletAddress,
        listing_id: u64,
    ) -> Result<CancelReceipt, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let call = contract
            .cancelListing(U256::from(listing_id))
            .from(to_address(seller)?);

        let receipt = self
            .send_and_confirm(call, "cancelListing", Some(listing_id))
            .await?;

        Ok(CancelReceipt {
            listing_id,
            tx: mined(&receipt),
        })
    }

    async fn get_platform_stats(&self) -> Result<PlatformStats, ChainError> {
        let contract = ICarbonCredit::new(self.contract_address, &self.provider);
        let stats = contract
            .getPlatformStats()
            .call()
            .await
            .map_err(|e| map_contract_error(e, None))?;

        Ok(PlatformStats {
            total_supply: from_units(stats.totalSupply)?,
            credits_issued: stats.creditsIssued.saturating_to::<u64>(),
            transactions: stats.transactions.saturating_to::<u64>(),
            active_listings_count: stats.activeListingsCount.saturating_to::<u64>(),
        })
    }
}

fn map_contract_error(err: alloy::contract::Error, listing_id: Option<u64>) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(RpcError::Transport(kind)) => {
            ChainError::Unavailable(kind.to_string())
        }
        alloy::contract::Error::TransportError(RpcError::ErrorResp(payload)) => {
            classify_revert(&payload.message, listing_id)
        }
        other => classify_revert(&other.to_string(), listing_id),
    }
}

fn map_pending_error(err: PendingTransactionError) -> ChainError {
    match err {
        PendingTransactionError::TransportError(RpcError::Transport(kind)) => {
            ChainError::Unavailable(kind.to_string())
        }
        other => ChainError::CallError(other.to_string()),
    }
}

/// Decode the first log of type `E` emitted by the contract.
fn find_event<E: SolEvent>(logs: &[Log]) -> Result<E, ChainError> {
    for log in logs {
        if log.topics().first() != Some(&E::SIGNATURE_HASH) {
            continue;
        }
        let decoded = log.log_decode::<E>().map_err(|e| {
            ChainError::CallError(format!("Failed to decode {}: {}", E::SIGNATURE, e))
        })?;
        return Ok(decoded.inner.data);
    }

    Err(ChainError::CallError(format!(
        "{} event not found in receipt logs",
        E::SIGNATURE
    )))
}

fn mined(receipt: &TransactionReceipt) -> MinedTx {
    MinedTx {
        tx_hash: format!("{:?}", receipt.transaction_hash),
        block_number: receipt.block_number,
        gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
    }
}

fn to_address(wallet: &WalletAddress) -> Result<Address, ChainError> {
    Address::from_str(wallet.as_str())
        .map_err(|e| ChainError::CallError(format!("Invalid address {}: {}", wallet, e)))
}

fn wallet_from(address: Address) -> Result<WalletAddress, ChainError> {
    WalletAddress::parse(&address.to_string()).map_err(|e| ChainError::CallError(e.to_string()))
}

fn to_units(amount: Decimal) -> Result<U256, ChainError> {
    to_base_units(amount).map_err(unit_error)
}

fn from_units(value: U256) -> Result<Decimal, ChainError> {
    from_base_units(value).map_err(unit_error)
}

fn unit_error(e: UnitError) -> ChainError {
    ChainError::CallError(e.to_string())
}

fn timestamp_from(seconds: U256) -> DateTime<Utc> {
    let secs = i64::try_from(seconds.saturating_to::<u64>()).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
