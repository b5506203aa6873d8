#![allow(dead_code)]

use alloy::signers::{local::PrivateKeySigner, SignerSync};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

use carbon_market_backend::entities::sea_orm_active_enums::{
    Methodology, ProjectStatus, ProjectType, UserRole, VerificationBody,
};
use carbon_market_backend::entities::{projects, users};
use carbon_market_backend::models::address::WalletAddress;
use carbon_market_backend::routes::create_router;
use carbon_market_backend::services::auth::{sign_in_message, AuthSettings};
use carbon_market_backend::services::chain_gateway::{
    CancelReceipt, ChainError, ChainGateway, Listing, ListingReceipt, MinedTx, PlatformStats,
    PurchaseReceipt,
};
use carbon_market_backend::AppState;

pub const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// Fresh in-memory SQLite database with every migration applied.
///
/// One pooled connection only: each SQLite memory connection is its own database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn wallet(n: u64) -> WalletAddress {
    WalletAddress::parse(&format!("0x{:040x}", n)).unwrap()
}

pub fn tx_hash(n: u64) -> String {
    format!("0xabc{:061x}", n)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub get_balance: usize,
    pub get_active_listings: usize,
    pub get_user_listings: usize,
    pub list_credits: usize,
    pub purchase_credits: usize,
    pub cancel_listing: usize,
    pub get_platform_stats: usize,
}

impl CallCounts {
    pub fn writes(&self) -> usize {
        self.list_credits + self.purchase_credits + self.cancel_listing
    }
}

struct MockLedger {
    listings: BTreeMap<u64, Listing>,
    balances: BTreeMap<String, Decimal>,
    next_listing_id: u64,
    next_tx: u64,
    fail_next: Option<ChainError>,
    calls: CallCounts,
}

/// In-memory stand-in for the ledger contract.
///
/// Enforces the same business rules the contract does (active listing,
/// seller-only cancel, payment covering the price) and counts every call.
pub struct MockGateway {
    state: Mutex<MockLedger>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockLedger {
                listings: BTreeMap::new(),
                balances: BTreeMap::new(),
                next_listing_id: 1,
                next_tx: 1,
                fail_next: None,
                calls: CallCounts::default(),
            }),
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Id the next `list_credits` call will be assigned.
    pub fn set_next_listing_id(&self, id: u64) {
        self.state.lock().next_listing_id = id;
    }

    pub fn set_balance(&self, address: &WalletAddress, balance: Decimal) {
        self.state
            .lock()
            .balances
            .insert(address.as_str().to_string(), balance);
    }

    /// Make the next call of any kind fail with `error`.
    pub fn fail_next(&self, error: ChainError) {
        self.state.lock().fail_next = Some(error);
    }

    pub fn listing(&self, id: u64) -> Option<Listing> {
        self.state.lock().listings.get(&id).cloned()
    }

    /// Place a listing directly, as if created by an earlier session.
    pub fn insert_listing(&self, id: u64, seller: &WalletAddress, amount: Decimal, price: Decimal, active: bool) {
        let mut state = self.state.lock();
        state.listings.insert(
            id,
            Listing {
                id,
                seller: seller.clone(),
                amount,
                price_per_credit: price,
                active,
                listing_date: Utc::now(),
            },
        );
        state.next_listing_id = state.next_listing_id.max(id + 1);
    }
}

impl MockLedger {
    fn take_failure(&mut self) -> Result<(), ChainError> {
        match self.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn mine(&mut self) -> MinedTx {
        let n = self.next_tx;
        self.next_tx += 1;
        MinedTx {
            tx_hash: tx_hash(n),
            block_number: Some(100 + n),
            gas_used: 21_000,
        }
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn get_balance(&self, address: &WalletAddress) -> Result<Decimal, ChainError> {
        let mut state = self.state.lock();
        state.calls.get_balance += 1;
        state.take_failure()?;
        Ok(state
            .balances
            .get(address.as_str())
            .copied()
            .unwrap_or_default())
    }

    async fn get_active_listings(&self) -> Result<Vec<Listing>, ChainError> {
        let mut state = self.state.lock();
        state.calls.get_active_listings += 1;
        state.take_failure()?;
        Ok(state.listings.values().filter(|l| l.active).cloned().collect())
    }

    async fn get_user_listings(&self, address: &WalletAddress) -> Result<Vec<Listing>, ChainError> {
        let mut state = self.state.lock();
        state.calls.get_user_listings += 1;
        state.take_failure()?;
        Ok(state
            .listings
            .values()
            .filter(|l| &l.seller == address)
            .cloned()
            .collect())
    }

    async fn list_credits(
        &self,
        seller: &WalletAddress,
        amount: Decimal,
        price_per_credit: Decimal,
    ) -> Result<ListingReceipt, ChainError> {
        let mut state = self.state.lock();
        state.calls.list_credits += 1;
        state.take_failure()?;

        let id = state.next_listing_id;
        state.next_listing_id += 1;
        state.listings.insert(
            id,
            Listing {
                id,
                seller: seller.clone(),
                amount,
                price_per_credit,
                active: true,
                listing_date: Utc::now(),
            },
        );

        Ok(ListingReceipt {
            listing_id: id,
            escrow_address: WalletAddress::parse(CONTRACT).unwrap(),
            tx: state.mine(),
        })
    }

    async fn purchase_credits(
        &self,
        buyer: &WalletAddress,
        listing_id: u64,
        total_price: Decimal,
    ) -> Result<PurchaseReceipt, ChainError> {
        let mut state = self.state.lock();
        state.calls.purchase_credits += 1;
        state.take_failure()?;

        let listing = match state.listings.get(&listing_id) {
            Some(listing) if listing.active => listing.clone(),
            _ => return Err(ChainError::ListingInactive(listing_id)),
        };
        if total_price < listing.amount * listing.price_per_credit {
            return Err(ChainError::InsufficientPayment(
                "execution reverted: Insufficient payment".to_string(),
            ));
        }

        if let Some(stored) = state.listings.get_mut(&listing_id) {
            stored.active = false;
        }
        Ok(PurchaseReceipt {
            listing_id,
            buyer: buyer.clone(),
            seller: listing.seller,
            amount: listing.amount,
            total_price,
            tx: state.mine(),
        })
    }

    async fn cancel_listing(
        &self,
        seller: &WalletAddress,
        listing_id: u64,
    ) -> Result<CancelReceipt, ChainError> {
        let mut state = self.state.lock();
        state.calls.cancel_listing += 1;
        state.take_failure()?;

        let listing = match state.listings.get(&listing_id) {
            Some(listing) if listing.active => listing.clone(),
            _ => return Err(ChainError::ListingInactive(listing_id)),
        };
        if &listing.seller != seller {
            return Err(ChainError::NotListingOwner(listing_id));
        }

        if let Some(stored) = state.listings.get_mut(&listing_id) {
            stored.active = false;
        }
        Ok(CancelReceipt {
            listing_id,
            tx: state.mine(),
        })
    }

    async fn get_platform_stats(&self) -> Result<PlatformStats, ChainError> {
        let mut state = self.state.lock();
        state.calls.get_platform_stats += 1;
        state.take_failure()?;
        Ok(PlatformStats {
            total_supply: Decimal::from(1_000_000),
            credits_issued: 40_000,
            transactions: state.next_tx - 1,
            active_listings_count: state.listings.values().filter(|l| l.active).count() as u64,
        })
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub gateway: Arc<MockGateway>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Router that renders the `debug` field on error bodies.
    pub async fn verbose() -> Self {
        Self::build(true).await
    }

    async fn build(verbose_errors: bool) -> Self {
        let db = setup_test_db().await.expect("Failed to set up test DB");
        let gateway = Arc::new(MockGateway::new());
        let state = AppState::new(db.clone(), gateway.clone(), AuthSettings::default())
            .with_verbose_errors(verbose_errors);
        let router = create_router(state.clone(), "*");
        Self {
            db,
            gateway,
            state,
            router,
        }
    }

    /// Send one request through the full router; returns status and JSON body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Full nonce/sign/verify round trip; returns the bearer token.
    pub async fn sign_in(&self, signer: &PrivateKeySigner) -> String {
        let address = signer.address().to_string();
        let (status, nonce) = self
            .request(
                "POST",
                "/api/v1/auth/nonce",
                None,
                Some(serde_json::json!({ "walletAddress": address })),
            )
            .await;
        assert_eq!(status, 200, "nonce request failed: {nonce}");

        let message = sign_in_message(nonce["nonce"].as_str().unwrap());
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();

        let (status, session) = self
            .request(
                "POST",
                "/api/v1/auth/verify",
                None,
                Some(serde_json::json!({
                    "walletAddress": address,
                    "signature": format!("0x{}", hex::encode(signature.as_bytes())),
                })),
            )
            .await;
        assert_eq!(status, 200, "verify failed: {session}");
        session["token"].as_str().unwrap().to_string()
    }
}

pub fn signer_wallet(signer: &PrivateKeySigner) -> WalletAddress {
    WalletAddress::parse(&signer.address().to_string()).unwrap()
}

pub async fn seed_user(db: &DatabaseConnection, wallet: &WalletAddress, role: UserRole) -> users::Model {
    users::ActiveModel {
        wallet_address: Set(wallet.as_str().to_string()),
        username: Set(Some(format!("user_{}", &wallet.as_str()[2..8]))),
        role: Set(role),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub struct SeedProject {
    pub project_id: &'static str,
    pub project_type: ProjectType,
    pub status: ProjectStatus,
    pub total_credits: i64,
    pub credits_issued: i64,
    pub co2_reduction: Decimal,
    pub area_protected: Decimal,
}

impl Default for SeedProject {
    fn default() -> Self {
        Self {
            project_id: "PROJ-1-00000001",
            project_type: ProjectType::Reforestation,
            status: ProjectStatus::Pending,
            total_credits: 1000,
            credits_issued: 0,
            co2_reduction: Decimal::from(500),
            area_protected: Decimal::from(20),
        }
    }
}

pub async fn seed_project(db: &DatabaseConnection, owner: &WalletAddress, seed: SeedProject) -> projects::Model {
    let verified = seed.status == ProjectStatus::Verified;
    projects::ActiveModel {
        project_id: Set(seed.project_id.to_string()),
        name: Set(format!("Project {}", seed.project_id)),
        description: Set(None),
        location: Set("Test Location".to_string()),
        project_type: Set(seed.project_type),
        methodology: Set(Methodology::ReddPlus),
        verification_body: Set(VerificationBody::Verra),
        total_credits: Set(seed.total_credits),
        credits_issued: Set(seed.credits_issued),
        co2_reduction: Set(seed.co2_reduction),
        area_protected: Set(seed.area_protected),
        status: Set(seed.status),
        vintage_year: Set(2024),
        image_url: Set(None),
        verification_date: Set(verified.then(|| Utc::now().fixed_offset())),
        verifier_address: Set(None),
        owner_address: Set(owner.as_str().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Seed a completed purchase at a fixed time, bypassing the chain.
pub async fn seed_purchase(
    db: &DatabaseConnection,
    seller: &WalletAddress,
    buyer: &WalletAddress,
    amount: Decimal,
    price: Decimal,
    at: DateTime<Utc>,
    n: u64,
) -> carbon_market_backend::entities::transactions::Model {
    use carbon_market_backend::entities::sea_orm_active_enums::{TransactionStatus, TransactionType};
    use carbon_market_backend::entities::transactions;

    transactions::ActiveModel {
        transaction_hash: Set(Some(tx_hash(10_000 + n))),
        from_address: Set(seller.as_str().to_string()),
        to_address: Set(buyer.as_str().to_string()),
        amount: Set(amount),
        price: Set(price),
        transaction_type: Set(TransactionType::Purchase),
        status: Set(TransactionStatus::Completed),
        created_at: Set(at.fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
