//! Commemorative NFT campaigns and reservations.
//!
//! A [`CampaignBook`] holds a campaign, its inventory and every reservation
//! made against it. All reservation rules operate on the book so that a
//! reservation change and the inventory change it implies land in one write.
//!
//! Expiry is lazy: a reservation is live only while `status == Active` and
//! `now <= expires_at`, but its NFT stays reserved until a sweep releases it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TycoonError};
use crate::ids::{CampaignId, ReservationId, StakeAddress};

/// Default reservation window.
pub const DEFAULT_RESERVATION_TIMEOUT_SECONDS: i64 = 25 * 60;

/// How long past expiry a reservation is left alone by sweeps.
pub const RESERVATION_GRACE_SECONDS: i64 = 30;

/// Timing rules for reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// How long a reservation holds its NFT.
    pub timeout: Duration,
    /// Extra time before a sweep releases an expired reservation.
    pub grace: Duration,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::seconds(DEFAULT_RESERVATION_TIMEOUT_SECONDS),
            grace: Duration::seconds(RESERVATION_GRACE_SECONDS),
        }
    }
}

/// Campaign lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Not accepting reservations.
    Inactive,
    /// Accepting reservations.
    Active,
}

/// Campaign metadata and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign id.
    pub id: CampaignId,
    /// Display name.
    pub name: String,
    /// Description shown to players.
    pub description: String,
    /// Payment provider project id.
    pub project_id: String,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Most NFTs the inventory may hold.
    pub max_nfts: u32,
    /// Reservations open at this time, if set.
    pub start_date: Option<DateTime<Utc>>,
    /// Reservations close after this time, if set.
    pub end_date: Option<DateTime<Utc>>,
    /// Inventory size.
    pub total_nfts: u32,
    /// NFTs free to reserve.
    pub available_nfts: u32,
    /// NFTs held by a reservation.
    pub reserved_nfts: u32,
    /// NFTs paid for.
    pub sold_nfts: u32,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
    /// When the campaign was last written.
    pub updated_at: DateTime<Utc>,
}

/// Inventory item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NftStatus {
    /// Free to reserve.
    Available,
    /// Held by a reservation.
    Reserved,
    /// Paid for.
    Sold,
}

/// One NFT in a campaign inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Payment provider NFT uid.
    pub nft_uid: String,
    /// Campaign-scoped number, 1..=N.
    pub nft_number: u32,
    /// Display name.
    pub name: String,
    /// Current status.
    pub status: NftStatus,
    /// Where the buyer pays.
    pub payment_url: Option<String>,
}

/// Reservation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Holding an NFT.
    Active,
    /// Paid.
    Completed,
    /// Timed out.
    Expired,
    /// Released by the player.
    Cancelled,
}

impl ReservationStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why a reservation is being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// Player gave it up.
    Cancelled,
    /// It ran out of time.
    Expired,
}

/// Payment window transition reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentWindow {
    /// Payment page opened.
    Opened,
    /// Payment page closed.
    Closed,
}

/// A wallet's hold on one NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation id.
    pub id: ReservationId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Reserved NFT uid.
    pub nft_uid: String,
    /// Reserved NFT number.
    pub nft_number: u32,
    /// Reserving wallet.
    pub reserved_by: StakeAddress,
    /// When it was made.
    pub reserved_at: DateTime<Utc>,
    /// When it stops being live.
    pub expires_at: DateTime<Utc>,
    /// Current status.
    pub status: ReservationStatus,
    /// Payment page opened at.
    pub payment_window_opened_at: Option<DateTime<Utc>>,
    /// Payment page closed at.
    pub payment_window_closed_at: Option<DateTime<Utc>>,
    /// On-chain payment transaction.
    pub transaction_hash: Option<String>,
    /// When it completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Active and not past its expiry.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && now <= self.expires_at
    }

    /// Milliseconds left before expiry.
    #[must_use]
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().max(0)
    }

    /// Payment page opened and not closed since.
    #[must_use]
    pub fn is_payment_window_open(&self) -> bool {
        self.payment_window_opened_at.is_some() && self.payment_window_closed_at.is_none()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == ReservationStatus::Active {
            Ok(())
        } else {
            Err(TycoonError::ReservationNotActive {
                id: self.id.to_string(),
                status: self.status.as_str().to_string(),
            })
        }
    }
}

/// Reservation returned by [`CampaignBook::reserve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReserveOutcome {
    /// The live reservation.
    pub reservation: Reservation,
    /// The reserved item.
    pub nft: InventoryItem,
    /// Whether the wallet already held it.
    pub is_existing: bool,
    /// Stale reservations released before reserving.
    pub swept: usize,
}

/// New inventory entry supplied by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    /// Payment provider NFT uid.
    pub nft_uid: String,
    /// Campaign-scoped number.
    pub nft_number: u32,
    /// Display name.
    pub name: String,
    /// Where the buyer pays.
    #[serde(default)]
    pub payment_url: Option<String>,
}

/// A campaign with its inventory and reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignBook {
    /// Campaign metadata and counters.
    pub campaign: Campaign,
    /// Inventory sorted by NFT number.
    pub inventory: Vec<InventoryItem>,
    /// Every reservation ever made, oldest first.
    pub reservations: Vec<Reservation>,
}

impl CampaignBook {
    /// Create an inactive campaign with no inventory.
    #[must_use]
    pub fn new(
        name: String,
        description: String,
        project_id: String,
        max_nfts: u32,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            campaign: Campaign {
                id: CampaignId::generate(),
                name,
                description,
                project_id,
                status: CampaignStatus::Inactive,
                max_nfts,
                start_date,
                end_date,
                total_nfts: 0,
                available_nfts: 0,
                reserved_nfts: 0,
                sold_nfts: 0,
                created_at: now,
                updated_at: now,
            },
            inventory: Vec::new(),
            reservations: Vec::new(),
        }
    }

    /// Fill an empty inventory.
    ///
    /// # Errors
    ///
    /// Fails if inventory already exists, exceeds `max_nfts`, or repeats an
    /// NFT number.
    pub fn populate(&mut self, items: Vec<NewInventoryItem>, now: DateTime<Utc>) -> Result<usize> {
        if !self.inventory.is_empty() {
            return Err(TycoonError::InvalidInventory(format!(
                "campaign already has {} NFTs",
                self.inventory.len()
            )));
        }
        if items.len() > self.campaign.max_nfts as usize {
            return Err(TycoonError::InvalidInventory(format!(
                "cannot add {} NFTs, campaign max is {}",
                items.len(),
                self.campaign.max_nfts
            )));
        }
        let mut inventory: Vec<InventoryItem> = items
            .into_iter()
            .map(|item| InventoryItem {
                nft_uid: item.nft_uid,
                nft_number: item.nft_number,
                name: item.name,
                status: NftStatus::Available,
                payment_url: item.payment_url,
            })
            .collect();
        inventory.sort_by_key(|item| item.nft_number);
        if inventory.windows(2).any(|w| w[0].nft_number == w[1].nft_number) {
            return Err(TycoonError::InvalidInventory(
                "duplicate NFT number".to_string(),
            ));
        }
        let count = inventory.len();
        self.inventory = inventory;
        self.recount(now);
        Ok(count)
    }

    /// Drop inventory and reservations, and deactivate.
    pub fn clear_inventory(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        let cleared = (self.inventory.len(), self.reservations.len());
        self.inventory.clear();
        self.reservations.clear();
        self.campaign.status = CampaignStatus::Inactive;
        self.recount(now);
        cleared
    }

    /// Open the campaign for reservations.
    ///
    /// # Errors
    ///
    /// Fails when the inventory is empty.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.inventory.is_empty() {
            return Err(TycoonError::InvalidInventory(
                "cannot activate a campaign with no NFTs".to_string(),
            ));
        }
        self.campaign.status = CampaignStatus::Active;
        self.campaign.updated_at = now;
        Ok(())
    }

    /// Stop new reservations. Existing ones stay valid.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.campaign.status = CampaignStatus::Inactive;
        self.campaign.updated_at = now;
    }

    /// Reserve the lowest available NFT for `wallet`.
    ///
    /// Stale reservations are swept first. A wallet with a live reservation
    /// gets it back with `is_existing = true`.
    ///
    /// # Errors
    ///
    /// Fails when the campaign is inactive, outside its dates, sold out, or
    /// the wallet already completed a purchase here.
    pub fn reserve(
        &mut self,
        wallet: &StakeAddress,
        now: DateTime<Utc>,
        policy: ReservationPolicy,
    ) -> Result<ReserveOutcome> {
        let name = self.campaign.name.clone();
        if self.campaign.status != CampaignStatus::Active {
            return Err(TycoonError::CampaignNotActive { name });
        }
        if self.campaign.end_date.is_some_and(|end| now > end) {
            return Err(TycoonError::CampaignEnded { name });
        }
        if self.campaign.start_date.is_some_and(|start| now < start) {
            return Err(TycoonError::CampaignNotStarted { name });
        }

        let swept = self.sweep_expired(now, policy.grace);

        if let Some(index) = self.wallet_reservation(wallet, ReservationStatus::Active) {
            if self.reservations[index].is_live(now) {
                let reservation = self.reservations[index].clone();
                let nft = self.item(reservation.nft_number)?.clone();
                return Ok(ReserveOutcome {
                    reservation,
                    nft,
                    is_existing: true,
                    swept,
                });
            }
            // Expired but still inside the grace window: give it up so the
            // wallet holds at most one NFT.
            let id = self.reservations[index].id;
            self.release(id, ReleaseReason::Expired, now)?;
        }

        if self
            .wallet_reservation(wallet, ReservationStatus::Completed)
            .is_some()
        {
            return Err(TycoonError::AlreadyClaimed { name });
        }

        let item = self
            .inventory
            .iter_mut()
            .find(|item| item.status == NftStatus::Available)
            .ok_or(TycoonError::SoldOut { name })?;
        item.status = NftStatus::Reserved;
        let nft = item.clone();

        let reservation = Reservation {
            id: ReservationId::generate(),
            campaign_id: self.campaign.id,
            nft_uid: nft.nft_uid.clone(),
            nft_number: nft.nft_number,
            reserved_by: wallet.clone(),
            reserved_at: now,
            expires_at: now + policy.timeout,
            status: ReservationStatus::Active,
            payment_window_opened_at: None,
            payment_window_closed_at: None,
            transaction_hash: None,
            completed_at: None,
        };
        self.reservations.push(reservation.clone());
        self.recount(now);

        Ok(ReserveOutcome {
            reservation,
            nft,
            is_existing: false,
            swept,
        })
    }

    /// The wallet's live reservation, if any.
    #[must_use]
    pub fn live_reservation(&self, wallet: &StakeAddress, now: DateTime<Utc>) -> Option<&Reservation> {
        self.reservations
            .iter()
            .find(|r| &r.reserved_by == wallet && r.is_live(now))
    }

    /// Look up a reservation by id.
    #[must_use]
    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Reservations, optionally filtered by status.
    #[must_use]
    pub fn reservations_with_status(&self, status: Option<ReservationStatus>) -> Vec<&Reservation> {
        self.reservations
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect()
    }

    /// Mark a reservation paid.
    ///
    /// Payment is authoritative, so an active reservation completes even
    /// past its expiry. Completing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the reservation is unknown, expired by a sweep, or cancelled.
    pub fn complete(
        &mut self,
        id: ReservationId,
        transaction_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let index = self.index_of(id)?;
        if self.reservations[index].status == ReservationStatus::Completed {
            return Ok(self.reservations[index].clone());
        }
        self.reservations[index].ensure_active()?;

        let number = self.reservations[index].nft_number;
        self.item_mut(number)?.status = NftStatus::Sold;

        let reservation = &mut self.reservations[index];
        reservation.status = ReservationStatus::Completed;
        reservation.transaction_hash = Some(transaction_hash);
        reservation.completed_at = Some(now);
        let completed = reservation.clone();
        self.recount(now);
        Ok(completed)
    }

    /// Complete the wallet's active reservation, as reported by the payment webhook.
    ///
    /// # Errors
    ///
    /// Fails when the wallet has no active reservation here.
    pub fn complete_for_wallet(
        &mut self,
        wallet: &StakeAddress,
        transaction_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let index = self
            .wallet_reservation(wallet, ReservationStatus::Active)
            .ok_or_else(|| TycoonError::ReservationNotActive {
                id: format!("{}/{wallet}", self.campaign.id),
                status: "missing".to_string(),
            })?;
        let id = self.reservations[index].id;
        self.complete(id, transaction_hash, now)
    }

    /// Release an active reservation.
    ///
    /// The NFT goes back to the pool only if it is still reserved.
    ///
    /// # Errors
    ///
    /// Fails if the reservation is unknown or no longer active.
    pub fn release(&mut self, id: ReservationId, reason: ReleaseReason, now: DateTime<Utc>) -> Result<()> {
        let index = self.index_of(id)?;
        self.reservations[index].ensure_active()?;
        self.reservations[index].status = match reason {
            ReleaseReason::Cancelled => ReservationStatus::Cancelled,
            ReleaseReason::Expired => ReservationStatus::Expired,
        };
        let number = self.reservations[index].nft_number;
        let item = self.item_mut(number)?;
        if item.status == NftStatus::Reserved {
            item.status = NftStatus::Available;
        }
        self.recount(now);
        Ok(())
    }

    /// Record a payment window transition.
    ///
    /// # Errors
    ///
    /// Fails if the reservation is unknown or not active.
    pub fn mark_payment_window(
        &mut self,
        id: ReservationId,
        window: PaymentWindow,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let index = self.index_of(id)?;
        let reservation = &mut self.reservations[index];
        reservation.ensure_active()?;
        match window {
            PaymentWindow::Opened => reservation.payment_window_opened_at = Some(now),
            PaymentWindow::Closed => reservation.payment_window_closed_at = Some(now),
        }
        Ok(reservation.clone())
    }

    /// Expire active reservations that ran out more than `grace` ago.
    /// Returns how many were expired.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, grace: Duration) -> usize {
        let cutoff = now - grace;
        let mut expired = 0;
        for index in 0..self.reservations.len() {
            let reservation = &mut self.reservations[index];
            if reservation.status != ReservationStatus::Active || reservation.expires_at >= cutoff {
                continue;
            }
            reservation.status = ReservationStatus::Expired;
            let number = reservation.nft_number;
            if let Some(item) = self.inventory.iter_mut().find(|i| i.nft_number == number) {
                if item.status == NftStatus::Reserved {
                    item.status = NftStatus::Available;
                }
            }
            expired += 1;
        }
        if expired > 0 {
            self.recount(now);
        }
        expired
    }

    /// Whether every counter equals the inventory status counts.
    #[must_use]
    pub fn counters_consistent(&self) -> bool {
        let (available, reserved, sold) = self.status_counts();
        let c = &self.campaign;
        c.available_nfts == available
            && c.reserved_nfts == reserved
            && c.sold_nfts == sold
            && c.total_nfts == available + reserved + sold
    }

    fn status_counts(&self) -> (u32, u32, u32) {
        let count = |status| {
            let n = self.inventory.iter().filter(|i| i.status == status).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        (
            count(NftStatus::Available),
            count(NftStatus::Reserved),
            count(NftStatus::Sold),
        )
    }

    fn recount(&mut self, now: DateTime<Utc>) {
        let (available, reserved, sold) = self.status_counts();
        self.campaign.available_nfts = available;
        self.campaign.reserved_nfts = reserved;
        self.campaign.sold_nfts = sold;
        self.campaign.total_nfts = available + reserved + sold;
        self.campaign.updated_at = now;
    }

    fn wallet_reservation(&self, wallet: &StakeAddress, status: ReservationStatus) -> Option<usize> {
        self.reservations
            .iter()
            .position(|r| &r.reserved_by == wallet && r.status == status)
    }

    fn index_of(&self, id: ReservationId) -> Result<usize> {
        self.reservations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| TycoonError::ReservationNotActive {
                id: id.to_string(),
                status: "missing".to_string(),
            })
    }

    fn item(&self, number: u32) -> Result<&InventoryItem> {
        self.inventory
            .iter()
            .find(|i| i.nft_number == number)
            .ok_or_else(|| TycoonError::InvalidInventory(format!("NFT #{number} missing")))
    }

    fn item_mut(&mut self, number: u32) -> Result<&mut InventoryItem> {
        self.inventory
            .iter_mut()
            .find(|i| i.nft_number == number)
            .ok_or_else(|| TycoonError::InvalidInventory(format!("NFT #{number} missing")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(fill: char) -> StakeAddress {
        format!("stake1{}", fill.to_string().repeat(53)).parse().unwrap()
    }

    fn items(n: u32) -> Vec<NewInventoryItem> {
        (1..=n)
            .rev()
            .map(|i| NewInventoryItem {
                nft_uid: format!("uid-{i}"),
                nft_number: i,
                name: format!("Lab Rat #{i}"),
                payment_url: None,
            })
            .collect()
    }

    fn active_book(n: u32, now: DateTime<Utc>) -> CampaignBook {
        let mut book = CampaignBook::new(
            "Lab Rat".to_string(),
            "first run".to_string(),
            "project".to_string(),
            10,
            None,
            None,
            now,
        );
        book.populate(items(n), now).unwrap();
        book.activate(now).unwrap();
        book
    }

    #[test]
    fn reserves_lowest_available_number() {
        let now = Utc::now();
        let mut book = active_book(3, now);
        let first = book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        let second = book.reserve(&wallet('b'), now, ReservationPolicy::default()).unwrap();
        assert_eq!(first.nft.nft_number, 1);
        assert_eq!(second.nft.nft_number, 2);
        assert_eq!(book.campaign.available_nfts, 1);
        assert_eq!(book.campaign.reserved_nfts, 2);
        assert!(book.counters_consistent());
    }

    #[test]
    fn returns_existing_live_reservation() {
        let now = Utc::now();
        let mut book = active_book(3, now);
        let first = book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        let again = book
            .reserve(&wallet('a'), now + Duration::minutes(1), ReservationPolicy::default())
            .unwrap();
        assert!(again.is_existing);
        assert_eq!(again.reservation.id, first.reservation.id);
        assert_eq!(book.campaign.reserved_nfts, 1);
    }

    #[test]
    fn inactive_and_out_of_window_campaigns_reject() {
        let now = Utc::now();
        let mut book = active_book(1, now);
        book.deactivate(now);
        assert!(matches!(
            book.reserve(&wallet('a'), now, ReservationPolicy::default()),
            Err(TycoonError::CampaignNotActive { .. })
        ));

        book.activate(now).unwrap();
        book.campaign.start_date = Some(now + Duration::hours(1));
        assert!(matches!(
            book.reserve(&wallet('a'), now, ReservationPolicy::default()),
            Err(TycoonError::CampaignNotStarted { .. })
        ));

        book.campaign.start_date = None;
        book.campaign.end_date = Some(now - Duration::hours(1));
        assert!(matches!(
            book.reserve(&wallet('a'), now, ReservationPolicy::default()),
            Err(TycoonError::CampaignEnded { .. })
        ));
    }

    #[test]
    fn sold_out_and_already_claimed() {
        let now = Utc::now();
        let mut book = active_book(1, now);
        let held = book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        assert!(matches!(
            book.reserve(&wallet('b'), now, ReservationPolicy::default()),
            Err(TycoonError::SoldOut { .. })
        ));
        book.complete(held.reservation.id, "tx".to_string(), now).unwrap();
        assert!(matches!(
            book.reserve(&wallet('a'), now, ReservationPolicy::default()),
            Err(TycoonError::AlreadyClaimed { .. })
        ));
        assert_eq!(book.campaign.sold_nfts, 1);
        assert!(book.counters_consistent());
    }

    #[test]
    fn expiry_is_lazy_until_swept() {
        let now = Utc::now();
        let policy = ReservationPolicy::default();
        let mut book = active_book(1, now);
        book.reserve(&wallet('a'), now, policy).unwrap();

        let after_expiry = now + policy.timeout + Duration::seconds(10);
        assert!(book.live_reservation(&wallet('a'), after_expiry).is_none());
        // Inside the grace window the NFT is still held.
        assert_eq!(book.sweep_expired(after_expiry, policy.grace), 0);
        assert_eq!(book.campaign.reserved_nfts, 1);

        let after_grace = now + policy.timeout + Duration::seconds(31);
        let taken = book.reserve(&wallet('b'), after_grace, policy).unwrap();
        assert_eq!(taken.swept, 1);
        assert_eq!(taken.nft.nft_number, 1);
        assert_eq!(
            book.reservations[0].status,
            ReservationStatus::Expired
        );
        assert!(book.counters_consistent());
    }

    #[test]
    fn release_returns_nft_only_when_reserved() {
        let now = Utc::now();
        let mut book = active_book(2, now);
        let held = book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        book.release(held.reservation.id, ReleaseReason::Cancelled, now).unwrap();
        assert_eq!(book.campaign.available_nfts, 2);
        assert_eq!(book.reservations[0].status, ReservationStatus::Cancelled);
        assert!(matches!(
            book.release(held.reservation.id, ReleaseReason::Cancelled, now),
            Err(TycoonError::ReservationNotActive { .. })
        ));
    }

    #[test]
    fn webhook_completion_by_wallet() {
        let now = Utc::now();
        let mut book = active_book(2, now);
        book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        let done = book.complete_for_wallet(&wallet('a'), "abc".to_string(), now).unwrap();
        assert_eq!(done.status, ReservationStatus::Completed);
        assert_eq!(done.transaction_hash.as_deref(), Some("abc"));
        assert!(book.complete_for_wallet(&wallet('b'), "abc".to_string(), now).is_err());
        // Idempotent on the same id.
        assert!(book.complete(done.id, "abc".to_string(), now).is_ok());
        assert_eq!(book.campaign.sold_nfts, 1);
    }

    #[test]
    fn payment_window_requires_active() {
        let now = Utc::now();
        let mut book = active_book(1, now);
        let held = book.reserve(&wallet('a'), now, ReservationPolicy::default()).unwrap();
        let opened = book
            .mark_payment_window(held.reservation.id, PaymentWindow::Opened, now)
            .unwrap();
        assert!(opened.is_payment_window_open());
        book.release(held.reservation.id, ReleaseReason::Cancelled, now).unwrap();
        assert!(book
            .mark_payment_window(held.reservation.id, PaymentWindow::Closed, now)
            .is_err());
    }

    #[test]
    fn populate_rules() {
        let now = Utc::now();
        let mut book = CampaignBook::new(
            "Pilot".to_string(),
            String::new(),
            "p".to_string(),
            2,
            None,
            None,
            now,
        );
        assert!(book.activate(now).is_err());
        assert!(book.populate(items(3), now).is_err());
        assert_eq!(book.populate(items(2), now).unwrap(), 2);
        assert!(book.populate(items(1), now).is_err());
        assert_eq!(book.inventory[0].nft_number, 1);
        assert_eq!(book.clear_inventory(now), (2, 0));
        assert_eq!(book.campaign.total_nfts, 0);
    }
}
