//! Operator workflows
//!
//! Mirrors the two station screens: login, then blend selection where the
//! operator compares the previous lot, uploads the current lot and has it
//! confirmed.

use qc_common::config::QcConfig;
use qc_common::images::ImageRepository;
use qc_common::lots::{self, LotAssignment};
use qc_common::session::{self, Session};
use qc_common::{Blend, Error, LotImage, Result, Store};
use std::path::Path;
use tracing::{info, warn};

/// Everything shown for a selected blend
#[derive(Debug, Clone, PartialEq)]
pub struct BlendView {
    pub blend: Blend,
    /// Reference image of the most recent lot
    pub latest: Option<LotImage>,
    /// Recorded lot numbers, newest first
    pub lots: Vec<i64>,
}

pub struct Station {
    store: Store,
    images: ImageRepository,
}

impl Station {
    pub fn new(store: Store, images: ImageRepository) -> Self {
        Self { store, images }
    }

    /// Open the configured store and image repository
    pub async fn open(config: &QcConfig) -> Result<Self> {
        let images = ImageRepository::from_source(&config.image_source())?;
        let store = Store::open(config).await?;
        info!("Station ready ({} storage)", store.describe());
        Ok(Self::new(store, images))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn images(&self) -> &ImageRepository {
        &self.images
    }

    /// Usernames offered on the login screen
    pub async fn users(&self) -> Result<Vec<String>> {
        self.store.fetch_all_users().await
    }

    pub async fn login(&self, username: &str, pin: &str) -> Result<Session> {
        session::login(&self.store, username, pin).await
    }

    /// Blends offered in the selection list
    pub async fn valid_blends(&self) -> Result<Vec<String>> {
        self.store.fetch_valid_blends().await
    }

    pub async fn select_blend(&self, code: &str) -> Result<BlendView> {
        let blend = self
            .store
            .fetch_blend_info(code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("blend {}", code)))?;
        let latest = self.store.fetch_image_info_for_blend(code).await?;
        let lots = self.store.fetch_lot_numbers_for_blend(code).await?;

        if latest.is_none() {
            info!("No past lot image found for blend {}", code);
        }
        Ok(BlendView { blend, latest, lots })
    }

    pub async fn lot_assignment(&self, code: &str) -> Result<LotAssignment> {
        lots::lot_assignment(&self.store, code).await
    }

    /// Store the current lot's photo and record it, unconfirmed
    ///
    /// `manual_lot` is required when the blend has no lot history and must
    /// move forward when it has.
    pub async fn upload_current_lot(
        &self,
        session: &Session,
        code: &str,
        image: &Path,
        manual_lot: Option<i64>,
    ) -> Result<LotImage> {
        let blend = self
            .store
            .fetch_blend_info(code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("blend {}", code)))?;
        if !blend.is_selectable() {
            return Err(Error::InvalidInput(format!(
                "blend {} has no tablet weight and cannot be pressed",
                code
            )));
        }

        let lot_number = lots::resolve_lot(&self.store, code, manual_lot).await?;
        let image_path = self.images.store(code, lot_number, image).await?;

        if let Err(e) = self.store.insert_lot_image(code, lot_number, &image_path).await {
            warn!("Image for lot {} stored at {} but not recorded", lot_number, image_path);
            return Err(e);
        }

        info!("{} uploaded lot {} of {}", session.username, lot_number, code);
        Ok(LotImage {
            blend_code: code.to_string(),
            lot_number,
            image_path,
            confirmed_by: String::new(),
        })
    }

    /// Record the session user's initials as the lot's confirmation
    pub async fn confirm_lot(&self, session: &Session, code: &str, lot_number: i64) -> Result<LotImage> {
        self.store.mark_confirmed(&session.initials, code, lot_number).await?;
        self.store
            .fetch_lot_image(code, lot_number)
            .await?
            .ok_or_else(|| Error::NotFound(format!("lot {} for blend {}", lot_number, code)))
    }

    /// Image bytes for a lot, or for the latest lot when `lot_number` is `None`
    ///
    /// Uses the recorded image location; lots without a record fall back to
    /// the repository's naming convention.
    pub async fn lot_image_bytes(&self, code: &str, lot_number: Option<i64>) -> Result<(i64, Vec<u8>)> {
        let record = match lot_number {
            Some(lot) => self.store.fetch_lot_image(code, lot).await?,
            None => self.store.fetch_image_info_for_blend(code).await?,
        };

        let (lot, location) = match (record, lot_number) {
            (Some(record), _) => (record.lot_number, Some(record.image_path)),
            (None, Some(lot)) => (lot, self.images.location_for(code, lot).await?),
            (None, None) => return Err(Error::NotFound(format!("past lot image for blend {}", code))),
        };

        let location =
            location.ok_or_else(|| Error::NotFound(format!("image for lot {} of {}", lot, code)))?;
        let bytes = self.images.fetch(&location).await?;
        Ok((lot, bytes))
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
