//! Properties, lots, buyers, search, dashboard and settings.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{optional_text, required_text};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::value_objects::daily_rate::DailyRate;
use crate::domain::value_objects::money::Money;
use crate::persistence::models::*;
use crate::persistence::repository::{
    BuyerRepository, DashboardRepository, PropertyRepository, SubdivisionRepository,
};
use crate::persistence::settings_repository::SettingsRepository;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyInput {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Buyer as entered: either a full name or its parts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyerInput {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl BuyerInput {
    /// The full name, joined from its parts when not given whole.
    pub fn full_name(&self) -> Option<String> {
        optional_text(self.name.as_deref()).or_else(|| {
            let joined = [&self.first_name, &self.middle_name, &self.last_name]
                .into_iter()
                .filter_map(|part| optional_text(part.as_deref()))
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        })
    }

    fn into_details(self) -> ServiceResult<BuyerDetails> {
        let name = required_text(self.full_name().as_deref(), "name")?;
        Ok(BuyerDetails {
            name,
            email: optional_text(self.email.as_deref()),
            phone: optional_text(self.phone.as_deref()),
            address: optional_text(self.address.as_deref()),
        })
    }
}

/// A lot together with its buyer
#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionView {
    #[serde(flatten)]
    pub subdivision: SubdivisionRecord,
    pub buyer: Option<BuyerRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    User,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterestRateSetting {
    pub daily_interest_rate: f64,
    pub source: RateSource,
}

#[derive(Clone)]
pub struct CatalogService {
    properties: PropertyRepository,
    subdivisions: SubdivisionRepository,
    buyers: BuyerRepository,
    dashboard: DashboardRepository,
    settings: SettingsRepository,
    default_rate: DailyRate,
}

impl CatalogService {
    pub fn new(
        properties: PropertyRepository,
        subdivisions: SubdivisionRepository,
        buyers: BuyerRepository,
        dashboard: DashboardRepository,
        settings: SettingsRepository,
        default_rate: DailyRate,
    ) -> Self {
        Self {
            properties,
            subdivisions,
            buyers,
            dashboard,
            settings,
            default_rate,
        }
    }

    // Properties

    pub async fn create_property(&self, user_id: &str, input: PropertyInput) -> ServiceResult<PropertyRecord> {
        let title = required_text(input.title.as_deref(), "title")?;
        let description = optional_text(input.description.as_deref());
        let property = self
            .properties
            .create(user_id, &title, description.as_deref())
            .await?;
        info!("Property created: {} ({})", property.title, property.id);
        Ok(property)
    }

    pub async fn update_property(
        &self,
        user_id: &str,
        id: &str,
        input: PropertyInput,
    ) -> ServiceResult<PropertyRecord> {
        let title = optional_text(input.title.as_deref());
        self.properties
            .update(user_id, id, title.as_deref(), input.description.as_deref())
            .await?
            .ok_or_else(|| ServiceError::not_found("property", id))
    }

    pub async fn get_property(&self, user_id: &str, id: &str) -> ServiceResult<PropertyRecord> {
        self.properties
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("property", id))
    }

    pub async fn list_properties(&self, user_id: &str) -> ServiceResult<Vec<PropertySummary>> {
        Ok(self.properties.list(user_id).await?)
    }

    pub async fn delete_property(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.properties.delete(user_id, id).await? {
            return Err(ServiceError::not_found("property", id));
        }
        info!("Property deleted: {}", id);
        Ok(())
    }

    // Subdivisions

    pub async fn create_subdivision(
        &self,
        user_id: &str,
        property_id: &str,
        details: LotDetails,
    ) -> ServiceResult<SubdivisionRecord> {
        self.get_property(user_id, property_id).await?;
        let title = required_text(details.title.as_deref(), "title")?;
        let details = validated_details(details)?;

        let lot = self
            .subdivisions
            .create(user_id, property_id, &title, &details)
            .await?;
        info!("Subdivision created: {} under {}", lot.id, property_id);
        Ok(lot)
    }

    pub async fn update_subdivision(
        &self,
        user_id: &str,
        id: &str,
        details: LotDetails,
    ) -> ServiceResult<SubdivisionRecord> {
        let mut details = validated_details(details)?;
        details.title = optional_text(details.title.as_deref());
        self.subdivisions
            .update_details(user_id, id, &details)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", id))
    }

    pub async fn get_subdivision(&self, user_id: &str, id: &str) -> ServiceResult<SubdivisionView> {
        let subdivision = self
            .subdivisions
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("subdivision", id))?;
        let buyer = match &subdivision.buyer_id {
            Some(buyer_id) => self.buyers.get(user_id, buyer_id).await?,
            None => None,
        };
        Ok(SubdivisionView { subdivision, buyer })
    }

    pub async fn list_subdivisions(
        &self,
        user_id: &str,
        property_id: &str,
    ) -> ServiceResult<Vec<SubdivisionSummary>> {
        self.get_property(user_id, property_id).await?;
        Ok(self.subdivisions.list_for_property(user_id, property_id).await?)
    }

    pub async fn delete_subdivision(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        if !self.subdivisions.delete(user_id, id).await? {
            return Err(ServiceError::not_found("subdivision", id));
        }
        info!("Subdivision deleted: {}", id);
        Ok(())
    }

    pub async fn search_subdivisions(
        &self,
        user_id: &str,
        filters: &SubdivisionSearch,
    ) -> ServiceResult<Vec<SearchResultRecord>> {
        Ok(self.subdivisions.search(user_id, filters).await?)
    }

    // Buyers

    pub async fn create_buyer(&self, user_id: &str, input: BuyerInput) -> ServiceResult<BuyerRecord> {
        let details = input.into_details()?;
        let buyer = self.buyers.create(user_id, &details).await?;
        info!("Buyer created: {}", buyer.id);
        Ok(buyer)
    }

    pub async fn update_buyer(&self, user_id: &str, id: &str, input: BuyerInput) -> ServiceResult<BuyerRecord> {
        let details = input.into_details()?;
        self.buyers
            .update(user_id, id, &details)
            .await?
            .ok_or_else(|| ServiceError::not_found("buyer", id))
    }

    pub async fn get_buyer(&self, user_id: &str, id: &str) -> ServiceResult<BuyerRecord> {
        self.buyers
            .get(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("buyer", id))
    }

    pub async fn list_buyers(&self, user_id: &str) -> ServiceResult<Vec<BuyerRecord>> {
        Ok(self.buyers.list(user_id).await?)
    }

    // Dashboard and settings

    pub async fn dashboard_stats(&self, user_id: &str) -> ServiceResult<DashboardStats> {
        Ok(self.dashboard.stats(user_id).await?)
    }

    pub async fn interest_rate(&self, user_id: &str) -> ServiceResult<InterestRateSetting> {
        let stored = self
            .settings
            .global_daily_rate(user_id)
            .await?
            .and_then(|v| DailyRate::new(v).ok());
        Ok(match stored {
            Some(rate) => InterestRateSetting {
                daily_interest_rate: rate.value(),
                source: RateSource::User,
            },
            None => InterestRateSetting {
                daily_interest_rate: self.default_rate.value(),
                source: RateSource::Default,
            },
        })
    }

    pub async fn set_interest_rate(&self, user_id: &str, rate: f64) -> ServiceResult<InterestRateSetting> {
        let rate = DailyRate::new(rate)?;
        self.settings.set_global_daily_rate(user_id, rate.value()).await?;
        info!("Global daily interest rate for {} set to {}", user_id, rate.value());
        Ok(InterestRateSetting {
            daily_interest_rate: rate.value(),
            source: RateSource::User,
        })
    }
}

/// Reject negative or non-finite measurements and prices.
fn validated_details(mut details: LotDetails) -> ServiceResult<LotDetails> {
    if let Some(price) = details.sale_price {
        details.sale_price = Some(Money::new(price)?.value());
    }
    for value in [details.acres, details.length, details.width].into_iter().flatten() {
        Money::new(value)?;
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;

    async fn service() -> CatalogService {
        let pool = init_database("sqlite::memory:").await.unwrap();
        CatalogService::new(
            PropertyRepository::new(pool.clone()),
            SubdivisionRepository::new(pool.clone()),
            BuyerRepository::new(pool.clone()),
            DashboardRepository::new(pool.clone()),
            SettingsRepository::new(pool),
            DailyRate::DEFAULT,
        )
    }

    #[test]
    fn test_buyer_name_joined_from_parts() {
        let input = BuyerInput {
            first_name: Some("Ama".to_string()),
            middle_name: Some("  ".to_string()),
            last_name: Some("Owusu".to_string()),
            ..BuyerInput::default()
        };
        assert_eq!(input.full_name().as_deref(), Some("Ama Owusu"));

        let whole = BuyerInput {
            name: Some(" Kwame Mensah ".to_string()),
            first_name: Some("Ignored".to_string()),
            ..BuyerInput::default()
        };
        assert_eq!(whole.full_name().as_deref(), Some("Kwame Mensah"));
        assert_eq!(BuyerInput::default().full_name(), None);
    }

    #[tokio::test]
    async fn test_property_requires_title() {
        let catalog = service().await;
        let err = catalog
            .create_property("user-1", PropertyInput { title: Some("  ".to_string()), description: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_lot_under_missing_property() {
        let catalog = service().await;
        let err = catalog
            .create_subdivision(
                "user-1",
                "missing",
                LotDetails {
                    title: Some("Lot 1".to_string()),
                    ..LotDetails::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "property", .. }));
    }

    #[tokio::test]
    async fn test_lot_rejects_negative_price() {
        let catalog = service().await;
        let property = catalog
            .create_property("user-1", PropertyInput { title: Some("Hill Farm".to_string()), description: None })
            .await
            .unwrap();
        let err = catalog
            .create_subdivision(
                "user-1",
                &property.id,
                LotDetails {
                    title: Some("Lot 1".to_string()),
                    sale_price: Some(-5.0),
                    ..LotDetails::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_interest_rate_setting() {
        let catalog = service().await;
        let initial = catalog.interest_rate("user-1").await.unwrap();
        assert_eq!(initial.source, RateSource::Default);
        assert_eq!(initial.daily_interest_rate, 0.001);

        catalog.set_interest_rate("user-1", 0.0004).await.unwrap();
        let stored = catalog.interest_rate("user-1").await.unwrap();
        assert_eq!(stored.source, RateSource::User);
        assert_eq!(stored.daily_interest_rate, 0.0004);

        assert!(catalog.set_interest_rate("user-1", 2.0).await.is_err());
    }

    #[tokio::test]
    async fn test_subdivision_view_includes_buyer() {
        let catalog = service().await;
        let property = catalog
            .create_property("user-1", PropertyInput { title: Some("Hill Farm".to_string()), description: None })
            .await
            .unwrap();
        let lot = catalog
            .create_subdivision(
                "user-1",
                &property.id,
                LotDetails {
                    title: Some("Lot 1".to_string()),
                    ..LotDetails::default()
                },
            )
            .await
            .unwrap();

        let view = catalog.get_subdivision("user-1", &lot.id).await.unwrap();
        assert!(view.buyer.is_none());
        assert!(matches!(
            catalog.get_subdivision("user-2", &lot.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
