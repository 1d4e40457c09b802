//! Seller profile, storefront settings and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_core::{CustomerId, Email, Money, ReviewId, SellerId, SellerStatus, UserId};

use super::{ValidationError, optional_text, required_text};

/// Public contact details of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerContact {
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Registered business address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl BusinessAddress {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            line1: required_text("businessAddress.line1", &self.line1)?,
            line2: optional_text(self.line2.as_deref()),
            city: required_text("businessAddress.city", &self.city)?,
            state: required_text("businessAddress.state", &self.state)?,
            postal_code: required_text("businessAddress.postalCode", &self.postal_code)?,
            country: required_text("businessAddress.country", &self.country)?,
        })
    }
}

/// Payout bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder: String,
    pub bank_name: String,
    pub account_number: String,
    pub routing_code: String,
}

impl BankDetails {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            account_holder: required_text("bankDetails.accountHolder", &self.account_holder)?,
            bank_name: required_text("bankDetails.bankName", &self.bank_name)?,
            account_number: required_text("bankDetails.accountNumber", &self.account_number)?,
            routing_code: required_text("bankDetails.routingCode", &self.routing_code)?,
        })
    }

    /// Copy with every account-number character but the last four replaced.
    #[must_use]
    pub fn masked(&self) -> Self {
        let chars: Vec<char> = self.account_number.chars().collect();
        let keep = chars.len().saturating_sub(4);
        let account_number = chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < keep { '*' } else { *c })
            .collect();

        Self {
            account_number,
            ..self.clone()
        }
    }
}

/// Aggregate numbers shown on the store page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerMetrics {
    pub total_sales: Money,
    pub total_orders: u64,
    pub total_products: u64,
    pub average_rating: Decimal,
    pub review_count: u64,
}

/// Seller notification opt-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPreferences {
    pub new_orders: bool,
    pub low_stock: bool,
    pub reviews: bool,
    pub payouts: bool,
}

impl Default for SellerPreferences {
    fn default() -> Self {
        Self {
            new_orders: true,
            low_stock: true,
            reviews: true,
            payouts: true,
        }
    }
}

/// A customer review of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub customer_id: CustomerId,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Onboarding form and settings patch.
///
/// On onboarding `store_name` and `contact` are required; on a settings
/// update every field is optional and only present fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSettings {
    pub store_name: Option<String>,
    pub store_description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub contact: Option<SellerContact>,
    pub business_address: Option<BusinessAddress>,
    pub bank_details: Option<BankDetails>,
    pub notification_preferences: Option<SellerPreferences>,
    pub business_categories: Option<Vec<String>>,
}

/// A seller profile (one per seller user).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: SellerId,
    pub user_id: UserId,
    pub store_name: String,
    pub store_description: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub contact: SellerContact,
    pub business_address: Option<BusinessAddress>,
    pub bank_details: Option<BankDetails>,
    pub status: SellerStatus,
    pub metrics: SellerMetrics,
    pub reviews: Vec<Review>,
    pub notification_preferences: SellerPreferences,
    pub business_categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl Seller {
    /// Build an active seller from an onboarding form.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the store name or contact is missing, or
    /// when a nested block has blank required fields.
    pub fn onboard(user_id: UserId, form: SellerSettings) -> Result<Self, ValidationError> {
        let store_name = required_text("storeName", form.store_name.as_deref().unwrap_or(""))?;
        let contact = form
            .contact
            .clone()
            .ok_or_else(|| ValidationError::required("contact"))?;

        let now = Utc::now();
        let mut seller = Self {
            id: SellerId::new(),
            user_id,
            store_name,
            store_description: None,
            logo_url: None,
            banner_url: None,
            contact,
            business_address: None,
            bank_details: None,
            status: SellerStatus::Active,
            metrics: SellerMetrics::default(),
            reviews: Vec::new(),
            notification_preferences: SellerPreferences::default(),
            business_categories: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        seller.apply(form)?;
        Ok(seller)
    }

    /// Apply the present fields of a settings patch.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank store name or incomplete nested
    /// blocks. Nothing is modified on error.
    pub fn apply(&mut self, settings: SellerSettings) -> Result<(), ValidationError> {
        let store_name = settings
            .store_name
            .as_deref()
            .map(|name| required_text("storeName", name))
            .transpose()?;
        let business_address = settings
            .business_address
            .map(BusinessAddress::validated)
            .transpose()?;
        let bank_details = settings.bank_details.map(BankDetails::validated).transpose()?;

        if let Some(name) = store_name {
            self.store_name = name;
        }
        if let Some(description) = settings.store_description {
            self.store_description = optional_text(Some(&description));
        }
        if let Some(logo) = settings.logo_url {
            self.logo_url = optional_text(Some(&logo));
        }
        if let Some(banner) = settings.banner_url {
            self.banner_url = optional_text(Some(&banner));
        }
        if let Some(mut contact) = settings.contact {
            contact.phone = optional_text(contact.phone.as_deref());
            contact.website = optional_text(contact.website.as_deref());
            self.contact = contact;
        }
        if business_address.is_some() {
            self.business_address = business_address;
        }
        if bank_details.is_some() {
            self.bank_details = bank_details;
        }
        if let Some(prefs) = settings.notification_preferences {
            self.notification_preferences = prefs;
        }
        if let Some(categories) = settings.business_categories {
            self.business_categories = normalize_categories(&categories);
        }
        Ok(())
    }

    /// Record a review and refresh the rating aggregates.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the rating is outside `1..=5`.
    pub fn add_review(
        &mut self,
        customer_id: CustomerId,
        rating: u8,
        comment: Option<&str>,
    ) -> Result<&Review, ValidationError> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError("rating must be between 1 and 5".to_string()));
        }

        self.reviews.push(Review {
            id: ReviewId::new(),
            customer_id,
            rating,
            comment: optional_text(comment),
            created_at: Utc::now(),
        });

        let count = self.reviews.len() as u64;
        let sum: u64 = self.reviews.iter().map(|r| u64::from(r.rating)).sum();
        self.metrics.review_count = count;
        self.metrics.average_rating = (Decimal::from(sum) / Decimal::from(count)).round_dp(2);

        // Non-empty after the push above
        Ok(&self.reviews[self.reviews.len() - 1])
    }

    /// Count a placed order towards the sales metrics.
    pub fn record_sale(&mut self, amount: Money) {
        self.metrics.total_orders += 1;
        self.metrics.total_sales = self.metrics.total_sales + amount;
    }

    /// Owner view: everything, with the bank account number masked.
    #[must_use]
    pub fn owner_view(&self) -> Self {
        Self {
            bank_details: self.bank_details.as_ref().map(BankDetails::masked),
            ..self.clone()
        }
    }

    /// Public view: no bank details and no contact phone.
    #[must_use]
    pub fn public_view(&self) -> Self {
        let mut view = self.clone();
        view.bank_details = None;
        view.contact.phone = None;
        view
    }
}

/// Trim, lowercase and deduplicate category tags, preserving first-seen order.
#[must_use]
pub fn normalize_categories(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> SellerSettings {
        SellerSettings {
            store_name: Some("  Phone Barn ".to_string()),
            contact: Some(SellerContact {
                email: Email::parse("shop@example.com").unwrap(),
                phone: Some("555-0101".to_string()),
                website: None,
            }),
            bank_details: Some(BankDetails {
                account_holder: "Phone Barn LLC".to_string(),
                bank_name: "First Bank".to_string(),
                account_number: "1234567890".to_string(),
                routing_code: "021000021".to_string(),
            }),
            ..SellerSettings::default()
        }
    }

    #[test]
    fn test_onboard_defaults() {
        let seller = Seller::onboard(UserId::new(), form()).unwrap();
        assert_eq!(seller.store_name, "Phone Barn");
        assert_eq!(seller.status, SellerStatus::Active);
        assert_eq!(seller.metrics, SellerMetrics::default());
        assert!(seller.notification_preferences.new_orders);
    }

    #[test]
    fn test_onboard_requires_store_name_and_contact() {
        let mut no_name = form();
        no_name.store_name = Some("   ".to_string());
        assert_eq!(
            Seller::onboard(UserId::new(), no_name).unwrap_err().to_string(),
            "storeName is required"
        );

        let mut no_contact = form();
        no_contact.contact = None;
        assert!(Seller::onboard(UserId::new(), no_contact).is_err());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut seller = Seller::onboard(UserId::new(), form()).unwrap();
        let err = seller.apply(SellerSettings {
            store_name: Some("Renamed".to_string()),
            business_address: Some(BusinessAddress {
                line1: String::new(),
                line2: None,
                city: "Austin".to_string(),
                state: "TX".to_string(),
                postal_code: "73301".to_string(),
                country: "US".to_string(),
            }),
            ..SellerSettings::default()
        });

        assert!(err.is_err());
        assert_eq!(seller.store_name, "Phone Barn");
    }

    #[test]
    fn test_categories_are_normalized() {
        let raw = vec![
            " Phones ".to_string(),
            "phones".to_string(),
            String::new(),
            "Accessories".to_string(),
        ];
        assert_eq!(normalize_categories(&raw), vec!["phones", "accessories"]);
    }

    #[test]
    fn test_review_updates_average() {
        let mut seller = Seller::onboard(UserId::new(), form()).unwrap();
        seller.add_review(CustomerId::new(), 5, Some("great")).unwrap();
        seller.add_review(CustomerId::new(), 4, None).unwrap();
        seller.add_review(CustomerId::new(), 4, Some("  ")).unwrap();

        assert_eq!(seller.metrics.review_count, 3);
        assert_eq!(seller.metrics.average_rating, Decimal::new(433, 2));
        assert_eq!(seller.reviews[2].comment, None);
    }

    #[test]
    fn test_review_rejects_out_of_range() {
        let mut seller = Seller::onboard(UserId::new(), form()).unwrap();
        assert!(seller.add_review(CustomerId::new(), 0, None).is_err());
        assert!(seller.add_review(CustomerId::new(), 6, None).is_err());
        assert!(seller.reviews.is_empty());
    }

    #[test]
    fn test_views_hide_bank_details() {
        let seller = Seller::onboard(UserId::new(), form()).unwrap();

        let public = seller.public_view();
        assert!(public.bank_details.is_none());
        assert!(public.contact.phone.is_none());

        let owner = seller.owner_view();
        assert_eq!(owner.bank_details.unwrap().account_number, "******7890");
        assert_eq!(owner.contact.phone.as_deref(), Some("555-0101"));
    }
}
