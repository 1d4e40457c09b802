//! Product listings and catalog queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use vendora_core::{Condition, Feature, Money, ProductId, ProductStatus, Ram, SellerId, Storage};

use super::{ValidationError, optional_text, required_text};

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Upper bound on the page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// A product listed by a seller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub model: Option<String>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub quantity: u32,
    pub storage: Option<Storage>,
    pub ram: Option<Ram>,
    pub condition: Condition,
    pub features: Vec<Feature>,
    pub images: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: i64,
}

impl Product {
    /// The price a buyer pays per unit.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        self.sale_price.unwrap_or(self.price)
    }

    /// Recompute `status` from `quantity`.
    pub fn refresh_status(&mut self) {
        self.status = ProductStatus::for_quantity(self.quantity);
    }

    /// Take units out of stock, stopping at zero.
    pub fn decrement_stock(&mut self, units: u32) {
        self.quantity = self.quantity.saturating_sub(units);
        self.refresh_status();
    }

    /// The first image, used on order snapshots.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

fn check_prices(price: Money, sale_price: Option<Money>) -> Result<(), ValidationError> {
    if price.is_zero() {
        return Err(ValidationError("price must be greater than zero".to_string()));
    }
    if let Some(sale) = sale_price
        && sale >= price
    {
        return Err(ValidationError("salePrice must be less than price".to_string()));
    }
    Ok(())
}

fn dedup_features(features: Vec<Feature>) -> Vec<Feature> {
    let mut out = Vec::with_capacity(features.len());
    for feature in features {
        if !out.contains(&feature) {
            out.push(feature);
        }
    }
    out
}

fn clean_images(images: Vec<String>) -> Vec<String> {
    images
        .into_iter()
        .filter_map(|url| optional_text(Some(&url)))
        .collect()
}

/// New product as submitted by a seller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub model: Option<String>,
    pub price: Money,
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub quantity: u32,
    pub storage: Option<Storage>,
    pub ram: Option<Ram>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ProductDraft {
    /// Validate the draft and build a product owned by `seller_id`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for blank text fields, a zero price, or a
    /// sale price that is not below the price.
    pub fn into_product(self, seller_id: SellerId) -> Result<Product, ValidationError> {
        let name = required_text("name", &self.name)?;
        let description = required_text("description", &self.description)?;
        let brand = required_text("brand", &self.brand)?;
        check_prices(self.price, self.sale_price)?;

        let now = Utc::now();
        Ok(Product {
            id: ProductId::new(),
            seller_id,
            name,
            description,
            brand,
            model: optional_text(self.model.as_deref()),
            price: self.price,
            sale_price: self.sale_price,
            quantity: self.quantity,
            storage: self.storage,
            ram: self.ram,
            condition: self.condition,
            features: dedup_features(self.features),
            images: clean_images(self.images),
            status: ProductStatus::for_quantity(self.quantity),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }
}

/// Distinguish an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial product update. Nullable fields accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub model: Option<Option<String>>,
    pub price: Option<Money>,
    #[serde(default, deserialize_with = "double_option")]
    pub sale_price: Option<Option<Money>>,
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    pub storage: Option<Option<Storage>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ram: Option<Option<Ram>>,
    pub condition: Option<Condition>,
    pub features: Option<Vec<Feature>>,
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    /// Apply the present fields to `product` and refresh its status.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the result would break a product rule.
    /// The product is untouched on error.
    pub fn apply_to(self, product: &mut Product) -> Result<(), ValidationError> {
        let name = self.name.as_deref().map(|v| required_text("name", v)).transpose()?;
        let description = self
            .description
            .as_deref()
            .map(|v| required_text("description", v))
            .transpose()?;
        let brand = self.brand.as_deref().map(|v| required_text("brand", v)).transpose()?;

        let price = self.price.unwrap_or(product.price);
        let sale_price = self.sale_price.unwrap_or(product.sale_price);
        check_prices(price, sale_price)?;

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(description) = description {
            product.description = description;
        }
        if let Some(brand) = brand {
            product.brand = brand;
        }
        if let Some(model) = self.model {
            product.model = optional_text(model.as_deref());
        }
        product.price = price;
        product.sale_price = sale_price;
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        if let Some(storage) = self.storage {
            product.storage = storage;
        }
        if let Some(ram) = self.ram {
            product.ram = ram;
        }
        if let Some(condition) = self.condition {
            product.condition = condition;
        }
        if let Some(features) = self.features {
            product.features = dedup_features(features);
        }
        if let Some(images) = self.images {
            product.images = clean_images(images);
        }
        product.refresh_status();
        Ok(())
    }
}

/// Catalog listing filters, read from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Case-insensitive text search over name, brand, model and description.
    pub q: Option<String>,
    pub seller_id: Option<SellerId>,
    pub brand: Option<String>,
    pub condition: Option<Condition>,
    pub storage: Option<Storage>,
    pub ram: Option<Ram>,
    /// Lower bound on the unit price (inclusive).
    pub min_price: Option<Money>,
    /// Upper bound on the unit price (inclusive).
    pub max_price: Option<Money>,
    pub status: Option<ProductStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// 1-based page number.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.per_page())
    }

    /// The trimmed search term, if any.
    #[must_use]
    pub fn search_term(&self) -> Option<String> {
        optional_text(self.q.as_deref()).map(|q| q.to_lowercase())
    }

    /// The trimmed brand filter, if any.
    #[must_use]
    pub fn brand_filter(&self) -> Option<String> {
        optional_text(self.brand.as_deref())
    }

    /// Whether `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(term) = self.search_term() {
            let hit = [
                Some(product.name.as_str()),
                Some(product.brand.as_str()),
                product.model.as_deref(),
                Some(product.description.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(brand) = self.brand_filter()
            && !product.brand.eq_ignore_ascii_case(&brand)
        {
            return false;
        }

        let unit_price = product.unit_price();
        self.seller_id.is_none_or(|id| product.seller_id == id)
            && self.condition.is_none_or(|c| product.condition == c)
            && self.storage.is_none_or(|s| product.storage == Some(s))
            && self.ram.is_none_or(|r| product.ram == Some(r))
            && self.status.is_none_or(|s| product.status == s)
            && self.min_price.is_none_or(|min| unit_price >= min)
            && self.max_price.is_none_or(|max| unit_price <= max)
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}
