use crate::{
    entities::{
        category, product, product_image, Category, CategoryModel, Product, ProductImage,
        ProductImageModel, ProductModel,
    },
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Storefront front page caps.
const STOREFRONT_CATEGORY_LIMIT: u64 = 3;
const STOREFRONT_PRODUCT_LIMIT: u64 = 8;

#[derive(Debug, Serialize)]
pub struct StorefrontView {
    pub categories: Vec<CategoryModel>,
    pub products: Vec<ProductModel>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: ProductModel,
    pub images: Vec<ProductImageModel>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub category: CategoryModel,
    pub products: Vec<ProductModel>,
}

/// Read-mostly catalog queries.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Front page: a few active categories plus available products.
    #[instrument(skip(self))]
    pub async fn storefront(&self) -> Result<StorefrontView, ServiceError> {
        let categories = Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .limit(STOREFRONT_CATEGORY_LIMIT)
            .all(&*self.db)
            .await?;

        let products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Quantity.gt(0))
            .order_by_desc(product::Column::CreatedAt)
            .limit(STOREFRONT_PRODUCT_LIMIT)
            .all(&*self.db)
            .await?;

        Ok(StorefrontView {
            categories,
            products,
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Category by slug with its active products.
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<CategoryDetail, ServiceError> {
        let cat = Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category '{slug}' not found")))?;

        let products = Product::find()
            .filter(product::Column::CategoryId.eq(cat.id))
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(CategoryDetail {
            category: cat,
            products,
        })
    }

    /// Paginated listing of active products, newest first.
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
        category_id: Option<Uuid>,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut query = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt);
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    /// Product with its gallery images.
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {product_id} not found")))?;

        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .order_by_asc(product_image::Column::SortOrder)
            .all(&*self.db)
            .await?;

        Ok(ProductDetail { product, images })
    }
}

/// URL slug from a (possibly Cyrillic) name: transliterated, lowercased,
/// non-alphanumerics collapsed to single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        let mapped = transliterate(c.to_lowercase().next().unwrap_or(c));
        match mapped {
            Some(s) => {
                slug.push_str(s);
                last_was_hyphen = false;
            }
            None => {
                if !last_was_hyphen {
                    slug.push('-');
                    last_was_hyphen = true;
                }
            }
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn transliterate(c: char) -> Option<&'static str> {
    if c.is_ascii_alphanumeric() {
        // Single ASCII char: return a static slice via lookup table.
        const ASCII: &[&str; 36] = &[
            "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f", "g",
            "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x",
            "y", "z",
        ];
        let idx = if c.is_ascii_digit() {
            c as usize - '0' as usize
        } else {
            10 + c as usize - 'a' as usize
        };
        return Some(ASCII[idx]);
    }
    let s = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'э' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' | 'й' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ы' => "y",
        'ю' => "yu",
        'я' => "ya",
        'ъ' | 'ь' => "",
        _ => return None,
    };
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_transliterates_cyrillic() {
        assert_eq!(slugify("Садовые инструменты"), "sadovye-instrumenty");
        assert_eq!(slugify("Грабли и лопаты"), "grabli-i-lopaty");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Hose,  25mm -- long"), "hose-25mm-long");
        assert_eq!(slugify("  Trimmed  "), "trimmed");
    }

    #[test]
    fn slugify_drops_soft_signs() {
        assert_eq!(slugify("Удобрения"), "udobreniya");
        assert_eq!(slugify("Соль"), "sol");
    }
}
