use crate::{
    entities::{category, product, Category},
    errors::ServiceError,
    events::{Event, EventSender},
    media::{sanitize_filename, MediaStore},
    services::catalog::slugify,
};
use anyhow::{anyhow, bail};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const COL_NAME: &str = "Название";
const COL_PRICE: &str = "Цена";
const COL_DESCRIPTION: &str = "Описание";
const COL_SHORT_DESCRIPTION: &str = "Краткое описание";
const COL_OLD_PRICE: &str = "Старая цена";
const COL_QUANTITY: &str = "Количество";
const COL_CATEGORY: &str = "Категория";
const COL_IMAGE: &str = "Изображение";

const DEFAULT_CATEGORY: &str = "Без категории";
const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Result of one spreadsheet upload.
#[derive(Debug, Default, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
}

/// Column positions resolved from the header row.
struct HeaderMap {
    name: usize,
    price: usize,
    description: Option<usize>,
    short_description: Option<usize>,
    old_price: Option<usize>,
    quantity: Option<usize>,
    category: Option<usize>,
    image: Option<usize>,
}

impl HeaderMap {
    fn from_row(row: &[Data]) -> Result<Self, ServiceError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (idx, cell) in row.iter().enumerate() {
            if let Some(text) = cell_str(cell) {
                positions.insert(text, idx);
            }
        }

        let name = *positions.get(COL_NAME).ok_or_else(|| {
            ServiceError::ValidationError(format!("Отсутствует колонка '{COL_NAME}'"))
        })?;
        let price = *positions.get(COL_PRICE).ok_or_else(|| {
            ServiceError::ValidationError(format!("Отсутствует колонка '{COL_PRICE}'"))
        })?;

        Ok(Self {
            name,
            price,
            description: positions.get(COL_DESCRIPTION).copied(),
            short_description: positions.get(COL_SHORT_DESCRIPTION).copied(),
            old_price: positions.get(COL_OLD_PRICE).copied(),
            quantity: positions.get(COL_QUANTITY).copied(),
            category: positions.get(COL_CATEGORY).copied(),
            image: positions.get(COL_IMAGE).copied(),
        })
    }
}

/// Product fields parsed out of one spreadsheet row.
#[derive(Debug)]
struct ParsedRow {
    name: String,
    price: Decimal,
    description: String,
    short_description: String,
    old_price: Option<Decimal>,
    quantity: i32,
    category: Option<String>,
    image_url: Option<String>,
}

/// Excel product importer.
///
/// Every row is processed independently: a bad row is counted and reported
/// with its spreadsheet row number, and the batch carries on.
#[derive(Clone)]
pub struct ImportService {
    db: Arc<DatabaseConnection>,
    media: MediaStore,
    http: reqwest::Client,
    event_sender: Arc<EventSender>,
}

impl ImportService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        media: MediaStore,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(IMAGE_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            db,
            media,
            http,
            event_sender,
        }
    }

    /// Imports products from an .xlsx/.xls upload.
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn import_products(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportOutcome, ServiceError> {
        let lower = filename.to_lowercase();
        if !lower.ends_with(".xlsx") && !lower.ends_with(".xls") {
            return Err(ServiceError::ValidationError(
                "Поддерживаются только Excel файлы (.xlsx, .xls)".to_string(),
            ));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ServiceError::ValidationError(format!("Не удалось открыть файл: {e}")))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ServiceError::ValidationError("Файл не содержит листов".to_string()))?
            .map_err(|e| ServiceError::ValidationError(format!("Не удалось прочитать лист: {e}")))?;

        let mut rows = range.rows();
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(ImportOutcome::default()),
        };
        let columns = HeaderMap::from_row(header)?;

        let mut outcome = ImportOutcome::default();
        let mut category_cache: HashMap<String, Uuid> = HashMap::new();

        for (idx, row) in rows.enumerate() {
            if row.iter().all(|cell| cell_str(cell).is_none()) {
                continue;
            }
            // Header occupies spreadsheet row 1; data starts at row 2.
            let row_number = idx + 2;
            match self
                .import_row(&columns, row, idx, &mut category_cache)
                .await
            {
                Ok(()) => outcome.imported += 1,
                Err(e) => {
                    outcome.errors += 1;
                    outcome
                        .error_messages
                        .push(format!("Строка {row_number}: {e}"));
                }
            }
        }

        self.event_sender
            .send_or_log(Event::ProductsImported {
                imported: outcome.imported,
                errors: outcome.errors,
            })
            .await;

        info!(
            imported = outcome.imported,
            errors = outcome.errors,
            "product import finished"
        );
        Ok(outcome)
    }

    async fn import_row(
        &self,
        columns: &HeaderMap,
        row: &[Data],
        row_index: usize,
        category_cache: &mut HashMap<String, Uuid>,
    ) -> Result<(), anyhow::Error> {
        let parsed = parse_row(columns, row)?;

        // The image is fetched before the transaction opens; its failure
        // only costs the picture, never the product.
        let image = match &parsed.image_url {
            Some(url) => self.download_image(url, &parsed.name, row_index).await,
            None => None,
        };

        let txn = self.db.begin().await?;

        let category_name = parsed
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let category_id = match category_cache.get(&category_name) {
            Some(id) => *id,
            None => {
                let existing = Category::find()
                    .filter(category::Column::Name.eq(&category_name))
                    .one(&txn)
                    .await?;
                match existing {
                    Some(cat) => cat.id,
                    None => {
                        let created = category::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            name: Set(category_name.clone()),
                            slug: Set(slugify(&category_name)),
                            description: Set(String::new()),
                            is_active: Set(true),
                            created_at: Set(Utc::now()),
                        }
                        .insert(&txn)
                        .await?;
                        created.id
                    }
                }
            }
        };

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(parsed.name),
            description: Set(parsed.description),
            short_description: Set(parsed.short_description),
            price: Set(parsed.price),
            old_price: Set(parsed.old_price),
            quantity: Set(parsed.quantity),
            category_id: Set(category_id),
            image: Set(image),
            is_active: Set(true),
            is_featured: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        model.insert(&txn).await?;

        txn.commit().await?;
        category_cache.insert(category_name, category_id);
        Ok(())
    }

    /// Fetches a product image. Any failure is logged and swallowed: the
    /// product is saved without an image.
    async fn download_image(&self, url: &str, product_name: &str, row_index: usize) -> Option<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return None;
        }

        let response = match self.http.get(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "image download failed, saving product without image");
                return None;
            }
        };
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(url, error = %e, "image body read failed, saving product without image");
                return None;
            }
        };

        let extension = image_extension(url);
        let base = slugify(product_name);
        let base = if base.is_empty() {
            "product".to_string()
        } else {
            base
        };
        let relative = format!(
            "products/{}_{}.{extension}",
            sanitize_filename(&base),
            row_index + 1
        );

        match self.media.save(&relative, &bytes).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                debug!(url, error = %e, "image store failed, saving product without image");
                None
            }
        }
    }
}

fn parse_row(columns: &HeaderMap, row: &[Data]) -> Result<ParsedRow, anyhow::Error> {
    let name = cell_str(row.get(columns.name).unwrap_or(&Data::Empty))
        .ok_or_else(|| anyhow!("не заполнено название товара"))?;

    let price_cell = row.get(columns.price).unwrap_or(&Data::Empty);
    let price = cell_decimal(price_cell)?.ok_or_else(|| anyhow!("не заполнена цена товара"))?;
    if price < Decimal::ZERO {
        bail!("цена не может быть отрицательной");
    }

    let old_price = match columns.old_price.and_then(|idx| row.get(idx)) {
        Some(cell) => cell_decimal(cell)?,
        None => None,
    };

    let quantity = match columns.quantity.and_then(|idx| row.get(idx)) {
        Some(cell) => cell_i32(cell)?.unwrap_or(0),
        None => 0,
    };
    if quantity < 0 {
        bail!("количество не может быть отрицательным");
    }

    let opt_text = |idx: Option<usize>| {
        idx.and_then(|idx| row.get(idx))
            .and_then(cell_str)
            .unwrap_or_default()
    };

    Ok(ParsedRow {
        name,
        price,
        description: opt_text(columns.description),
        short_description: opt_text(columns.short_description),
        old_price,
        quantity,
        category: columns.category.and_then(|idx| row.get(idx)).and_then(cell_str),
        image_url: columns.image.and_then(|idx| row.get(idx)).and_then(cell_str),
    })
}

/// Non-empty trimmed cell text.
fn cell_str(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn cell_decimal(cell: &Data) -> Result<Option<Decimal>, anyhow::Error> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(f) => Decimal::from_f64(*f)
            .map(|d| Some(d.round_dp(2)))
            .ok_or_else(|| anyhow!("некорректное число: {f}")),
        Data::Int(i) => Ok(Some(Decimal::from(*i))),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .replace(',', ".")
                .parse::<Decimal>()
                .map(Some)
                .map_err(|_| anyhow!("некорректная цена: '{trimmed}'"))
        }
        other => bail!("некорректное значение: '{other}'"),
    }
}

fn cell_i32(cell: &Data) -> Result<Option<i32>, anyhow::Error> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(f) => Ok(Some(*f as i32)),
        Data::Int(i) => Ok(Some(*i as i32)),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i32>()
                .map(Some)
                .map_err(|_| anyhow!("некорректное количество: '{trimmed}'"))
        }
        other => bail!("некорректное значение: '{other}'"),
    }
}

/// Extension from the URL path when it is a recognised image type,
/// otherwise the default.
fn image_extension(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url);
    let ext = path.rsplit('/').next().and_then(|seg| seg.rsplit_once('.'));
    match ext {
        Some((_, ext)) => {
            let lower = ext.to_lowercase();
            if IMAGE_EXTENSIONS.contains(&lower.as_str()) {
                lower
            } else {
                DEFAULT_IMAGE_EXTENSION.to_string()
            }
        }
        None => DEFAULT_IMAGE_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn header(cells: &[&str]) -> Vec<Data> {
        cells.iter().map(|c| Data::String(c.to_string())).collect()
    }

    #[test]
    fn header_map_requires_name_and_price() {
        let row = header(&["Название", "Цена", "Количество"]);
        let map = HeaderMap::from_row(&row).unwrap();
        assert_eq!(map.name, 0);
        assert_eq!(map.price, 1);
        assert_eq!(map.quantity, Some(2));
        assert!(map.image.is_none());

        let row = header(&["Цена"]);
        assert!(HeaderMap::from_row(&row).is_err());
    }

    #[test]
    fn parse_row_reads_values_and_defaults() {
        let columns = HeaderMap::from_row(&header(&[
            "Название",
            "Цена",
            "Старая цена",
            "Количество",
            "Категория",
        ]))
        .unwrap();
        let row = vec![
            Data::String("Лопата".into()),
            Data::Float(499.0),
            Data::Empty,
            Data::Int(7),
            Data::String("Инструменты".into()),
        ];
        let parsed = parse_row(&columns, &row).unwrap();
        assert_eq!(parsed.name, "Лопата");
        assert_eq!(parsed.price, dec!(499));
        assert_eq!(parsed.old_price, None);
        assert_eq!(parsed.quantity, 7);
        assert_eq!(parsed.category.as_deref(), Some("Инструменты"));
        assert!(parsed.description.is_empty());
    }

    #[test]
    fn parse_row_rejects_missing_price() {
        let columns = HeaderMap::from_row(&header(&["Название", "Цена"])).unwrap();
        let row = vec![Data::String("Лопата".into()), Data::Empty];
        let err = parse_row(&columns, &row).unwrap_err();
        assert!(err.to_string().contains("цена"));
    }

    #[test]
    fn parse_row_rejects_negative_price() {
        let columns = HeaderMap::from_row(&header(&["Название", "Цена"])).unwrap();
        let row = vec![Data::String("Лопата".into()), Data::Float(-1.0)];
        assert!(parse_row(&columns, &row).is_err());
    }

    #[test]
    fn decimal_cells_accept_comma_separator() {
        assert_eq!(
            cell_decimal(&Data::String("1 99,50".replace(' ', ""))).unwrap(),
            Some(dec!(199.50))
        );
        assert_eq!(cell_decimal(&Data::Float(99.99)).unwrap(), Some(dec!(99.99)));
    }

    #[test]
    fn image_extension_falls_back_for_unknown_types() {
        assert_eq!(image_extension("https://x.test/a/b/photo.PNG"), "png");
        assert_eq!(image_extension("https://x.test/photo.svg"), "jpg");
        assert_eq!(image_extension("https://x.test/photo"), "jpg");
        assert_eq!(image_extension("https://x.test/p.jpeg?size=large"), "jpeg");
    }
}
