//! Product catalogue page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::layout::NavView;
use crate::db::ProductRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::Identity;
use crate::models::Product;
use crate::state::AppState;

/// Product row for the catalogue table.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub name: String,
    pub price: String,
    pub category: &'static str,
    pub description: String,
    pub tags: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price.display(),
            category: product.category.as_str(),
            description: product.description.clone().unwrap_or_default(),
            tags: product
                .tags
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products.html")]
pub struct ProductsTemplate {
    pub nav: NavView,
    pub products: Vec<ProductView>,
}

#[instrument(skip_all)]
pub async fn index(
    Identity(identity): Identity,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = ProductRepository::new(state.pool()).list().await?;

    Ok(ProductsTemplate {
        nav: NavView::from(&identity),
        products: products.iter().map(ProductView::from).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use crm_core::{ProductCategory, ProductId, TagId};

    use super::*;
    use crate::models::Tag;

    #[test]
    fn test_product_view_joins_tags() {
        let product = Product {
            id: ProductId::new(1),
            name: "Ball".to_string(),
            price: "12.5".parse().unwrap(),
            category: ProductCategory::OutDoor,
            description: None,
            tags: vec![
                Tag {
                    id: TagId::new(1),
                    name: "Sports".to_string(),
                },
                Tag {
                    id: TagId::new(2),
                    name: "Summer".to_string(),
                },
            ],
            created_at: Utc::now(),
        };

        let view = ProductView::from(&product);
        assert_eq!(view.price, "$12.50");
        assert_eq!(view.category, "Out Door");
        assert_eq!(view.tags, "Sports, Summer");
        assert_eq!(view.description, "");
    }
}
