use crate::cart::{CartLine, CartService, CartTotal};
use crate::filter::{self, Filters, PriceBucket, SortKey};
use crate::order::{Customer, OrderSubmitter};
use crate::product::Product;
use crate::store::{CatalogStore, CatalogSummary};
use actix_web::web::{Data, Form, Json, Path, Query};
use actix_web::{get, post, Either, HttpResponse};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type Response = Result<HttpResponse, ControllerError>;
pub type InputData<T> = Either<Form<T>, Json<T>>;

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    NotFound,
    #[display("Cart is empty")]
    EmptyCart,
    #[error(ignore)]
    #[display("{_0}")]
    CatalogUnavailable(String),
    #[error(ignore)]
    InternalServerError(anyhow::Error),
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        ControllerError::InternalServerError(err)
    }
}

impl actix_web::error::ResponseError for ControllerError {
    fn error_response(&self) -> HttpResponse {
        log::warn!("{self:?}");
        use ControllerError::*;
        let body = serde_json::json!({ "error": self.to_string() });
        match self {
            NotFound => HttpResponse::NotFound().json(body),
            EmptyCart => HttpResponse::BadRequest().json(body),
            CatalogUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
            InternalServerError(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none_parse")]
    pub price: Option<PriceBucket>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none")]
    pub sort: Option<SortKey>,
}

#[derive(Serialize)]
struct ListingResponse {
    products: Vec<Product>,
    summary: CatalogSummary,
}

#[get("/api/products")]
pub async fn list_products(
    store: Data<Arc<CatalogStore>>,
    params: Query<ListingParams>,
) -> Response {
    if store.is_empty().await {
        if let Some(message) = store.load_error().await {
            return Err(ControllerError::CatalogUnavailable(message));
        }
    }
    let filters = Filters {
        search: params.search.clone(),
        category: params.category.clone(),
        price: params.price,
        sort: params.sort.unwrap_or_default(),
    };
    let products = filter::apply(&store.products().await, &filters);
    let summary = store.summary().await;
    Ok(HttpResponse::Ok().json(ListingResponse { products, summary }))
}

#[derive(Serialize)]
struct DetailResponse {
    product: Product,
    variants: Vec<Product>,
    suggestions: Vec<Product>,
}

#[get("/api/products/{id}")]
pub async fn product_detail(store: Data<Arc<CatalogStore>>, id: Path<String>) -> Response {
    let product = store.get(&id).await.ok_or(ControllerError::NotFound)?;
    let variants = store.variants_of(&product).await;
    let suggestions = store.suggestions_for(&product).await;
    Ok(HttpResponse::Ok().json(DetailResponse {
        product,
        variants,
        suggestions,
    }))
}

#[derive(Serialize)]
struct CartResponse {
    lines: Vec<CartLine>,
    total: CartTotal,
}

async fn cart_response(cart: &CartService) -> HttpResponse {
    HttpResponse::Ok().json(CartResponse {
        lines: cart.lines().await,
        total: cart.total().await,
    })
}

#[get("/api/cart")]
pub async fn get_cart(cart: Data<Arc<CartService>>) -> Response {
    Ok(cart_response(&cart).await)
}

#[post("/api/cart/{id}/add")]
pub async fn cart_add(
    store: Data<Arc<CatalogStore>>,
    cart: Data<Arc<CartService>>,
    id: Path<String>,
) -> Response {
    let product = store.get(&id).await.ok_or(ControllerError::NotFound)?;
    cart.add(&product).await;
    Ok(cart_response(&cart).await)
}

#[derive(Debug, Deserialize)]
pub struct AdjustInput {
    pub direction: i32,
}

#[post("/api/cart/{id}/adjust")]
pub async fn cart_adjust(
    cart: Data<Arc<CartService>>,
    id: Path<String>,
    input: InputData<AdjustInput>,
) -> Response {
    let input = input.into_inner();
    cart.adjust(&id, input.direction).await;
    Ok(cart_response(&cart).await)
}

#[post("/api/cart/{id}/remove")]
pub async fn cart_remove(cart: Data<Arc<CartService>>, id: Path<String>) -> Response {
    cart.remove(&id).await;
    Ok(cart_response(&cart).await)
}

/// Submits the order and clears the cart. The clear is unconditional: the
/// form endpoint's response cannot be verified cross-origin, so a transport
/// failure is logged and the customer still sees success.
#[post("/api/checkout")]
pub async fn checkout(
    cart: Data<Arc<CartService>>,
    submitter: Data<Arc<OrderSubmitter>>,
    input: InputData<Customer>,
) -> Response {
    let customer = input.into_inner();
    let lines = cart.lines().await;
    if lines.is_empty() {
        return Err(ControllerError::EmptyCart);
    }
    if let Err(err) = submitter.submit(&lines, &customer).await {
        log::error!("Order submission failed, clearing cart anyway: {err}");
    }
    cart.clear().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "submitted": true })))
}

/// Force sync: drops the cached dataset and refetches from the sources.
#[post("/api/catalog/refresh")]
pub async fn refresh_catalog(store: Data<Arc<CatalogStore>>) -> Response {
    let count = store
        .force_refresh()
        .await
        .map_err(|err| ControllerError::CatalogUnavailable(err.to_string()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "products": count })))
}
