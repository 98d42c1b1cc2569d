use actix_web::web::Data;
use actix_web::{App, HttpServer};
use reqwest_middleware::ClientBuilder;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::env;
use std::sync::Arc;
use storefront::cache::CatalogCache;
use storefront::cart::{CartRepository, CartService, FileSystemCartRepository};
use storefront::catalog::CatalogSource;
use storefront::config::{self, Config};
use storefront::control;
use storefront::order::OrderSubmitter;
use storefront::store::CatalogStore;

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    config::load_env()?;
    let cfg = Config::from_env();

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
    let client = ClientBuilder::new(reqwest::Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

    let source = CatalogSource::new(
        client.clone(),
        cfg.sheet_csv_url.clone(),
        &cfg.fallback_path,
    );
    let cache = CatalogCache::new(&cfg.storage_dir);
    let store = Arc::new(CatalogStore::new(source, cache));
    // Degraded startup is fine: the listing endpoint surfaces the error
    // inline until a refresh succeeds.
    if let Err(err) = store.load().await {
        log::error!("Unable to load catalog from any source: {err}");
    }

    let cart_repo: Arc<dyn CartRepository> =
        Arc::new(FileSystemCartRepository::new(&cfg.storage_dir));
    let cart = Arc::new(CartService::init(cart_repo).await);
    let submitter = Arc::new(OrderSubmitter::new(
        client,
        cfg.form_url.clone(),
        cfg.form_fields.clone(),
    ));

    log::info!("Storefront listening on {}:{}", cfg.bind_addr, cfg.port);
    let static_dir = cfg.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(store.clone()))
            .app_data(Data::new(cart.clone()))
            .app_data(Data::new(submitter.clone()))
            .service(control::list_products)
            .service(control::product_detail)
            .service(control::get_cart)
            .service(control::cart_add)
            .service(control::cart_adjust)
            .service(control::cart_remove)
            .service(control::checkout)
            .service(control::refresh_catalog)
            .service(actix_files::Files::new("/", &static_dir).index_file("index.html"))
    })
    .bind((cfg.bind_addr.as_str(), cfg.port))?
    .run()
    .await?;
    Ok(())
}
