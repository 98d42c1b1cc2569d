use crate::product::Product;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One cart position. Name, image, price, and variant attributes are
/// snapshots taken when the line is created, so the cart stays renderable
/// even if the product later disappears from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub quantity: u32,
    pub order_increment: u32,
}

impl CartLine {
    fn snapshot(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.display_name.clone(),
            image: product.image.clone(),
            price: product.price,
            size: product.size.clone(),
            color: product.color.clone(),
            material: product.material.clone(),
            quantity: product.order_increment,
            order_increment: product.order_increment.max(1),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotal {
    pub item_count: u64,
    pub amount: Decimal,
}

/// In-memory ledger keyed by product id. Quantities move in whole
/// order-increment steps; a line that reaches zero or below is removed,
/// never kept at zero.
#[derive(Debug, Default)]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add(&mut self, product: &Product) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product.id)
        {
            Some(line) => line.quantity += line.order_increment,
            None => self.lines.push(CartLine::snapshot(product)),
        }
    }

    /// `direction` is +1 or -1; the applied delta is one order-increment
    /// step. Unknown product ids are a no-op.
    pub fn adjust(&mut self, product_id: &str, direction: i32) {
        let Some(idx) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return;
        };
        let line = &mut self.lines[idx];
        let step = i64::from(line.order_increment) * i64::from(direction.signum());
        let next = i64::from(line.quantity) + step;
        if next <= 0 {
            self.lines.remove(idx);
        } else {
            line.quantity = next as u32;
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total(&self) -> CartTotal {
        CartTotal {
            item_count: self.lines.iter().map(|l| u64::from(l.quantity)).sum(),
            amount: self.lines.iter().map(CartLine::line_total).sum(),
        }
    }
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<CartLine>, anyhow::Error>;
    async fn save(&self, lines: &[CartLine]) -> Result<(), anyhow::Error>;
}

const CART_FILE: &str = "cart.json";

pub struct FileSystemCartRepository {
    path: PathBuf,
}

impl FileSystemCartRepository {
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        Self {
            path: storage_dir.as_ref().join(CART_FILE),
        }
    }
}

#[async_trait]
impl CartRepository for FileSystemCartRepository {
    async fn load(&self) -> Result<Vec<CartLine>, anyhow::Error> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(lines) => Ok(lines),
            Err(err) => {
                log::warn!("Corrupt cart state treated as empty: {err}");
                Ok(vec![])
            }
        }
    }

    async fn save(&self, lines: &[CartLine]) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(lines)?).await?;
        Ok(())
    }
}

/// Shared cart handle for the view layer. Every mutation persists the full
/// ledger; persistence failures are logged and never surfaced, the in-memory
/// state stays authoritative for the session.
pub struct CartService {
    ledger: RwLock<CartLedger>,
    repo: Arc<dyn CartRepository>,
}

impl CartService {
    pub async fn init(repo: Arc<dyn CartRepository>) -> Self {
        let lines = match repo.load().await {
            Ok(lines) => lines,
            Err(err) => {
                log::warn!("Unable to load cart state, starting empty: {err}");
                vec![]
            }
        };
        Self {
            ledger: RwLock::new(CartLedger::from_lines(lines)),
            repo,
        }
    }

    pub async fn add(&self, product: &Product) {
        let mut ledger = self.ledger.write().await;
        ledger.add(product);
        self.persist(&ledger).await;
    }

    pub async fn adjust(&self, product_id: &str, direction: i32) {
        let mut ledger = self.ledger.write().await;
        ledger.adjust(product_id, direction);
        self.persist(&ledger).await;
    }

    pub async fn remove(&self, product_id: &str) {
        let mut ledger = self.ledger.write().await;
        ledger.remove(product_id);
        self.persist(&ledger).await;
    }

    pub async fn clear(&self) {
        let mut ledger = self.ledger.write().await;
        ledger.clear();
        self.persist(&ledger).await;
    }

    pub async fn lines(&self) -> Vec<CartLine> {
        self.ledger.read().await.lines().to_vec()
    }

    pub async fn total(&self) -> CartTotal {
        self.ledger.read().await.total()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledger.read().await.is_empty()
    }

    async fn persist(&self, ledger: &CartLedger) {
        if let Err(err) = self.repo.save(ledger.lines()).await {
            log::warn!("Unable to persist cart state: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RawProductRow;
    use crate::product::normalize;
    use rust_decimal_macros::dec;

    fn bear() -> Product {
        let rows = vec![RawProductRow {
            product_id: "P1".to_string(),
            sub_product_id: "P1-A".to_string(),
            product_name: "Bear".to_string(),
            size: "S".to_string(),
            color: "Red".to_string(),
            price: "199.50".to_string(),
            increment_by: "6".to_string(),
            ..Default::default()
        }];
        normalize(rows).remove(0)
    }

    #[test]
    fn add_starts_at_order_increment() {
        let mut ledger = CartLedger::default();
        ledger.add(&bear());
        assert_eq!(ledger.lines().len(), 1);
        assert_eq!(ledger.lines()[0].quantity, 6);
    }

    #[test]
    fn adjust_below_zero_removes_line() {
        let mut ledger = CartLedger::default();
        ledger.add(&bear());
        ledger.adjust("P1-A", -1);
        assert!(ledger.is_empty());
    }

    #[test]
    fn quantities_stay_multiples_of_increment() {
        let mut ledger = CartLedger::default();
        let bear = bear();
        ledger.add(&bear);
        ledger.add(&bear);
        ledger.adjust("P1-A", 1);
        ledger.adjust("P1-A", -1);
        let quantity = ledger.lines()[0].quantity;
        assert_eq!(quantity % bear.order_increment, 0);
        assert_eq!(quantity, 12);
    }

    #[test]
    fn adjust_unknown_id_is_a_no_op() {
        let mut ledger = CartLedger::default();
        ledger.add(&bear());
        ledger.adjust("GONE", -1);
        ledger.remove("GONE");
        assert_eq!(ledger.lines().len(), 1);
    }

    #[test]
    fn total_sums_quantities_and_amounts() {
        let mut ledger = CartLedger::default();
        ledger.add(&bear());
        let total = ledger.total();
        assert_eq!(total.item_count, 6);
        assert_eq!(total.amount, dec!(1197.00));
    }

    #[tokio::test]
    async fn ledger_round_trips_through_storage() {
        let dir = std::env::temp_dir().join(format!("storefront-cart-{}", std::process::id()));
        let repo = FileSystemCartRepository::new(&dir);
        let mut ledger = CartLedger::default();
        ledger.add(&bear());
        repo.save(ledger.lines()).await.expect("save cart");
        let restored = repo.load().await.expect("load cart");
        assert_eq!(restored, ledger.lines());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_and_corrupt_state_load_as_empty() {
        let dir = std::env::temp_dir().join(format!(
            "storefront-cart-corrupt-{}",
            std::process::id()
        ));
        let repo = FileSystemCartRepository::new(&dir);
        assert!(repo.load().await.expect("load absent cart").is_empty());
        tokio::fs::create_dir_all(&dir).await.expect("create dir");
        tokio::fs::write(dir.join(CART_FILE), "[{broken")
            .await
            .expect("write corrupt state");
        assert!(repo.load().await.expect("load corrupt cart").is_empty());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
