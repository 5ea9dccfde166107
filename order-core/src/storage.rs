//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `products` - Catalog rows with stock counters (key: product_id)
//! - `orders` - Orders with embedded items (key: order_id)
//! - `attempts` - Payment attempts (key: gateway reference)
//! - `indices` - Secondary indices for fast lookups
//!
//! Multi-record writes go through `WriteBatch` so an order row, its
//! stock decrements, and its indices land atomically or not at all.

use crate::{
    error::{Error, Result},
    types::{AttemptState, Order, PaymentAttempt, Product},
    Config,
};
use momo_gateway::ReferenceId;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use uuid::Uuid;

/// Column family names
const CF_PRODUCTS: &str = "products";
const CF_ORDERS: &str = "orders";
const CF_ATTEMPTS: &str = "attempts";
const CF_INDICES: &str = "indices";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_PRODUCTS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_ORDERS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_ATTEMPTS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened order store");

        Ok(Self { db })
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        // Records are read back frequently, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Product operations

    /// Put product (catalog collaborator seam and ledger write-back)
    pub fn put_product(&self, product: &Product) -> Result<()> {
        let cf = self.cf_handle(CF_PRODUCTS)?;
        let value = bincode::serialize(product)?;
        self.db.put_cf(cf, product.product_id.as_bytes(), &value)?;
        Ok(())
    }

    /// Get product by ID
    pub fn get_product(&self, product_id: Uuid) -> Result<Product> {
        let cf = self.cf_handle(CF_PRODUCTS)?;
        let value = self
            .db
            .get_cf(cf, product_id.as_bytes())?
            .ok_or_else(|| Error::ProductNotFound(product_id.to_string()))?;

        let product: Product = bincode::deserialize(&value)?;
        Ok(product)
    }

    // Order operations

    /// Commit an order with its stock decrements (atomic)
    ///
    /// One `WriteBatch`: the order row, the per-user index entry, and
    /// every touched product row. Nothing persists if any part fails.
    pub fn commit_order(&self, order: &Order, touched_products: &[Product]) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_orders = self.cf_handle(CF_ORDERS)?;
        let order_value = bincode::serialize(order)?;
        batch.put_cf(cf_orders, order.order_id.as_bytes(), &order_value);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_user = Self::index_key_user_order(order.user_id, Some(order.order_id));
        batch.put_cf(cf_indices, &idx_user, &[]);

        let cf_products = self.cf_handle(CF_PRODUCTS)?;
        for product in touched_products {
            let value = bincode::serialize(product)?;
            batch.put_cf(cf_products, product.product_id.as_bytes(), &value);
        }

        self.db.write(batch)?;

        tracing::debug!(
            order_id = %order.order_id,
            items = order.items.len(),
            total = %order.total,
            "Order committed"
        );

        Ok(())
    }

    /// Overwrite an order row (status updates)
    pub fn update_order(&self, order: &Order) -> Result<()> {
        let cf = self.cf_handle(CF_ORDERS)?;
        let value = bincode::serialize(order)?;
        self.db.put_cf(cf, order.order_id.as_bytes(), &value)?;
        Ok(())
    }

    /// Get order by ID
    pub fn get_order(&self, order_id: Uuid) -> Result<Order> {
        let cf = self.cf_handle(CF_ORDERS)?;
        let value = self
            .db
            .get_cf(cf, order_id.as_bytes())?
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        let order: Order = bincode::deserialize(&value)?;
        Ok(order)
    }

    /// List a user's orders, newest first
    pub fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_key_user_order(user_id, None);

        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut orders = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if key.len() >= 32 {
                if let Ok(order_id) = Uuid::from_slice(&key[16..32]) {
                    orders.push(self.get_order(order_id)?);
                }
            }
        }

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    // Payment attempt operations

    /// Write a payment attempt, optionally with its order row (atomic)
    ///
    /// Used both to record new PENDING attempts and to apply terminal
    /// states. When a SUCCESSFUL outcome moves the order forward, the
    /// updated order row rides the same batch so no reader ever sees
    /// one write without the other.
    pub fn put_attempt_atomic(
        &self,
        attempt: &PaymentAttempt,
        order: Option<&Order>,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_attempts = self.cf_handle(CF_ATTEMPTS)?;
        let attempt_value = bincode::serialize(attempt)?;
        batch.put_cf(cf_attempts, attempt.reference.as_str().as_bytes(), &attempt_value);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_order = Self::index_key_order_attempt(attempt.order_id, Some(&attempt.reference));
        batch.put_cf(cf_indices, &idx_order, &[]);

        if let Some(order) = order {
            let cf_orders = self.cf_handle(CF_ORDERS)?;
            let order_value = bincode::serialize(order)?;
            batch.put_cf(cf_orders, order.order_id.as_bytes(), &order_value);
        }

        self.db.write(batch)?;
        Ok(())
    }

    /// Get payment attempt by gateway reference
    pub fn get_attempt(&self, reference: &ReferenceId) -> Result<PaymentAttempt> {
        let cf = self.cf_handle(CF_ATTEMPTS)?;
        let value = self
            .db
            .get_cf(cf, reference.as_str().as_bytes())?
            .ok_or_else(|| Error::AttemptNotFound(reference.to_string()))?;

        let attempt: PaymentAttempt = bincode::deserialize(&value)?;
        Ok(attempt)
    }

    /// All payment attempts for an order
    pub fn order_attempts(&self, order_id: Uuid) -> Result<Vec<PaymentAttempt>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_key_order_attempt(order_id, None);

        let iter = self.db.prefix_iterator_cf(cf_indices, &prefix);

        let mut attempts = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if key.len() > 16 {
                let reference = ReferenceId::new(String::from_utf8_lossy(&key[16..]).into_owned());
                attempts.push(self.get_attempt(&reference)?);
            }
        }

        Ok(attempts)
    }

    /// Whether the order already has a SUCCESSFUL attempt
    pub fn has_successful_attempt(&self, order_id: Uuid) -> Result<bool> {
        Ok(self
            .order_attempts(order_id)?
            .iter()
            .any(|a| a.state == AttemptState::Successful))
    }

    // Index key helpers

    fn index_key_user_order(user_id: Uuid, order_id: Option<Uuid>) -> Vec<u8> {
        let mut key = user_id.as_bytes().to_vec();
        if let Some(oid) = order_id {
            key.extend_from_slice(oid.as_bytes());
        }
        key
    }

    fn index_key_order_attempt(order_id: Uuid, reference: Option<&ReferenceId>) -> Vec<u8> {
        let mut key = order_id.as_bytes().to_vec();
        if let Some(r) = reference {
            key.extend_from_slice(r.as_str().as_bytes());
        }
        key
    }
}
