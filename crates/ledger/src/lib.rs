//! The wallet ledger: the sole authority over parent balances.
//!
//! Every debit (order charge) and credit (applied top-up) goes through
//! [`Ledger`], which appends one immutable [`ParentTransaction`] per balance
//! mutation. Concurrent writers for the same parent are serialized by a
//! compare-and-swap on the `parents.version` column, not by in-process
//! locking: the process running this code is not the sole writer.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

pub use clock::{Clock, SystemClock};
pub use error::LedgerError;
pub use menu::{Category, MenuItem};
pub use money::MoneyCents;
pub use order_items::OrderItem;
pub use orders::{Order, OrderStatus};
pub use parents::Parent;
pub use students::Student;
pub use topups::{PaymentMethod, Topup, TopupStatus};
pub use transactions::{ParentTransaction, TransactionClass, TransactionKind};

mod clock;
mod error;
mod menu;
mod money;
mod order_items;
mod orders;
mod parents;
mod students;
mod topups;
mod transactions;

pub type ResultLedger<T> = Result<T, LedgerError>;

/// Bounded retries for a lost compare-and-swap race before surfacing
/// [`LedgerError::Conflict`].
const CAS_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct Ledger {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Return a builder for `Ledger`.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    // ────────────────────────────────────────────────────────────────────
    // Pure derivations
    // ────────────────────────────────────────────────────────────────────

    /// Sum of `price × quantity` over the lines, exact in integer cents.
    ///
    /// No side effects. An empty list sums to zero.
    pub fn order_total(items: &[OrderItem]) -> ResultLedger<MoneyCents> {
        let mut total = MoneyCents::ZERO;
        for item in items {
            total = total
                .checked_add(item.total()?)
                .ok_or_else(|| LedgerError::InvalidAmount("order total overflow".to_string()))?;
        }
        Ok(total)
    }

    // ────────────────────────────────────────────────────────────────────
    // Parents
    // ────────────────────────────────────────────────────────────────────

    /// Create a wallet for `user_id` with a zero balance.
    pub async fn create_parent(&self, user_id: &str) -> ResultLedger<Parent> {
        if parents::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(LedgerError::ExistingKey(user_id.to_string()));
        }

        let parent = Parent::new(user_id);
        parents::ActiveModel::from(&parent)
            .insert(&self.database)
            .await?;
        Ok(parent)
    }

    /// Return a parent with the ids of their linked students.
    pub async fn parent(&self, user_id: &str) -> ResultLedger<Parent> {
        let mut parent: Parent = self.fresh_parent(user_id).await?;
        parent.children = students::Entity::find()
            .filter(students::Column::ParentId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        Ok(parent)
    }

    /// Current spendable balance.
    pub async fn balance(&self, user_id: &str) -> ResultLedger<MoneyCents> {
        Ok(self.fresh_parent(user_id).await?.balance)
    }

    // ────────────────────────────────────────────────────────────────────
    // Charges
    // ────────────────────────────────────────────────────────────────────

    /// Debit `order.total` from the parent wallet and append a `Charge`
    /// entry.
    ///
    /// Fails with `AmountMismatch` if the stored total does not equal the
    /// sum of the snapshot lines, and with `InsufficientFunds` if the
    /// freshly-read balance cannot cover it. On any failure the balance and
    /// the ledger are untouched.
    pub async fn charge_order(
        &self,
        parent_id: &str,
        order: &Order,
    ) -> ResultLedger<ParentTransaction> {
        if order.parent_id != parent_id {
            return Err(LedgerError::InvalidState(
                "order belongs to another parent".to_string(),
            ));
        }
        let total = Self::order_total(&order.items)?;
        if order.total != total {
            return Err(LedgerError::AmountMismatch(format!(
                "order says {}, lines sum to {}",
                order.total, total
            )));
        }

        for _ in 0..CAS_RETRIES {
            let parent = self.fresh_parent(parent_id).await?;
            if parent.balance < total {
                return Err(LedgerError::InsufficientFunds(format!(
                    "balance {} cannot cover {}",
                    parent.balance, total
                )));
            }
            let after = parent.balance - total;

            let db_tx = self.database.begin().await?;
            if !Self::swap_balance(&db_tx, parent_id, parent.version, after).await? {
                db_tx.rollback().await?;
                continue;
            }

            let entry = ParentTransaction::new(
                parent_id.to_string(),
                TransactionKind::Charge,
                -total,
                parent.balance,
                after,
                vec![order.id.to_string()],
                "order charge".to_string(),
                self.clock.now(),
            );
            transactions::ActiveModel::try_from(&entry)?
                .insert(&db_tx)
                .await?;
            db_tx.commit().await?;

            tracing::info!(parent = parent_id, order = %order.id, amount = %total, "order charged");
            return Ok(entry);
        }

        Err(LedgerError::Conflict(format!(
            "balance update for {parent_id} kept racing"
        )))
    }

    /// Record a weekly/recurring order without moving funds.
    ///
    /// Appends a `DeferredCharge` entry with amount 0 and equal
    /// before/after snapshots; the eventual debit is a separate, explicit
    /// [`Ledger::realize_deferred`] call, which applies exactly once.
    pub async fn defer_charge(
        &self,
        parent_id: &str,
        order: &Order,
    ) -> ResultLedger<ParentTransaction> {
        if order.parent_id != parent_id {
            return Err(LedgerError::InvalidState(
                "order belongs to another parent".to_string(),
            ));
        }
        let parent = self.fresh_parent(parent_id).await?;

        let entry = ParentTransaction::new(
            parent_id.to_string(),
            TransactionKind::DeferredCharge,
            MoneyCents::ZERO,
            parent.balance,
            parent.balance,
            vec![order.id.to_string()],
            "weekly order deferred".to_string(),
            self.clock.now(),
        );
        transactions::ActiveModel::try_from(&entry)?
            .insert(&self.database)
            .await?;

        tracing::info!(parent = parent_id, order = %order.id, "charge deferred");
        Ok(entry)
    }

    /// Convert a deferred entry into an applied charge, exactly once.
    ///
    /// Appends a `RealizedDeferredCharge` entry linked back to its deferred
    /// origin through the unique `deferred_transaction_id` column; a second
    /// realization fails with `InvalidState` and moves nothing.
    pub async fn realize_deferred(
        &self,
        parent_id: &str,
        deferred_id: Uuid,
    ) -> ResultLedger<ParentTransaction> {
        for _ in 0..CAS_RETRIES {
            let deferred = self.transaction(deferred_id).await?;
            if deferred.parent_id != parent_id {
                return Err(LedgerError::InvalidState(
                    "deferred charge belongs to another parent".to_string(),
                ));
            }
            if deferred.kind != TransactionKind::DeferredCharge {
                return Err(LedgerError::InvalidState(format!(
                    "transaction {deferred_id} is not a deferred charge"
                )));
            }
            let already = transactions::Entity::find()
                .filter(
                    transactions::Column::DeferredTransactionId.eq(deferred_id.to_string()),
                )
                .one(&self.database)
                .await?;
            if already.is_some() {
                return Err(LedgerError::InvalidState(format!(
                    "deferred charge {deferred_id} already realized"
                )));
            }

            let total = self.deferred_total(&deferred).await?;
            let parent = self.fresh_parent(parent_id).await?;
            if parent.balance < total {
                return Err(LedgerError::InsufficientFunds(format!(
                    "balance {} cannot cover {}",
                    parent.balance, total
                )));
            }
            let after = parent.balance - total;

            let db_tx = self.database.begin().await?;
            if !Self::swap_balance(&db_tx, parent_id, parent.version, after).await? {
                db_tx.rollback().await?;
                continue;
            }

            let mut entry = ParentTransaction::new(
                parent_id.to_string(),
                TransactionKind::RealizedDeferredCharge,
                -total,
                parent.balance,
                after,
                deferred.order_ids.clone(),
                "weekly order realized".to_string(),
                self.clock.now(),
            );
            entry.deferred_transaction_id = Some(deferred_id);
            transactions::ActiveModel::try_from(&entry)?
                .insert(&db_tx)
                .await?;
            db_tx.commit().await?;

            tracing::info!(parent = parent_id, deferred = %deferred_id, amount = %total, "deferred charge realized");
            return Ok(entry);
        }

        Err(LedgerError::Conflict(format!(
            "balance update for {parent_id} kept racing"
        )))
    }

    /// Sum of the orders a deferred entry recorded.
    async fn deferred_total(&self, deferred: &ParentTransaction) -> ResultLedger<MoneyCents> {
        let mut total = MoneyCents::ZERO;
        for order_id in &deferred.order_ids {
            let order = orders::Entity::find_by_id(order_id)
                .one(&self.database)
                .await?
                .ok_or_else(|| LedgerError::KeyNotFound(order_id.clone()))?;
            total = total
                .checked_add(MoneyCents::new(order.total_minor))
                .ok_or_else(|| LedgerError::InvalidAmount("order total overflow".to_string()))?;
        }
        Ok(total)
    }

    // ────────────────────────────────────────────────────────────────────
    // Top-ups
    // ────────────────────────────────────────────────────────────────────

    /// Record a parent's request to add funds; the wallet does not move
    /// until an admin approval is applied.
    pub async fn request_topup(
        &self,
        parent_id: &str,
        amount: MoneyCents,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> ResultLedger<Topup> {
        self.fresh_parent(parent_id).await?;
        let topup = Topup::new(
            parent_id.to_string(),
            amount,
            method,
            reference,
            self.clock.now(),
        )?;
        topups::ActiveModel::from(&topup)
            .insert(&self.database)
            .await?;
        Ok(topup)
    }

    /// Admin transition `pending → approved`.
    pub async fn approve_topup(&self, topup_id: Uuid) -> ResultLedger<Topup> {
        self.transition_topup(topup_id, TopupStatus::Pending, TopupStatus::Approved)
            .await
    }

    /// Admin transition `pending → declined`.
    pub async fn decline_topup(&self, topup_id: Uuid) -> ResultLedger<Topup> {
        self.transition_topup(topup_id, TopupStatus::Pending, TopupStatus::Declined)
            .await
    }

    /// Credit an approved top-up to the wallet, exactly once.
    ///
    /// The `approved → completed` transition happens in the same database
    /// transaction as the balance credit and the ledger entry, so a top-up
    /// can never double-apply; a second call fails with `InvalidState`.
    pub async fn apply_topup(
        &self,
        parent_id: &str,
        topup_id: Uuid,
    ) -> ResultLedger<ParentTransaction> {
        for _ in 0..CAS_RETRIES {
            let topup = self.topup(topup_id).await?;
            if topup.parent_id != parent_id {
                return Err(LedgerError::InvalidState(
                    "topup belongs to another parent".to_string(),
                ));
            }
            if topup.status != TopupStatus::Approved {
                return Err(LedgerError::InvalidState(format!(
                    "topup {topup_id} is {}, not approved",
                    topup.status.as_str()
                )));
            }

            let parent = self.fresh_parent(parent_id).await?;
            let after = parent
                .balance
                .checked_add(topup.amount)
                .ok_or_else(|| LedgerError::InvalidAmount("balance overflow".to_string()))?;

            let db_tx = self.database.begin().await?;
            if !Self::swap_balance(&db_tx, parent_id, parent.version, after).await? {
                db_tx.rollback().await?;
                continue;
            }

            // Guard against a racing apply that slipped between our read
            // and the CAS window: flip the status conditionally.
            let flipped = topups::Entity::update_many()
                .col_expr(
                    topups::Column::Status,
                    Expr::value(TopupStatus::Completed.as_str()),
                )
                .filter(topups::Column::Id.eq(topup_id.to_string()))
                .filter(topups::Column::Status.eq(TopupStatus::Approved.as_str()))
                .exec(&db_tx)
                .await?;
            if flipped.rows_affected != 1 {
                db_tx.rollback().await?;
                return Err(LedgerError::InvalidState(format!(
                    "topup {topup_id} already applied"
                )));
            }

            let mut entry = ParentTransaction::new(
                parent_id.to_string(),
                TransactionKind::Topup,
                topup.amount,
                parent.balance,
                after,
                Vec::new(),
                "topup".to_string(),
                self.clock.now(),
            );
            entry.topup_id = Some(topup_id.to_string());
            transactions::ActiveModel::try_from(&entry)?
                .insert(&db_tx)
                .await?;
            db_tx.commit().await?;

            tracing::info!(parent = parent_id, topup = %topup_id, amount = %topup.amount, "topup applied");
            return Ok(entry);
        }

        Err(LedgerError::Conflict(format!(
            "balance update for {parent_id} kept racing"
        )))
    }

    pub async fn topup(&self, topup_id: Uuid) -> ResultLedger<Topup> {
        topups::Entity::find_by_id(topup_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(topup_id.to_string()))?
            .try_into()
    }

    pub async fn list_topups(
        &self,
        parent_id: Option<&str>,
        status: Option<TopupStatus>,
    ) -> ResultLedger<Vec<Topup>> {
        let mut query = topups::Entity::find().order_by_desc(topups::Column::RequestedAt);
        if let Some(parent_id) = parent_id {
            query = query.filter(topups::Column::ParentId.eq(parent_id));
        }
        if let Some(status) = status {
            query = query.filter(topups::Column::Status.eq(status.as_str()));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Topup::try_from)
            .collect()
    }

    async fn transition_topup(
        &self,
        topup_id: Uuid,
        from: TopupStatus,
        to: TopupStatus,
    ) -> ResultLedger<Topup> {
        // Ensure the row exists so a bad id is a 404, not an InvalidState.
        let topup = self.topup(topup_id).await?;

        let moved = topups::Entity::update_many()
            .col_expr(topups::Column::Status, Expr::value(to.as_str()))
            .filter(topups::Column::Id.eq(topup_id.to_string()))
            .filter(topups::Column::Status.eq(from.as_str()))
            .exec(&self.database)
            .await?;
        if moved.rows_affected != 1 {
            return Err(LedgerError::InvalidState(format!(
                "topup {topup_id} is {}, not {}",
                topup.status.as_str(),
                from.as_str()
            )));
        }

        self.topup(topup_id).await
    }

    // ────────────────────────────────────────────────────────────────────
    // Ledger entries
    // ────────────────────────────────────────────────────────────────────

    pub async fn transaction(&self, id: Uuid) -> ResultLedger<ParentTransaction> {
        transactions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(id.to_string()))?
            .try_into()
    }

    /// Newest-first ledger entries for a parent.
    pub async fn list_transactions(
        &self,
        parent_id: &str,
        limit: u64,
    ) -> ResultLedger<Vec<ParentTransaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::ParentId.eq(parent_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ParentTransaction::try_from)
            .collect()
    }

    /// Replay the parent's ledger in creation order and return the summed
    /// amount.
    ///
    /// A mismatch with the stored balance means the ledger is corrupt
    /// somewhere; it is logged and left for a human — the balance is never
    /// silently overwritten to match.
    pub async fn reconcile(&self, parent_id: &str) -> ResultLedger<MoneyCents> {
        let parent = self.fresh_parent(parent_id).await?;
        let entries = transactions::Entity::find()
            .filter(transactions::Column::ParentId.eq(parent_id))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;

        let mut replayed = MoneyCents::ZERO;
        for entry in entries {
            replayed = replayed
                .checked_add(MoneyCents::new(entry.amount_minor))
                .ok_or_else(|| LedgerError::InvalidAmount("ledger sum overflow".to_string()))?;
        }

        if replayed != parent.balance {
            tracing::warn!(
                parent = parent_id,
                stored = %parent.balance,
                replayed = %replayed,
                "ledger does not reconcile with stored balance"
            );
        }
        Ok(replayed)
    }

    // ────────────────────────────────────────────────────────────────────
    // Orders
    // ────────────────────────────────────────────────────────────────────

    /// Place an order for a linked student: snapshot the menu lines,
    /// persist the order, then charge the wallet — or record a deferred
    /// charge when `deferred` is set.
    ///
    /// If the charge fails (typically `InsufficientFunds`) the order rows
    /// are removed again; nothing of the attempt remains observable.
    pub async fn place_order(
        &self,
        parent_id: &str,
        student_id: Uuid,
        lines: &[(Uuid, i64)],
        deferred: bool,
        instructions: Option<String>,
    ) -> ResultLedger<(Order, ParentTransaction)> {
        let student = self.student(student_id).await?;
        if student.parent_id.as_deref() != Some(parent_id) {
            return Err(LedgerError::InvalidState(format!(
                "student {student_id} is not linked to {parent_id}"
            )));
        }

        let mut items = Vec::with_capacity(lines.len());
        for (menu_item_id, quantity) in lines {
            let item = self.menu_item(*menu_item_id).await?;
            if !item.available {
                return Err(LedgerError::InvalidState(format!(
                    "menu item {} is not available",
                    item.name
                )));
            }
            items.push(OrderItem::new(
                item.id,
                item.name.clone(),
                item.price,
                *quantity,
            )?);
        }

        let order = Order::new(
            parent_id.to_string(),
            student_id,
            items,
            self.clock.now(),
            instructions,
        )?;

        let db_tx = self.database.begin().await?;
        orders::ActiveModel::from(&order).insert(&db_tx).await?;
        for item in &order.items {
            item.active_model(order.id).insert(&db_tx).await?;
        }
        db_tx.commit().await?;

        let charge = if deferred {
            self.defer_charge(parent_id, &order).await
        } else {
            self.charge_order(parent_id, &order).await
        };

        match charge {
            Ok(entry) => {
                // Stock moves only for orders that were actually accepted.
                for item in &order.items {
                    self.take_stock(&self.database, item.menu_item_id, item.quantity)
                        .await?;
                }
                Ok((order, entry))
            }
            Err(err) => {
                if let Err(cleanup) = self.discard_order(order.id).await {
                    tracing::error!(order = %order.id, "failed to discard uncharged order: {cleanup}");
                }
                Err(err)
            }
        }
    }

    /// Drive the order status state machine, stamping terminal timestamps.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> ResultLedger<Order> {
        let mut order = self.order(order_id).await?;
        order.transition(next, self.clock.now())?;

        orders::ActiveModel {
            id: sea_orm::ActiveValue::Set(order.id.to_string()),
            status: sea_orm::ActiveValue::Set(order.status.as_str().to_string()),
            completed_at: sea_orm::ActiveValue::Set(order.completed_at),
            cancelled_at: sea_orm::ActiveValue::Set(order.cancelled_at),
            ..Default::default()
        }
        .update(&self.database)
        .await?;

        Ok(order)
    }

    /// Return an order with its snapshot lines loaded.
    pub async fn order(&self, order_id: Uuid) -> ResultLedger<Order> {
        let model = orders::Entity::find_by_id(order_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(order_id.to_string()))?;
        let mut order = Order::try_from(model)?;
        order.items = self.order_lines(order_id).await?;
        Ok(order)
    }

    pub async fn list_orders(
        &self,
        parent_id: Option<&str>,
        status: Option<OrderStatus>,
    ) -> ResultLedger<Vec<Order>> {
        let mut query = orders::Entity::find().order_by_desc(orders::Column::OrderDate);
        if let Some(parent_id) = parent_id {
            query = query.filter(orders::Column::ParentId.eq(parent_id));
        }
        if let Some(status) = status {
            query = query.filter(orders::Column::Status.eq(status.as_str()));
        }

        let mut out = Vec::new();
        for model in query.all(&self.database).await? {
            let mut order = Order::try_from(model)?;
            order.items = self.order_lines(order.id).await?;
            out.push(order);
        }
        Ok(out)
    }

    async fn order_lines(&self, order_id: Uuid) -> ResultLedger<Vec<OrderItem>> {
        order_items::Entity::find()
            .filter(order_items::Column::OrderId.eq(order_id.to_string()))
            .all(&self.database)
            .await?
            .into_iter()
            .map(OrderItem::try_from)
            .collect()
    }

    async fn discard_order(&self, order_id: Uuid) -> ResultLedger<()> {
        let db_tx = self.database.begin().await?;
        order_items::Entity::delete_many()
            .filter(order_items::Column::OrderId.eq(order_id.to_string()))
            .exec(&db_tx)
            .await?;
        orders::Entity::delete_many()
            .filter(orders::Column::Id.eq(order_id.to_string()))
            .exec(&db_tx)
            .await?;
        db_tx.commit().await?;
        Ok(())
    }

    /// Decrement advisory stock, clamping at zero.
    async fn take_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        menu_item_id: Uuid,
        quantity: i64,
    ) -> ResultLedger<()> {
        let Some(item) = menu::Entity::find_by_id(menu_item_id.to_string())
            .one(conn)
            .await?
        else {
            return Err(LedgerError::KeyNotFound(menu_item_id.to_string()));
        };
        let Some(stock) = item.stock else {
            return Ok(());
        };

        let remaining = (i64::from(stock) - quantity).max(0) as i32;
        menu::Entity::update_many()
            .col_expr(menu::Column::Stock, Expr::value(remaining))
            .filter(menu::Column::Id.eq(menu_item_id.to_string()))
            .exec(conn)
            .await?;
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────
    // Menu
    // ────────────────────────────────────────────────────────────────────

    pub async fn add_menu_item(&self, item: &MenuItem) -> ResultLedger<()> {
        menu::ActiveModel::from(item).insert(&self.database).await?;
        Ok(())
    }

    pub async fn update_menu_item(
        &self,
        id: Uuid,
        price: Option<MoneyCents>,
        available: Option<bool>,
        stock: Option<Option<i32>>,
    ) -> ResultLedger<MenuItem> {
        let mut item = self.menu_item(id).await?;
        if let Some(price) = price {
            if price.is_negative() {
                return Err(LedgerError::InvalidAmount(format!(
                    "menu price must be >= 0, got {price}"
                )));
            }
            item.price = price;
        }
        if let Some(available) = available {
            item.available = available;
        }
        if let Some(stock) = stock {
            if let Some(stock) = stock
                && stock < 0
            {
                return Err(LedgerError::InvalidAmount(format!(
                    "stock must be >= 0, got {stock}"
                )));
            }
            item.stock = stock;
        }

        menu::ActiveModel::from(&item).update(&self.database).await?;
        Ok(item)
    }

    pub async fn menu_item(&self, id: Uuid) -> ResultLedger<MenuItem> {
        menu::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(id.to_string()))?
            .try_into()
    }

    pub async fn list_menu(&self, available_only: bool) -> ResultLedger<Vec<MenuItem>> {
        let mut query = menu::Entity::find().order_by_asc(menu::Column::Name);
        if available_only {
            query = query.filter(menu::Column::Available.eq(true));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(MenuItem::try_from)
            .collect()
    }

    // ────────────────────────────────────────────────────────────────────
    // Students
    // ────────────────────────────────────────────────────────────────────

    pub async fn add_student(&self, student: &Student) -> ResultLedger<()> {
        if let Some(parent_id) = &student.parent_id {
            self.fresh_parent(parent_id).await?;
        }
        students::ActiveModel::from(student)
            .insert(&self.database)
            .await?;
        Ok(())
    }

    /// Link a student to a parent wallet, or unlink with `None`.
    ///
    /// A student references at most one parent; relinking replaces the
    /// previous link.
    pub async fn link_student(
        &self,
        student_id: Uuid,
        parent_id: Option<&str>,
    ) -> ResultLedger<Student> {
        let mut student = self.student(student_id).await?;
        if let Some(parent_id) = parent_id {
            self.fresh_parent(parent_id).await?;
        }
        student.parent_id = parent_id.map(|id| id.to_string());

        students::ActiveModel::from(&student)
            .update(&self.database)
            .await?;
        Ok(student)
    }

    pub async fn student(&self, student_id: Uuid) -> ResultLedger<Student> {
        students::Entity::find_by_id(student_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(student_id.to_string()))?
            .try_into()
    }

    pub async fn list_students(&self, parent_id: Option<&str>) -> ResultLedger<Vec<Student>> {
        let mut query = students::Entity::find().order_by_asc(students::Column::Name);
        if let Some(parent_id) = parent_id {
            query = query.filter(students::Column::ParentId.eq(parent_id));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Student::try_from)
            .collect()
    }

    // ────────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────────

    /// Read the parent row as it is in the database right now.
    async fn fresh_parent(&self, user_id: &str) -> ResultLedger<Parent> {
        parents::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(Parent::from)
            .ok_or_else(|| LedgerError::KeyNotFound(user_id.to_string()))
    }

    /// Conditional balance write: succeeds only if the row still carries
    /// `expected_version`. Returns whether the swap took effect.
    async fn swap_balance<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        expected_version: i64,
        new_balance: MoneyCents,
    ) -> ResultLedger<bool> {
        let result = parents::Entity::update_many()
            .col_expr(parents::Column::BalanceMinor, Expr::value(new_balance.cents()))
            .col_expr(parents::Column::Version, Expr::value(expected_version + 1))
            .filter(parents::Column::UserId.eq(user_id))
            .filter(parents::Column::Version.eq(expected_version))
            .exec(conn)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

/// The builder for `Ledger`.
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
    clock: Option<Arc<dyn Clock>>,
}

impl LedgerBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Override the time source (tests use a fixed clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> LedgerBuilder {
        self.clock = Some(clock);
        self
    }

    /// Construct `Ledger`.
    pub fn build(self) -> Ledger {
        Ledger {
            database: self.database,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}
