use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod menu {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Category {
        Main,
        Snack,
        Drink,
        Dessert,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuItemNew {
        pub name: String,
        /// Integer euro cents.
        pub price_minor: i64,
        pub category: Category,
        /// `None` = unlimited.
        pub stock: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuItemUpdate {
        pub price_minor: Option<i64>,
        pub available: Option<bool>,
        /// Outer `None` leaves stock untouched; `Some(None)` sets unlimited.
        #[serde(default, with = "super::double_option")]
        pub stock: Option<Option<i32>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuItemView {
        pub id: Uuid,
        pub name: String,
        pub price_minor: i64,
        pub category: Category,
        pub available: bool,
        pub stock: Option<i32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MenuResponse {
        pub items: Vec<MenuItemView>,
    }
}

pub mod student {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StudentNew {
        pub name: String,
        pub grade: String,
        pub dietary_notes: Option<String>,
        /// Parent to link at creation, if already known.
        pub parent_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StudentLink {
        /// `None` unlinks the student from its parent.
        pub parent_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StudentView {
        pub id: Uuid,
        pub parent_id: Option<String>,
        pub name: String,
        pub grade: String,
        pub dietary_notes: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StudentsResponse {
        pub students: Vec<StudentView>,
    }
}

pub mod order {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderStatus {
        Pending,
        Confirmed,
        Preparing,
        Ready,
        Completed,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderLineNew {
        pub menu_item_id: Uuid,
        pub quantity: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderNew {
        pub student_id: Uuid,
        pub lines: Vec<OrderLineNew>,
        /// Record the charge but defer the debit (weekly orders).
        #[serde(default)]
        pub deferred: bool,
        pub instructions: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderLineView {
        pub menu_item_id: Uuid,
        pub name: String,
        pub price_minor: i64,
        pub quantity: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderView {
        pub id: Uuid,
        pub parent_id: String,
        pub student_id: Uuid,
        pub status: OrderStatus,
        pub total_minor: i64,
        pub order_date: DateTime<Utc>,
        pub completed_at: Option<DateTime<Utc>>,
        pub cancelled_at: Option<DateTime<Utc>>,
        pub instructions: Option<String>,
        pub lines: Vec<OrderLineView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrdersResponse {
        pub orders: Vec<OrderView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OrderStatusUpdate {
        pub status: OrderStatus,
    }
}

pub mod topup {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TopupStatus {
        Pending,
        Approved,
        Declined,
        Completed,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        Cash,
        BankTransfer,
        Card,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopupNew {
        /// Integer euro cents, must be > 0.
        pub amount_minor: i64,
        pub method: PaymentMethod,
        pub reference: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopupView {
        pub id: Uuid,
        pub parent_id: String,
        pub amount_minor: i64,
        pub status: TopupStatus,
        pub method: PaymentMethod,
        pub reference: Option<String>,
        pub requested_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopupsResponse {
        pub topups: Vec<TopupView>,
    }
}

pub mod wallet {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionClass {
        Topup,
        Deduction,
        PendingDeferred,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletView {
        pub parent_id: String,
        pub balance_minor: i64,
        pub children: Vec<String>,
    }

    /// Balance plus the ledger replay, for admin diagnostics.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct WalletAudit {
        pub parent_id: String,
        pub balance_minor: i64,
        pub replayed_minor: i64,
        pub consistent: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub class: TransactionClass,
        pub amount_minor: i64,
        pub balance_before_minor: i64,
        pub balance_after_minor: i64,
        pub order_ids: Vec<String>,
        pub reason: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionsResponse {
        pub transactions: Vec<TransactionView>,
    }
}

/// Serde helper distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
