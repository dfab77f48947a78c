//! Initial schema migration - creates all tables from scratch.
//!
//! Complete schema for the canteen ordering backend:
//!
//! - `users`: authentication (admin and parent logins)
//! - `parents`: wallet owners with balance and optimistic-concurrency version
//! - `students`: student profiles, each linked to at most one parent
//! - `menu_items`: the canteen catalog
//! - `orders`: placed orders with their status machine state
//! - `order_items`: price/name snapshot lines per order
//! - `topups`: parent requests to add funds, pending admin approval
//! - `parent_transactions`: the append-only wallet ledger

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Role,
}

#[derive(Iden)]
enum Parents {
    Table,
    UserId,
    BalanceMinor,
    Version,
}

#[derive(Iden)]
enum Students {
    Table,
    Id,
    ParentId,
    Name,
    Grade,
    DietaryNotes,
    LegacyBalance,
}

#[derive(Iden)]
enum MenuItems {
    Table,
    Id,
    Name,
    PriceMinor,
    Category,
    Available,
    Stock,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
    ParentId,
    StudentId,
    Status,
    TotalMinor,
    OrderDate,
    CompletedAt,
    CancelledAt,
    Instructions,
}

#[derive(Iden)]
enum OrderItems {
    Table,
    Id,
    OrderId,
    MenuItemId,
    Name,
    PriceMinor,
    Quantity,
}

#[derive(Iden)]
enum Topups {
    Table,
    Id,
    ParentId,
    AmountMinor,
    Status,
    Method,
    Reference,
    RequestedAt,
}

#[derive(Iden)]
enum ParentTransactions {
    Table,
    Id,
    ParentId,
    Kind,
    AmountMinor,
    BalanceBeforeMinor,
    BalanceAfterMinor,
    OrderIds,
    TopupId,
    DeferredTransactionId,
    Reason,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("parent"),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Parents
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Parents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parents::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Parents::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Parents::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parents-user_id")
                            .from(Parents::Table, Parents::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Students
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Students::ParentId).string())
                    .col(ColumnDef::new(Students::Name).string().not_null())
                    .col(ColumnDef::new(Students::Grade).string().not_null())
                    .col(ColumnDef::new(Students::DietaryNotes).string())
                    .col(
                        ColumnDef::new(Students::LegacyBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-students-parent_id")
                            .from(Students::Table, Students::ParentId)
                            .to(Parents::Table, Parents::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-students-parent_id")
                    .table(Students::Table)
                    .col(Students::ParentId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Menu items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(MenuItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MenuItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MenuItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(MenuItems::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MenuItems::Category).string().not_null())
                    .col(ColumnDef::new(MenuItems::Available).boolean().not_null())
                    .col(ColumnDef::new(MenuItems::Stock).integer())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Orders
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Orders::ParentId).string().not_null())
                    .col(ColumnDef::new(Orders::StudentId).string().not_null())
                    .col(ColumnDef::new(Orders::Status).string().not_null())
                    .col(ColumnDef::new(Orders::TotalMinor).big_integer().not_null())
                    .col(ColumnDef::new(Orders::OrderDate).timestamp().not_null())
                    .col(ColumnDef::new(Orders::CompletedAt).timestamp())
                    .col(ColumnDef::new(Orders::CancelledAt).timestamp())
                    .col(ColumnDef::new(Orders::Instructions).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-parent_id")
                            .from(Orders::Table, Orders::ParentId)
                            .to(Parents::Table, Parents::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-student_id")
                            .from(Orders::Table, Orders::StudentId)
                            .to(Students::Table, Students::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-orders-parent_id-order_date")
                    .table(Orders::Table)
                    .col(Orders::ParentId)
                    .col(Orders::OrderDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Order items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).string().not_null())
                    .col(ColumnDef::new(OrderItems::MenuItemId).string().not_null())
                    .col(ColumnDef::new(OrderItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(OrderItems::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderItems::Quantity).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_items-order_id")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-order_items-order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Top-ups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Topups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Topups::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Topups::ParentId).string().not_null())
                    .col(ColumnDef::new(Topups::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Topups::Status).string().not_null())
                    .col(ColumnDef::new(Topups::Method).string().not_null())
                    .col(ColumnDef::new(Topups::Reference).string())
                    .col(ColumnDef::new(Topups::RequestedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-topups-parent_id")
                            .from(Topups::Table, Topups::ParentId)
                            .to(Parents::Table, Parents::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-topups-parent_id-status")
                    .table(Topups::Table)
                    .col(Topups::ParentId)
                    .col(Topups::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Parent transactions (the wallet ledger)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ParentTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParentTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ParentTransactions::ParentId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParentTransactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(ParentTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentTransactions::BalanceBeforeMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentTransactions::BalanceAfterMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentTransactions::OrderIds)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ParentTransactions::TopupId).string())
                    .col(ColumnDef::new(ParentTransactions::DeferredTransactionId).string())
                    .col(
                        ColumnDef::new(ParentTransactions::Reason)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParentTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parent_transactions-parent_id")
                            .from(ParentTransactions::Table, ParentTransactions::ParentId)
                            .to(Parents::Table, Parents::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parent_transactions-parent_id-created_at")
                    .table(ParentTransactions::Table)
                    .col(ParentTransactions::ParentId)
                    .col(ParentTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // A top-up credits the wallet at most once.
        manager
            .create_index(
                Index::create()
                    .name("idx-parent_transactions-topup_id-unique")
                    .table(ParentTransactions::Table)
                    .col(ParentTransactions::TopupId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // A deferred charge is realized at most once.
        manager
            .create_index(
                Index::create()
                    .name("idx-parent_transactions-deferred-unique")
                    .table(ParentTransactions::Table)
                    .col(ParentTransactions::DeferredTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ParentTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Topups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MenuItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
