//! Wire format of the Ivy wallet endpoints
//!
//! Every payload carries the stable `id` and the server `updatedAt` timestamp
//! (epoch seconds). `updatedAt` is assigned by the server and left out on
//! upload.

use crate::models::{Account, Budget, Category, Syncable, Transaction, TransactionType};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity that has a json representation on the backend
pub trait RemoteEntity: Syncable {
    type Dto: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static;

    fn to_dto(&self) -> Self::Dto;

    /// Fetched records are always stored clean
    fn from_dto(dto: Self::Dto) -> Self;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub color: i32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_num: f64,
    #[serde(default = "default_true")]
    pub include_in_balance: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: i32,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_num: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: Uuid,
    pub account_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: f64,
    #[serde(default)]
    pub to_account_id: Option<Uuid>,
    #[serde(default)]
    pub to_amount: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurring_rule_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDto {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub category_ids_serialized: Option<String>,
    #[serde(default)]
    pub account_ids_serialized: Option<String>,
    #[serde(default)]
    pub order_id: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl RemoteEntity for Account {
    type Dto = AccountDto;

    fn to_dto(&self) -> AccountDto {
        AccountDto {
            id: self.id,
            name: self.name.clone(),
            currency: self.currency.clone(),
            color: self.color,
            icon: self.icon.clone(),
            order_num: self.order_num,
            include_in_balance: self.include_in_balance,
            updated_at: None,
        }
    }

    fn from_dto(dto: AccountDto) -> Self {
        Account {
            id: dto.id,
            name: dto.name,
            currency: dto.currency,
            color: dto.color,
            icon: dto.icon,
            order_num: dto.order_num,
            include_in_balance: dto.include_in_balance,
            is_synced: true,
            is_deleted: false,
        }
    }
}

impl RemoteEntity for Category {
    type Dto = CategoryDto;

    fn to_dto(&self) -> CategoryDto {
        CategoryDto {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
            icon: self.icon.clone(),
            order_num: self.order_num,
            updated_at: None,
        }
    }

    fn from_dto(dto: CategoryDto) -> Self {
        Category {
            id: dto.id,
            name: dto.name,
            color: dto.color,
            icon: dto.icon,
            order_num: dto.order_num,
            is_synced: true,
            is_deleted: false,
        }
    }
}

impl RemoteEntity for Transaction {
    type Dto = TransactionDto;

    fn to_dto(&self) -> TransactionDto {
        TransactionDto {
            id: self.id,
            account_id: self.account_id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            to_account_id: self.to_account_id,
            to_amount: self.to_amount,
            title: self.title.clone(),
            description: self.description.clone(),
            date_time: self.date_time,
            category_id: self.category_id,
            due_date: self.due_date,
            recurring_rule_id: self.recurring_rule_id,
            updated_at: None,
        }
    }

    fn from_dto(dto: TransactionDto) -> Self {
        Transaction {
            id: dto.id,
            account_id: dto.account_id,
            transaction_type: dto.transaction_type,
            amount: dto.amount,
            to_account_id: dto.to_account_id,
            to_amount: dto.to_amount,
            title: dto.title,
            description: dto.description,
            date_time: dto.date_time,
            category_id: dto.category_id,
            due_date: dto.due_date,
            recurring_rule_id: dto.recurring_rule_id,
            is_synced: true,
            is_deleted: false,
        }
    }
}

impl RemoteEntity for Budget {
    type Dto = BudgetDto;

    fn to_dto(&self) -> BudgetDto {
        BudgetDto {
            id: self.id,
            name: self.name.clone(),
            amount: self.amount,
            category_ids_serialized: self.category_ids_serialized.clone(),
            account_ids_serialized: self.account_ids_serialized.clone(),
            order_id: self.order_id,
            updated_at: None,
        }
    }

    fn from_dto(dto: BudgetDto) -> Self {
        Budget {
            id: dto.id,
            name: dto.name,
            amount: dto.amount,
            category_ids_serialized: dto.category_ids_serialized,
            account_ids_serialized: dto.account_ids_serialized,
            order_id: dto.order_id,
            is_synced: true,
            is_deleted: false,
        }
    }
}
