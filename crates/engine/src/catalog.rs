//! Product catalog seam.
//!
//! Budget items point at *base products* (company-agnostic templates). Once a
//! budget is released or stocked, each item is replicated into a *company
//! product* owned by the budget's company. The engine only talks to the
//! catalog through [`Catalog`]; [`DbCatalog`] is the default, table-backed
//! implementation.

use std::{fmt::Debug, future::Future, pin::Pin};

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    error::EntityKind,
    util::{normalize_required, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseProduct {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub active: bool,
}

impl BaseProduct {
    pub fn new(id: &str, sku: &str, name: &str) -> ResultEngine<Self> {
        Ok(Self {
            id: normalize_required(id, "base product id")?,
            sku: normalize_required(sku, "sku")?,
            name: normalize_required(name, "product name")?,
            active: true,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProduct {
    pub id: Uuid,
    pub company_id: String,
    pub base_product_id: String,
    pub sku: String,
    pub name: String,
    pub price_minor: i64,
    pub points: i64,
    pub stock: i64,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create or refresh the company product for one budget item.
#[derive(Clone, Debug)]
pub struct ProductUpsert {
    pub company_id: String,
    pub base: BaseProduct,
    pub price_minor: i64,
    pub points: i64,
    /// Units added to stock.
    pub qty: i64,
    pub actor_id: String,
    pub now: DateTime<Utc>,
}

pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

/// Access to base and company products.
///
/// Calls receive the engine's open transaction so catalog writes commit or
/// roll back together with the budget transition that triggered them.
pub trait Catalog: Send + Sync + Debug {
    fn base_product<'a>(
        &'a self,
        db: &'a DatabaseTransaction,
        base_product_id: &'a str,
    ) -> CatalogFuture<'a, BaseProduct>;

    /// Idempotent per `(company_id, base product)`: a second call updates
    /// pricing and adds `qty` to stock instead of creating a duplicate.
    fn upsert_company_product<'a>(
        &'a self,
        db: &'a DatabaseTransaction,
        request: &'a ProductUpsert,
    ) -> CatalogFuture<'a, CompanyProduct>;
}

/// Catalog backed by the `base_products` / `company_products` tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct DbCatalog;

impl Catalog for DbCatalog {
    fn base_product<'a>(
        &'a self,
        db: &'a DatabaseTransaction,
        base_product_id: &'a str,
    ) -> CatalogFuture<'a, BaseProduct> {
        Box::pin(async move {
            let model = base_products::Entity::find_by_id(base_product_id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::not_found(EntityKind::BaseProduct, base_product_id))?;
            Ok(BaseProduct::from(model))
        })
    }

    fn upsert_company_product<'a>(
        &'a self,
        db: &'a DatabaseTransaction,
        request: &'a ProductUpsert,
    ) -> CatalogFuture<'a, CompanyProduct> {
        Box::pin(async move {
            let existing = company_products::Entity::find()
                .filter(company_products::Column::CompanyId.eq(request.company_id.clone()))
                .filter(company_products::Column::BaseProductId.eq(request.base.id.clone()))
                .one(db)
                .await?;

            let model = match existing {
                Some(model) => {
                    let stock = model.stock.checked_add(request.qty).ok_or_else(|| {
                        EngineError::InvalidAmount("stock overflow".to_string())
                    })?;
                    let mut active: company_products::ActiveModel = model.into();
                    active.price_minor = ActiveValue::Set(request.price_minor);
                    active.points = ActiveValue::Set(request.points);
                    active.stock = ActiveValue::Set(stock);
                    active.updated_by = ActiveValue::Set(request.actor_id.clone());
                    active.updated_at = ActiveValue::Set(request.now);
                    active.update(db).await?
                }
                None => {
                    company_products::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4().to_string()),
                        company_id: ActiveValue::Set(request.company_id.clone()),
                        base_product_id: ActiveValue::Set(request.base.id.clone()),
                        sku: ActiveValue::Set(format!(
                            "{}-{}",
                            request.base.sku, request.company_id
                        )),
                        name: ActiveValue::Set(request.base.name.clone()),
                        price_minor: ActiveValue::Set(request.price_minor),
                        points: ActiveValue::Set(request.points),
                        stock: ActiveValue::Set(request.qty),
                        updated_by: ActiveValue::Set(request.actor_id.clone()),
                        created_at: ActiveValue::Set(request.now),
                        updated_at: ActiveValue::Set(request.now),
                    }
                    .insert(db)
                    .await?
                }
            };
            CompanyProduct::try_from(model)
        })
    }
}

/// Insert a base product row. Used for seeding from the admin CLI and tests.
pub async fn insert_base_product<C: ConnectionTrait>(
    db: &C,
    product: &BaseProduct,
) -> ResultEngine<()> {
    base_products::ActiveModel::from(product).insert(db).await?;
    Ok(())
}

/// Company products currently listed for `company_id`, by SKU.
pub async fn company_products_of<C: ConnectionTrait>(
    db: &C,
    company_id: &str,
) -> ResultEngine<Vec<CompanyProduct>> {
    use sea_orm::QueryOrder;

    company_products::Entity::find()
        .filter(company_products::Column::CompanyId.eq(company_id.to_string()))
        .order_by_asc(company_products::Column::Sku)
        .all(db)
        .await?
        .into_iter()
        .map(CompanyProduct::try_from)
        .collect()
}

pub mod base_products {
    use sea_orm::{ActiveValue, entity::prelude::*};

    use super::BaseProduct;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "base_products")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        #[sea_orm(unique)]
        pub sku: String,
        pub name: String,
        pub active: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::company_products::Entity")]
        CompanyProducts,
    }

    impl Related<super::company_products::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::CompanyProducts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl From<&BaseProduct> for ActiveModel {
        fn from(value: &BaseProduct) -> Self {
            Self {
                id: ActiveValue::Set(value.id.clone()),
                sku: ActiveValue::Set(value.sku.clone()),
                name: ActiveValue::Set(value.name.clone()),
                active: ActiveValue::Set(value.active),
            }
        }
    }

    impl From<Model> for BaseProduct {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                sku: model.sku,
                name: model.name,
                active: model.active,
            }
        }
    }
}

pub mod company_products {
    use sea_orm::entity::prelude::*;

    use super::{CompanyProduct, parse_uuid};
    use crate::EngineError;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "company_products")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub company_id: String,
        pub base_product_id: String,
        pub sku: String,
        pub name: String,
        pub price_minor: i64,
        pub points: i64,
        pub stock: i64,
        pub updated_by: String,
        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::base_products::Entity",
            from = "Column::BaseProductId",
            to = "super::base_products::Column::Id",
            on_update = "NoAction",
            on_delete = "NoAction"
        )]
        BaseProducts,
    }

    impl Related<super::base_products::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::BaseProducts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    impl TryFrom<Model> for CompanyProduct {
        type Error = EngineError;

        fn try_from(model: Model) -> Result<Self, Self::Error> {
            Ok(Self {
                id: parse_uuid(&model.id, "company product")?,
                company_id: model.company_id,
                base_product_id: model.base_product_id,
                sku: model.sku,
                name: model.name,
                price_minor: model.price_minor,
                points: model.points,
                stock: model.stock,
                updated_by: model.updated_by,
                created_at: model.created_at,
                updated_at: model.updated_at,
            })
        }
    }
}
