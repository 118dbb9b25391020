//! Location store: append-only position reports.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::location;
use crate::error::{AppError, AppResult};

/// Insert one report. Any failure rolls the transaction back and surfaces
/// as [`AppError::StoreFailure`] with the cause attached.
pub async fn insert_location(
    db: &DatabaseConnection,
    user_id: Uuid,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
) -> AppResult<location::Model> {
    let txn = db.begin().await.map_err(AppError::StoreFailure)?;

    let report = location::ActiveModel {
        user_id: Set(user_id),
        latitude: Set(latitude),
        longitude: Set(longitude),
        timestamp: Set(timestamp.fixed_offset()),
        ..Default::default()
    };

    // Dropping an uncommitted transaction rolls it back
    let report = report.insert(&txn).await.map_err(AppError::StoreFailure)?;
    txn.commit().await.map_err(AppError::StoreFailure)?;

    Ok(report)
}

/// All reports at or after `since`, in no particular order.
pub async fn reports_since(
    db: &DatabaseConnection,
    since: DateTime<Utc>,
) -> AppResult<Vec<location::Model>> {
    let reports = location::Entity::find()
        .filter(location::Column::Timestamp.gte(since.fixed_offset()))
        .all(db)
        .await?;

    Ok(reports)
}
