//! Attribute definitions: the admin-managed vocabulary products attach
//! values to.

use tracing::{info, instrument};

use crate::catalog::types::Attribute;
use crate::error::{StoreError, StoreResult};
use crate::util::db::Db;

pub const ATTRIBUTE_TYPES: [&str; 4] = ["text", "number", "boolean", "select"];

pub fn valid_attribute_type(raw: &str) -> bool {
    ATTRIBUTE_TYPES.contains(&raw)
}

#[derive(Debug, Clone)]
pub struct AttributeInput {
    pub attribute_name: String,
    pub attribute_type: String,
    pub is_filterable: bool,
    pub display_order: i32,
}

#[instrument(skip(db))]
pub async fn list_attributes(db: &Db) -> StoreResult<Vec<Attribute>> {
    let rows = sqlx::query_as(
        "SELECT attribute_id, attribute_name, attribute_type, is_filterable, display_order
         FROM attributes ORDER BY display_order, attribute_id",
    )
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}

fn validate(input: &AttributeInput) -> StoreResult<String> {
    let name = input.attribute_name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::validation("attribute name is required"));
    }
    if !valid_attribute_type(&input.attribute_type) {
        return Err(StoreError::validation(
            "attribute type must be one of text, number, boolean, select",
        ));
    }
    Ok(name)
}

#[instrument(skip(db, input), fields(name = %input.attribute_name))]
pub async fn create_attribute(db: &Db, input: AttributeInput) -> StoreResult<Attribute> {
    let name = validate(&input)?;
    let row: Attribute = sqlx::query_as(
        "INSERT INTO attributes (attribute_name, attribute_type, is_filterable, display_order)
         VALUES ($1, $2, $3, $4)
         RETURNING attribute_id, attribute_name, attribute_type, is_filterable, display_order",
    )
    .bind(&name)
    .bind(&input.attribute_type)
    .bind(input.is_filterable)
    .bind(input.display_order)
    .fetch_one(&db.pool)
    .await?;
    info!(attribute_id = row.attribute_id, "attribute created");
    Ok(row)
}

#[instrument(skip(db, input))]
pub async fn update_attribute(db: &Db, attribute_id: i64, input: AttributeInput) -> StoreResult<Attribute> {
    let name = validate(&input)?;
    sqlx::query_as(
        "UPDATE attributes
         SET attribute_name = $2, attribute_type = $3, is_filterable = $4,
             display_order = $5
         WHERE attribute_id = $1
         RETURNING attribute_id, attribute_name, attribute_type, is_filterable, display_order",
    )
    .bind(attribute_id)
    .bind(&name)
    .bind(&input.attribute_type)
    .bind(input.is_filterable)
    .bind(input.display_order)
    .fetch_optional(&db.pool)
    .await?
    .ok_or(StoreError::NotFound("attribute"))
}

/// Hard delete, blocked while any product value references the definition.
#[instrument(skip(db))]
pub async fn delete_attribute(db: &Db, attribute_id: i64) -> StoreResult<()> {
    let in_use: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_attributes WHERE attribute_id = $1")
            .bind(attribute_id)
            .fetch_one(&db.pool)
            .await?;
    if in_use > 0 {
        return Err(StoreError::validation(
            "attribute is in use by products and cannot be deleted",
        ));
    }
    let result = sqlx::query("DELETE FROM attributes WHERE attribute_id = $1")
        .bind(attribute_id)
        .execute(&db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("attribute"));
    }
    info!(attribute_id, "attribute deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_type_vocabulary() {
        for t in ATTRIBUTE_TYPES {
            assert!(valid_attribute_type(t));
        }
        assert!(!valid_attribute_type("json"));
        assert!(!valid_attribute_type("TEXT"));
    }
}
