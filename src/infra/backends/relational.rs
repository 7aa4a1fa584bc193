//! Relational backend (SeaORM).
//!
//! Prefix search is `LIKE 'q%'` against the normalized `lower` column, not a
//! database collation, so behavior matches the other engines exactly. The
//! dynamic document interface is mapped onto typed entities per collection.

use async_trait::async_trait;
use sea_orm::sea_query::{Condition, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IdenStatic, IntoActiveModel, Iterable, QueryFilter,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::infra::adapter::{
    from_document, stamp_new, stamp_updated, to_document, Document, EntityKind, QueryAdapter,
    StoreError, StoreResult,
};
use crate::infra::entities;

/// Resolve a document field name to an entity column.
fn column_of<E: EntityTrait>(field: &str) -> Option<E::Column> {
    E::Column::iter().find(|c| c.as_str() == field)
}

/// Convert a JSON filter value to a database value, parsing id-typed fields
/// into proper UUIDs.
fn filter_value(field: &str, value: &Value) -> sea_orm::Value {
    if field == "id" || field.ends_with("_id") {
        if let Some(parsed) = value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
            return parsed.into();
        }
    }

    match value {
        Value::String(s) => s.clone().into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        other => other.to_string().into(),
    }
}

/// `state = true` filter, skipped for collections without a state column.
fn active_only<E: EntityTrait>() -> Condition {
    match column_of::<E>("state") {
        Some(col) => Condition::all().add(col.eq(true)),
        None => Condition::all(),
    }
}

/// Case-insensitive LIKE over a column that is not pre-lowercased.
fn lower_like<E: EntityTrait>(col: E::Column, pattern: String) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(pattern)
}

/// Storage engine backed by a relational database.
pub struct RelationalBackend {
    db: DatabaseConnection,
}

impl RelationalBackend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn insert_generic<E, A>(&self, mut doc: Document) -> StoreResult<Document>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<A> + Serialize + DeserializeOwned + Send,
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    {
        stamp_new(&mut doc);
        let model: E::Model = from_document(doc)?;
        let saved = model
            .into_active_model()
            .reset_all()
            .insert(&self.db)
            .await?;
        to_document(&saved)
    }

    async fn find_by_id_generic<E, A>(&self, id: Uuid) -> StoreResult<Option<Document>>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let id_col = column_of::<E>("id")
            .ok_or_else(|| StoreError::Backend("collection has no id column".into()))?;

        let found = E::find()
            .filter(Condition::all().add(id_col.eq(id)))
            .one(&self.db)
            .await?;

        found.as_ref().map(to_document).transpose()
    }

    async fn find_exact_generic<E, A>(&self, fields: Document) -> StoreResult<Vec<Document>>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let mut cond = active_only::<E>();
        for (field, value) in &fields {
            let col = column_of::<E>(field)
                .ok_or_else(|| StoreError::Backend(format!("unknown column '{field}'")))?;
            cond = cond.add(col.eq(filter_value(field, value)));
        }

        let rows = E::find().filter(cond).all(&self.db).await?;
        rows.iter().map(to_document).collect()
    }

    async fn find_prefix_generic<E, A>(
        &self,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let col = column_of::<E>(field)
            .ok_or_else(|| StoreError::Backend(format!("unknown column '{field}'")))?;

        let pattern = format!("{}%", value.to_lowercase());
        let cond = active_only::<E>().add(lower_like::<E>(col, pattern));

        let rows = E::find().filter(cond).all(&self.db).await?;
        rows.iter().map(to_document).collect()
    }

    async fn find_text_generic<E, A>(
        &self,
        fields: &'static [&'static str],
        query: &str,
    ) -> StoreResult<Vec<Document>>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let pattern = format!("%{}%", query.to_lowercase());

        let mut any = Condition::any();
        for field in fields {
            if let Some(col) = column_of::<E>(field) {
                any = any.add(lower_like::<E>(col, pattern.clone()));
            }
        }

        let cond = active_only::<E>().add(any);
        let rows = E::find().filter(cond).all(&self.db).await?;
        rows.iter().map(to_document).collect()
    }

    async fn exists_generic<E, A>(
        &self,
        fields: Document,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let mut cond = active_only::<E>();
        for (field, value) in &fields {
            let col = column_of::<E>(field)
                .ok_or_else(|| StoreError::Backend(format!("unknown column '{field}'")))?;
            cond = cond.add(col.eq(filter_value(field, value)));
        }
        if let Some(id) = exclude_id {
            let id_col = column_of::<E>("id")
                .ok_or_else(|| StoreError::Backend("collection has no id column".into()))?;
            cond = cond.add(id_col.ne(id));
        }

        Ok(E::find().filter(cond).one(&self.db).await?.is_some())
    }

    async fn update_generic<E, A>(&self, id: Uuid, patch: Document) -> StoreResult<Document>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<A> + Serialize + DeserializeOwned + Send,
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    {
        let existing = self
            .find_by_id_generic::<E, A>(id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut doc = existing;
        for (k, v) in patch {
            doc.insert(k, v);
        }
        stamp_updated(&mut doc);

        let model: E::Model = from_document(doc)?;
        let saved = model
            .into_active_model()
            .reset_all()
            .update(&self.db)
            .await?;
        to_document(&saved)
    }

    async fn delete_generic<E, A>(&self, id: Uuid) -> StoreResult<()>
    where
        E: EntityTrait,
        E::Model: Serialize + Send,
        A: ActiveModelTrait<Entity = E>,
    {
        let id_col = column_of::<E>("id")
            .ok_or_else(|| StoreError::Backend("collection has no id column".into()))?;

        let result = E::delete_many()
            .filter(Condition::all().add(id_col.eq(id)))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Dispatch one generic call to the entity matching the collection.
macro_rules! dispatch {
    ($self:ident, $kind:expr, $method:ident ( $($arg:expr),* )) => {
        match $kind {
            EntityKind::User => {
                $self.$method::<entities::user::Entity, entities::user::ActiveModel>($($arg),*)
                    .await
            }
            EntityKind::Role => {
                $self.$method::<entities::role::Entity, entities::role::ActiveModel>($($arg),*)
                    .await
            }
            EntityKind::Category => {
                $self
                    .$method::<entities::category::Entity, entities::category::ActiveModel>($($arg),*)
                    .await
            }
            EntityKind::Product => {
                $self
                    .$method::<entities::product::Entity, entities::product::ActiveModel>($($arg),*)
                    .await
            }
        }
    };
}

#[async_trait]
impl QueryAdapter for RelationalBackend {
    async fn insert(&self, kind: EntityKind, doc: Document) -> StoreResult<Document> {
        dispatch!(self, kind, insert_generic(doc))
    }

    async fn find_by_id(&self, kind: EntityKind, id: Uuid) -> StoreResult<Option<Document>> {
        dispatch!(self, kind, find_by_id_generic(id))
    }

    async fn find_exact(&self, kind: EntityKind, fields: Document) -> StoreResult<Vec<Document>> {
        dispatch!(self, kind, find_exact_generic(fields))
    }

    async fn find_prefix(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Document>> {
        dispatch!(self, kind, find_prefix_generic(field, value))
    }

    async fn find_text(
        &self,
        kind: EntityKind,
        fields: &'static [&'static str],
        query: &str,
    ) -> StoreResult<Vec<Document>> {
        dispatch!(self, kind, find_text_generic(fields, query))
    }

    async fn exists(
        &self,
        kind: EntityKind,
        fields: Document,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        dispatch!(self, kind, exists_generic(fields, exclude_id))
    }

    async fn update(&self, kind: EntityKind, id: Uuid, patch: Document) -> StoreResult<Document> {
        dispatch!(self, kind, update_generic(id, patch))
    }

    async fn soft_delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<Document> {
        let mut patch = Document::new();
        patch.insert("state".to_string(), Value::Bool(false));
        self.update(kind, id, patch).await
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> StoreResult<()> {
        dispatch!(self, kind, delete_generic(id))
    }
}
