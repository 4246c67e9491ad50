use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    sea_query::{Expr, Func},
};

use crate::entities::genre;

/// Looks a genre up by name, ignoring case. Not cached.
pub async fn resolve<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<genre::Model>, DbErr> {
    genre::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col((genre::Entity, genre::Column::Name))))
                .eq(name.trim().to_lowercase()),
        )
        .one(db)
        .await
}
