//! Demo server: wires a sample registry (users, tasks, recipes,
//! ingredients) to a PostgreSQL store and serves the CRUD routes.
//! Tables are expected to exist; schema management is out of scope.

use axum::Router;
use crudkit::{
    common_routes, entity_routes, AppState, AssociationDef, AssociationKind, ColumnDef, EntityDef,
    JoinSpec, ModelRegistry, PgStore, PkType, RegistryError, ValidationRule,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crudkit=info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crudkit".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let registry = Arc::new(sample_registry()?);
    let state = AppState::new(Arc::new(PgStore::new(pool)), registry);

    let app = Router::new()
        .merge(common_routes())
        .merge(entity_routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn sample_registry() -> Result<ModelRegistry, RegistryError> {
    let users = EntityDef {
        name: "User".into(),
        path_segment: "users".into(),
        table: "users".into(),
        pk_column: "id".into(),
        pk_type: PkType::Int,
        columns: vec![
            ColumnDef::required("first_name"),
            ColumnDef::required("last_name"),
            ColumnDef::new("bio"),
            ColumnDef::required("email"),
        ],
        writable: vec![
            "first_name".into(),
            "last_name".into(),
            "bio".into(),
            "email".into(),
        ],
        associations: vec![AssociationDef {
            name: "tasks".into(),
            related: "tasks".into(),
            kind: AssociationKind::HasMany {
                fk_column: "user_id".into(),
            },
            fields: None,
        }],
        eager_includes: vec!["tasks".into()],
        validation: HashMap::from([
            ("first_name".into(), ValidationRule::required()),
            ("last_name".into(), ValidationRule::required()),
            (
                "email".into(),
                ValidationRule::required().with_format("email"),
            ),
        ]),
    };

    let tasks = EntityDef {
        name: "Task".into(),
        path_segment: "tasks".into(),
        table: "tasks".into(),
        pk_column: "id".into(),
        pk_type: PkType::Int,
        columns: vec![
            ColumnDef::required("title"),
            ColumnDef::new("complete"),
            ColumnDef::required("user_id"),
        ],
        writable: vec!["title".into(), "complete".into(), "user_id".into()],
        associations: vec![AssociationDef {
            name: "user".into(),
            related: "users".into(),
            kind: AssociationKind::BelongsTo {
                fk_column: "user_id".into(),
            },
            fields: None,
        }],
        eager_includes: vec![],
        validation: HashMap::from([("title".into(), ValidationRule::required())]),
    };

    let recipes = EntityDef {
        name: "Recipe".into(),
        path_segment: "recipes".into(),
        table: "recipes".into(),
        pk_column: "id".into(),
        pk_type: PkType::Int,
        columns: vec![
            ColumnDef::required("title"),
            ColumnDef::required("description"),
            ColumnDef::required("instructions"),
        ],
        writable: vec![
            "title".into(),
            "description".into(),
            "instructions".into(),
        ],
        associations: vec![AssociationDef {
            name: "ingredients".into(),
            related: "ingredients".into(),
            kind: AssociationKind::ManyToMany(JoinSpec {
                table: "recipe_ingredients".into(),
                owner_fk: "recipe_id".into(),
                related_fk: "ingredient_id".into(),
                edge_columns: vec![
                    ColumnDef::required("meassurement_amount"),
                    ColumnDef::required("meassurement_type"),
                ],
                edge_validation: HashMap::from([
                    ("meassurement_amount".into(), ValidationRule::required()),
                    ("meassurement_type".into(), ValidationRule::required()),
                ]),
            }),
            fields: Some(vec!["name".into()]),
        }],
        eager_includes: vec!["ingredients".into()],
        validation: HashMap::from([("title".into(), ValidationRule::required())]),
    };

    let ingredients = EntityDef {
        name: "Ingredient".into(),
        path_segment: "ingredients".into(),
        table: "ingredients".into(),
        pk_column: "id".into(),
        pk_type: PkType::Int,
        columns: vec![ColumnDef::required("name")],
        writable: vec!["name".into()],
        associations: vec![],
        eager_includes: vec![],
        validation: HashMap::from([("name".into(), ValidationRule::required())]),
    };

    ModelRegistry::new(vec![users, tasks, recipes, ingredients])
}
