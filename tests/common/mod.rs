#![allow(dead_code)]

//! Shared fixtures: a registry covering every association pattern
//! (one-to-many, zero-to-many, one-to-one, many-to-many with and without
//! edge attributes) backed by the in-memory store.

use crudkit::{
    AssociationDef, AssociationKind, ColumnDef, EntityDef, JoinSpec, MemoryStore, ModelRegistry,
    PkType, ValidationRule,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub fn obj(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("fixture body must be an object")
}

pub fn store() -> MemoryStore {
    MemoryStore::new()
}

fn entity(
    name: &str,
    path: &str,
    table: &str,
    columns: Vec<ColumnDef>,
    writable: Vec<&str>,
) -> EntityDef {
    EntityDef {
        name: name.into(),
        path_segment: path.into(),
        table: table.into(),
        pk_column: "id".into(),
        pk_type: PkType::Int,
        columns,
        writable: writable.into_iter().map(String::from).collect(),
        associations: vec![],
        eager_includes: vec![],
        validation: HashMap::new(),
    }
}

pub fn registry() -> ModelRegistry {
    let mut users = entity(
        "User",
        "users",
        "users",
        vec![
            ColumnDef::required("first_name"),
            ColumnDef::required("last_name"),
            ColumnDef::new("bio"),
            ColumnDef::required("email"),
            ColumnDef::new("project_id"),
        ],
        vec!["first_name", "last_name", "bio", "email", "project_id"],
    );
    users.associations = vec![
        AssociationDef {
            name: "tasks".into(),
            related: "tasks".into(),
            kind: AssociationKind::HasMany {
                fk_column: "user_id".into(),
            },
            fields: None,
        },
        AssociationDef {
            name: "passport".into(),
            related: "passports".into(),
            kind: AssociationKind::HasOne {
                fk_column: "user_id".into(),
            },
            fields: None,
        },
    ];
    users.eager_includes = vec!["tasks".into(), "passport".into()];
    users.validation = HashMap::from([
        ("first_name".into(), ValidationRule::required()),
        ("last_name".into(), ValidationRule::required()),
        (
            "email".into(),
            ValidationRule::required().with_format("email"),
        ),
    ]);

    let mut tasks = entity(
        "Task",
        "tasks",
        "tasks",
        vec![
            ColumnDef::required("title"),
            ColumnDef::new("complete"),
            ColumnDef::required("user_id"),
        ],
        vec!["title", "complete", "user_id"],
    );
    tasks.associations = vec![AssociationDef {
        name: "user".into(),
        related: "users".into(),
        kind: AssociationKind::BelongsTo {
            fk_column: "user_id".into(),
        },
        fields: None,
    }];
    tasks.validation = HashMap::from([("title".into(), ValidationRule::required())]);

    // zero-to-many: a user may or may not belong to a project
    let mut projects = entity(
        "Project",
        "projects",
        "projects",
        vec![ColumnDef::required("name")],
        vec!["name"],
    );
    projects.associations = vec![AssociationDef {
        name: "users".into(),
        related: "users".into(),
        kind: AssociationKind::HasMany {
            fk_column: "project_id".into(),
        },
        fields: Some(vec!["first_name".into(), "last_name".into()]),
    }];
    projects.eager_includes = vec!["users".into()];
    projects.validation = HashMap::from([("name".into(), ValidationRule::required())]);

    // one-to-one: user_id starts null and is set by the link operation
    let mut passports = entity(
        "Passport",
        "passports",
        "passports",
        vec![
            ColumnDef::required("country"),
            ColumnDef::required("passport_number"),
            ColumnDef::new("issue_date").with_pg_type("date"),
            ColumnDef::new("expiration_date").with_pg_type("date"),
            ColumnDef::new("user_id"),
        ],
        vec![
            "country",
            "passport_number",
            "issue_date",
            "expiration_date",
            "user_id",
        ],
    );
    passports.associations = vec![AssociationDef {
        name: "user".into(),
        related: "users".into(),
        kind: AssociationKind::BelongsTo {
            fk_column: "user_id".into(),
        },
        fields: None,
    }];

    let mut recipes = entity(
        "Recipe",
        "recipes",
        "recipes",
        vec![
            ColumnDef::required("title"),
            ColumnDef::required("description"),
            ColumnDef::required("instructions"),
        ],
        vec!["title", "description", "instructions"],
    );
    recipes.associations = vec![AssociationDef {
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
    }];
    recipes.eager_includes = vec!["ingredients".into()];
    recipes.validation = HashMap::from([("title".into(), ValidationRule::required())]);

    let ingredients = entity(
        "Ingredient",
        "ingredients",
        "ingredients",
        vec![ColumnDef::required("name")],
        vec!["name"],
    );

    // many-to-many without edge attributes
    let mut teachers = entity(
        "Teacher",
        "teachers",
        "teachers",
        vec![ColumnDef::required("name")],
        vec!["name"],
    );
    teachers.associations = vec![AssociationDef {
        name: "students".into(),
        related: "students".into(),
        kind: AssociationKind::ManyToMany(JoinSpec {
            table: "teacher_students".into(),
            owner_fk: "teacher_id".into(),
            related_fk: "student_id".into(),
            edge_columns: vec![],
            edge_validation: HashMap::new(),
        }),
        fields: Some(vec!["name".into()]),
    }];
    teachers.eager_includes = vec!["students".into()];

    let students = entity(
        "Student",
        "students",
        "students",
        vec![ColumnDef::required("name")],
        vec!["name"],
    );

    ModelRegistry::new(vec![
        users,
        tasks,
        projects,
        passports,
        recipes,
        ingredients,
        teachers,
        students,
    ])
    .expect("fixture registry must validate")
}
