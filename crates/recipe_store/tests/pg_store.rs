//! `PgStore` against a live database.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p recipe_store -- --ignored`.

use chrono::Utc;
use entities::User;
use recipe_store::{
    AccountStore, NewUser, PgStore, RecipeChanges, RecipeFields, RecipeStore, StoreError,
    TagStore,
};
use rust_decimal::Decimal;

async fn connect() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PgStore::connect(&url, 10).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

async fn new_user(store: &PgStore, label: &str) -> User {
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    store
        .create_user(NewUser {
            email: format!("{label}-{stamp}@example.com"),
            password_hash: "hash".to_string(),
            name: label.to_string(),
            is_staff: false,
            is_superuser: false,
        })
        .await
        .unwrap()
}

fn fields(title: &str, tags: Option<Vec<String>>) -> RecipeFields {
    RecipeFields {
        title: title.to_string(),
        time_minutes: 10,
        price: Decimal::new(550, 2),
        description: None,
        link: None,
        tags,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_writes_with_reversed_tag_order() {
    let Some(store) = connect().await else {
        return;
    };
    let owner = new_user(&store, "reversed").await.id;
    let target = store
        .create_recipe(owner, fields("Shared", None))
        .await
        .unwrap()
        .id;

    for round in 0..50 {
        let a = format!("A{round}");
        let b = format!("B{round}");

        let mut handles = Vec::new();
        for i in 0..6 {
            let store = store.clone();
            let tags = if i % 2 == 0 {
                vec![a.clone(), b.clone()]
            } else {
                vec![b.clone(), a.clone()]
            };
            handles.push(tokio::spawn(async move {
                if i < 4 {
                    store
                        .create_recipe(owner, fields("Curry", Some(tags)))
                        .await
                } else {
                    let changes = RecipeChanges {
                        tags: Some(tags),
                        ..Default::default()
                    };
                    store.update_recipe(owner, target, changes).await
                }
            }));
        }

        for handle in handles {
            let recipe = handle.await.unwrap().unwrap();
            assert_eq!(recipe.tags.len(), 2);
        }
    }

    let tags = store.list_tags(owner).await.unwrap();
    assert_eq!(tags.len(), 100);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_recipe_isolation_and_tag_semantics() {
    let Some(store) = connect().await else {
        return;
    };
    let alice = new_user(&store, "alice").await;
    let bob = new_user(&store, "bob").await;

    let tags = vec!["Thai".to_string(), "Dinner".to_string(), "Thai".to_string()];
    let recipe = store
        .create_recipe(alice.id, fields("Curry", Some(tags)))
        .await
        .unwrap();
    assert_eq!(recipe.tags.len(), 2);

    assert!(store.get_recipe(bob.id, recipe.id).await.unwrap().is_none());
    assert!(matches!(
        store.delete_recipe(bob.id, recipe.id).await,
        Err(StoreError::NotFound { .. })
    ));

    let retitled = RecipeChanges {
        title: Some("Green Curry".to_string()),
        ..Default::default()
    };
    let updated = store
        .update_recipe(alice.id, recipe.id, retitled)
        .await
        .unwrap();
    assert_eq!(updated.title, "Green Curry");
    assert_eq!(updated.tags.len(), 2);

    let cleared = RecipeChanges {
        tags: Some(Vec::new()),
        ..Default::default()
    };
    let updated = store
        .update_recipe(alice.id, recipe.id, cleared)
        .await
        .unwrap();
    assert!(updated.tags.is_empty());

    let (first, created) = store.get_or_create_tag(alice.id, "Thai").await.unwrap();
    let (second, _) = store.get_or_create_tag(alice.id, "Thai").await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}
