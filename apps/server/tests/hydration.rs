#[allow(unused)]
mod support;

use folio::models::{FieldType, FilterOperator};
use folio::request_context::TenantContext;
use serde_json::{json, Value};
use support::*;

fn tenant() -> TenantContext {
    TenantContext::new(ORG)
}

#[tokio::test]
async fn default_relations_are_attached() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            seed_five_posts(&app.store);
            app.store.insert_post(
                PostBuilder::new("orphan")
                    .author("user-gone")
                    .post_type("type-gone")
                    .created_at(0)
                    .build(),
            );

            let response = app.search(&tenant(), SearchBuilder::new().build()).await?;
            assert_eq!(response.data.len(), 6);

            let first = &response.data[0];
            assert_eq!(first["author"]["id"], json!(DEFAULT_AUTHOR));
            assert_eq!(first["author"]["name"], json!("Ada Lovelace"));
            assert_eq!(first["postType"]["id"], json!(DEFAULT_POST_TYPE));
            assert_eq!(first["postType"]["slug"], json!("article"));
            assert!(first.get("customFields").is_none());

            let orphan = &response.data[5];
            assert_eq!(orphan["id"], json!("orphan"));
            assert_eq!(orphan["author"], Value::Null);
            assert_eq!(orphan["postType"], Value::Null);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn relations_cost_one_lookup_per_kind() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            seed_basics(&app.store);
            app.store.insert_custom_field(custom_field("cf-country", ORG, "country", FieldType::Text));
            for i in 0..12 {
                let author_id = format!("user-{}", i % 4);
                app.store.insert_author(author(&author_id, &author_id));
                app.store.insert_post(
                    PostBuilder::new(format!("post-{i:02}"))
                        .author(author_id)
                        .created_at(i)
                        .build(),
                );
                app.store.set_field_value(format!("post-{i:02}"), "cf-country", "US");
            }

            let response = app
                .search(
                    &tenant(),
                    SearchBuilder::new()
                        .filter("customFields.country", FilterOperator::Eq, json!("US"))
                        .properties(&["title", "author", "postType", "customFields.country"])
                        .build(),
                )
                .await?;
            assert_eq!(response.data.len(), 12);
            assert!(response
                .data
                .iter()
                .all(|item| item["author"]["id"].is_string() && item["postType"].is_object()));

            assert_eq!(app.store.query_count("fetch_posts"), 1);
            assert_eq!(app.store.query_count("authors_by_ids"), 1);
            assert_eq!(app.store.query_count("post_types_by_ids"), 1);
            assert_eq!(app.store.query_count("field_values_for_posts"), 1);
            // Resolved once for the filter and reused for hydration.
            assert_eq!(app.store.query_count("custom_fields_by_slugs"), 1);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn custom_fields_are_decoded_by_type() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            seed_five_posts(&app.store);
            app.store.insert_custom_field(custom_field("cf-rating", ORG, "rating", FieldType::Number));
            app.store.insert_custom_field(custom_field("cf-tags", ORG, "tags", FieldType::MultiSelect));
            app.store.insert_custom_field(custom_field("cf-code", ORG, "code", FieldType::Text));
            app.store.set_field_value("P1", "cf-rating", "4.5");
            app.store.set_field_value("P1", "cf-tags", r#"["news","tech"]"#);
            app.store.set_field_value("P1", "cf-code", "007");
            app.store.set_field_value("P2", "cf-tags", "not json");

            let response = app
                .search(
                    &tenant(),
                    SearchBuilder::new()
                        .properties(&[
                            "customFields.rating",
                            "customFields.tags",
                            "customFields.code",
                            "customFields.missing",
                        ])
                        .limit(3)
                        .build(),
                )
                .await?;

            let p1 = &response.data[0];
            assert_eq!(
                p1["customFields"],
                json!({ "rating": 4.5, "tags": ["news", "tech"], "code": "007" })
            );
            assert_eq!(response.data[1]["customFields"], json!({ "tags": "not json" }));
            assert!(response.data[2].get("customFields").is_none());
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn projection_limits_returned_properties() -> anyhow::Result<()> {
    with_test_app(|app| {
        Box::pin(async move {
            seed_five_posts(&app.store);

            let response = app
                .search(
                    &tenant(),
                    SearchBuilder::new()
                        .properties(&["title", "author.name"])
                        .limit(2)
                        .build(),
                )
                .await?;

            for item in &response.data {
                let keys: Vec<&str> = item.keys().map(String::as_str).collect();
                assert_eq!(keys, vec!["id", "title", "author"]);
            }
            assert_eq!(app.store.query_count("post_types_by_ids"), 0);

            // Sort columns are fetched for the cursor but not returned.
            let next = app
                .search(
                    &tenant(),
                    SearchBuilder::new()
                        .properties(&["title"])
                        .limit(2)
                        .after(response.next_cursor.clone().expect("cursor"))
                        .build(),
                )
                .await?;
            assert_eq!(ids(&next), vec!["P3", "P4"]);
            assert!(next.data.iter().all(|item| item.get("createdAt").is_none()));

            let everything = app
                .search(&tenant(), SearchBuilder::new().properties(&[]).limit(1).build())
                .await?;
            let item = &everything.data[0];
            assert!(item.contains_key("createdAt"));
            assert!(item.contains_key("shareCount"));
            assert!(item.get("author").is_none());
            Ok(())
        })
    })
    .await
}
