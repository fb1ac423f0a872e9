use super::{body_text, get, location, login, post_form};
use crate::test_app;
use axum::http::StatusCode;
use libbiobank::{
    collection::Collection,
    core::loadable::Loadable,
    sample::{self, Sample},
};
use sqlx::{Pool, Sqlite};
use test_log::test;
use time::macros::date;

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(
        path = "../../../../db/fixtures",
        scripts("users", "collections", "samples")
    )
))]
async fn test_create_sample(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");

    let response = get(&mut app, "/collection/3/sample/new", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    // a collection in the form body doesn't override the one in the route
    let response = post_form(
        &mut app,
        "/collection/3/sample/new",
        Some(&cookie),
        &[
            ("donor_count", "25"),
            ("material_type", "Stool"),
            ("last_updated", "2024-05-06"),
            ("collection", "1"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/collection/3"));

    let samples = Sample::load_all(Some(sample::Filter::Collection(3).into()), &state.db)
        .await
        .expect("failed to load");
    assert_eq!(samples.len(), 2);
    let new = samples.last().expect("no samples");
    assert_eq!(new.donor_count, 25);
    assert_eq!(new.material_type, "Stool");
    assert_eq!(new.last_updated, date!(2024 - 05 - 06));
    assert_eq!(new.collection.id(), 3);
    // the sample belongs to the user who created it, not the collection owner
    assert_eq!(new.user.id(), 1);
    assert_eq!(
        Sample::count(Some(sample::Filter::Collection(1).into()), &state.db)
            .await
            .expect("count failed"),
        2
    );

    let response = get(&mut app, "/collection/3", Some(&cookie))
        .await
        .expect("Failed to execute request");
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Sample created successfully."));
    assert!(body.contains("Stool"));
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(
        path = "../../../../db/fixtures",
        scripts("users", "collections", "samples")
    )
))]
async fn test_create_sample_invalid(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");

    let response = post_form(
        &mut app,
        "/collection/2/sample/new",
        Some(&cookie),
        &[
            ("donor_count", "-3"),
            ("material_type", "Serum"),
            ("last_updated", "2024-05-06"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Ensure this value is greater than or equal to 0."));

    let response = post_form(
        &mut app,
        "/collection/2/sample/new",
        Some(&cookie),
        &[
            ("donor_count", "3"),
            ("material_type", "Serum"),
            ("last_updated", "06/05/2024"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Enter a valid date."));

    assert_eq!(Sample::count(None, &state.db).await.expect("count failed"), 4);

    let response = post_form(
        &mut app,
        "/collection/999/sample/new",
        Some(&cookie),
        &[
            ("donor_count", "3"),
            ("material_type", "Serum"),
            ("last_updated", "2024-05-06"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(Sample::count(None, &state.db).await.expect("count failed"), 4);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(
        path = "../../../../db/fixtures",
        scripts("users", "collections", "samples")
    )
))]
async fn test_update_sample(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");

    let response = get(&mut app, "/sample/2/edit", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("2023-12-01"));

    let response = post_form(
        &mut app,
        "/sample/2/edit",
        Some(&cookie),
        &[
            ("donor_count", "0"),
            ("material_type", "Buffy coat"),
            ("last_updated", "2024-06-30"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/collection/1"));

    let s = Sample::load(2, &state.db).await.expect("failed to load");
    assert_eq!(s.donor_count, 0);
    assert_eq!(s.material_type, "Buffy coat");
    assert_eq!(s.last_updated, date!(2024 - 06 - 30));
    assert_eq!(s.collection.id(), 1);
    assert_eq!(s.user.id(), 2);

    let response = get(&mut app, "/collection/1", Some(&cookie))
        .await
        .expect("Failed to execute request");
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Sample updated successfully."));

    let response = post_form(
        &mut app,
        "/sample/2/edit",
        Some(&cookie),
        &[
            ("donor_count", "lots"),
            ("material_type", "Buffy coat"),
            ("last_updated", "2024-06-30"),
        ],
    )
    .await
    .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = get(&mut app, "/sample/999/edit", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(
        path = "../../../../db/fixtures",
        scripts("users", "collections", "samples")
    )
))]
async fn test_delete_sample(pool: Pool<Sqlite>) {
    let (mut app, state) = test_app(pool).await.expect("failed to create test app");
    let cookie = login(&mut app, &state).await.expect("Failed to log in");

    let response = get(&mut app, "/sample/3/delete", Some(&cookie))
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_form(&mut app, "/sample/3/delete", Some(&cookie), &[])
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/collection/2"));

    assert!(
        Sample::load(3, &state.db)
            .await
            .expect_err("sample should be deleted")
            .is_not_found()
    );
    // the parent collection survives
    let c = Collection::load(2, &state.db).await.expect("failed to load");
    assert_eq!(c.nsamples, 0);

    let response = get(&mut app, "/collection/2", Some(&cookie))
        .await
        .expect("Failed to execute request");
    let body = body_text(response).await.expect("failed to read body");
    assert!(body.contains("Sample deleted successfully."));

    let response = post_form(&mut app, "/sample/3/delete", Some(&cookie), &[])
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
