mod common;

use filehost::error::AppError;
use filehost::services::pagination::PageQuery;
use filehost::services::{FileService, PaginationService};

#[tokio::test]
async fn test_upload_records_owner_tags_and_zero_views() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;

    let file = common::upload(&state, &user.id, "cat.png", &["a", "", "a"]).await;

    assert_eq!(file.name, "cat.png");
    assert_eq!(file.user_id, user.id);
    assert_eq!(file.tags(), ["a", "", "a"]);
    assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    assert_eq!(file.views, 0);
    assert!(file.url.starts_with(&format!("/file/{}/", user.id)));
    assert!(!file.url.contains("cat"));

    let on_disk = std::fs::read(common::blob_path(&dir, &file)).unwrap();
    assert_eq!(on_disk, b"contents of cat.png");
}

#[tokio::test]
async fn test_same_name_uploads_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;

    let first = common::upload(&state, &user.id, "cat.png", &[]).await;
    let second = common::upload(&state, &user.id, "cat.png", &[]).await;

    assert_ne!(first.url, second.url);
    assert!(common::blob_path(&dir, &first).exists());
    assert!(common::blob_path(&dir, &second).exists());
}

#[tokio::test]
async fn test_every_metadata_fetch_counts_as_a_view() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let file = common::upload(&state, &user.id, "cat.png", &[]).await;

    let fetched = FileService::get_metadata(&state.db, &user.id, &file.id).await.unwrap();
    assert_eq!(fetched.views, 1);
    let fetched = FileService::get_metadata(&state.db, &user.id, &file.id).await.unwrap();
    assert_eq!(fetched.views, 2);
}

#[tokio::test]
async fn test_metadata_of_missing_or_foreign_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let owner = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    let file = common::upload(&state, &owner.id, "cat.png", &[]).await;

    let missing = FileService::get_metadata(&state.db, &owner.id, "no-such-file").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let foreign = FileService::get_metadata(&state.db, &other.id, &file.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    // A rejected fetch is not a view
    let file = FileService::get_file(&state.db, &file.id).await.unwrap();
    assert_eq!(file.views, 0);
}

#[tokio::test]
async fn test_search_matches_name_substring_or_exact_tag() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    common::upload(&state, &user.id, "cat.png", &["pet"]).await;
    common::upload(&state, &user.id, "dog.png", &["wild"]).await;

    let names = |files: Vec<filehost::models::File>| -> Vec<String> {
        files.into_iter().map(|f| f.name).collect()
    };

    let by_name = FileService::list_files(&state.db, &user.id, Some("cat")).await.unwrap();
    assert_eq!(names(by_name), vec!["cat.png"]);

    let by_tag = FileService::list_files(&state.db, &user.id, Some("pet")).await.unwrap();
    assert_eq!(names(by_tag), vec!["cat.png"]);

    let tag_prefix = FileService::list_files(&state.db, &user.id, Some("pe")).await.unwrap();
    assert!(tag_prefix.is_empty());

    let case_insensitive = FileService::list_files(&state.db, &user.id, Some("DOG")).await.unwrap();
    assert_eq!(names(case_insensitive), vec!["dog.png"]);

    let all = FileService::list_files(&state.db, &user.id, Some("")).await.unwrap();
    assert_eq!(names(all), vec!["cat.png", "dog.png"]);
}

#[tokio::test]
async fn test_listing_is_scoped_to_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let owner = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    common::upload(&state, &owner.id, "cat.png", &["pet"]).await;

    assert!(FileService::list_files(&state.db, &other.id, None).await.unwrap().is_empty());
    assert!(FileService::list_files(&state.db, &other.id, Some("pet"))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        FileService::list_files(&state.db, &owner.id, None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_update_tags_replaces_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    let file = common::upload(&state, &user.id, "cat.png", &["pet"]).await;

    let updated = FileService::update_tags(
        &state.db,
        &user.id,
        &file.id,
        vec!["x".to_string(), "x".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(updated.tags(), ["x", "x"]);

    let foreign =
        FileService::update_tags(&state.db, &other.id, &file.id, vec!["hijack".to_string()]).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    let by_old_tag = FileService::list_files(&state.db, &user.id, Some("pet")).await.unwrap();
    assert!(by_old_tag.is_empty());
}

#[tokio::test]
async fn test_delete_removes_record_and_blob_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let file = common::upload(&state, &user.id, "cat.png", &[]).await;
    let blob = common::blob_path(&dir, &file);

    FileService::delete_file(&state.db, state.storage.as_ref(), &user.id, &file.id)
        .await
        .unwrap();
    assert!(!blob.exists());
    assert!(FileService::find_file(&state.db, &file.id).await.unwrap().is_none());

    FileService::delete_file(&state.db, state.storage.as_ref(), &user.id, &file.id)
        .await
        .unwrap();
    FileService::delete_file(&state.db, state.storage.as_ref(), &user.id, "never-existed")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_tolerates_missing_blob() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let file = common::upload(&state, &user.id, "cat.png", &[]).await;

    std::fs::remove_file(common::blob_path(&dir, &file)).unwrap();

    FileService::delete_file(&state.db, state.storage.as_ref(), &user.id, &file.id)
        .await
        .unwrap();
    assert!(FileService::find_file(&state.db, &file.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_of_foreign_file_leaves_it_alone() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let owner = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    let file = common::upload(&state, &owner.id, "cat.png", &[]).await;

    FileService::delete_file(&state.db, state.storage.as_ref(), &other.id, &file.id)
        .await
        .unwrap();
    assert!(FileService::find_file(&state.db, &file.id).await.unwrap().is_some());
    assert!(common::blob_path(&dir, &file).exists());
}

#[tokio::test]
async fn test_download_and_view_serve_bytes_and_count_views() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let owner = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    let file = common::upload(&state, &owner.id, "cat.png", &[]).await;

    let download =
        FileService::download_file(&state.db, state.storage.as_ref(), &owner.id, &file.id)
            .await
            .unwrap();
    assert_eq!(&download.data[..], b"contents of cat.png");
    assert_eq!(download.content_type, "application/octet-stream");
    assert!(download.disposition.starts_with("attachment; filename=\"cat.png\""));

    let foreign =
        FileService::download_file(&state.db, state.storage.as_ref(), &other.id, &file.id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    // Public link: no caller at all
    let view = FileService::view_file(&state.db, state.storage.as_ref(), &file.id)
        .await
        .unwrap();
    assert_eq!(view.content_type, "image/png");
    assert!(view.disposition.starts_with("inline; filename=\"cat.png\""));

    let file = FileService::get_file(&state.db, &file.id).await.unwrap();
    assert_eq!(file.views, 2);
}

#[tokio::test]
async fn test_serving_missing_blob_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let file = common::upload(&state, &user.id, "cat.png", &[]).await;
    std::fs::remove_file(common::blob_path(&dir, &file)).unwrap();

    let view = FileService::view_file(&state.db, state.storage.as_ref(), &file.id).await;
    assert!(matches!(view, Err(AppError::NotFound(_))));

    let download =
        FileService::download_file(&state.db, state.storage.as_ref(), &user.id, &file.id).await;
    assert!(matches!(download, Err(AppError::NotFound(_))));

    let unknown = FileService::view_file(&state.db, state.storage.as_ref(), "no-such-file").await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_pagination_pages_through_callers_files() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    let other = common::create_user(&state, "c@d.com").await;
    for name in ["one.png", "two.png", "three.png"] {
        common::upload(&state, &user.id, name, &[]).await;
    }
    common::upload(&state, &other.id, "four.png", &[]).await;

    let query = PageQuery {
        page: Some(2),
        limit: Some(2),
        query: None,
    };
    let page = PaginationService::paginate::<filehost::models::File>(&state.db, &user.id, &query)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.meta.total_items, 3);
    assert_eq!(page.meta.total_pages, 2);
    assert!(!page.meta.has_next_page);
    assert!(page.meta.has_previous_page);

    let query = PageQuery {
        page: None,
        limit: None,
        query: Some("T".to_string()),
    };
    let page = PaginationService::paginate::<filehost::models::File>(&state.db, &user.id, &query)
        .await
        .unwrap();
    let mut names: Vec<_> = page.items.into_iter().map(|f| f.name).collect();
    names.sort();
    assert_eq!(names, vec!["three.png", "two.png"]);
    assert_eq!(page.meta.total_items, 2);
}

#[tokio::test]
async fn test_search_folds_case_beyond_ascii() {
    let dir = tempfile::tempdir().unwrap();
    let state = common::test_state(&dir).await;
    let user = common::create_user(&state, "a@b.com").await;
    common::upload(&state, &user.id, "Éclair.png", &[]).await;
    common::upload(&state, &user.id, "Straße.pdf", &[]).await;

    for query in ["éclair", "ÉCLAIR", "Éclair"] {
        let hits = FileService::list_files(&state.db, &user.id, Some(query)).await.unwrap();
        assert_eq!(hits.len(), 1, "query {:?}", query);
        assert_eq!(hits[0].name, "Éclair.png");
    }

    let hits = FileService::list_files(&state.db, &user.id, Some("STRASSE")).await.unwrap();
    assert!(hits.is_empty());
    let hits = FileService::list_files(&state.db, &user.id, Some("STRAßE")).await.unwrap();
    assert_eq!(hits.len(), 1);

    let query = PageQuery {
        page: None,
        limit: None,
        query: Some("éCLAIR".to_string()),
    };
    let page = PaginationService::paginate::<filehost::models::File>(&state.db, &user.id, &query)
        .await
        .unwrap();
    assert_eq!(page.meta.total_items, 1);
    assert_eq!(page.items[0].name, "Éclair.png");
}
