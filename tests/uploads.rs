mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rozetka_api::{
    dto::products::ReorderImagesRequest,
    error::AppError,
    middleware::auth::AuthUser,
    routes::create_app,
    services::{
        auth_service,
        image_service::{self, UploadedImage},
        product_service,
    },
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

const BOUNDARY: &str = "rozetka-test-boundary";

fn multipart_body(file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(
    state: &AppState,
    admin: &AuthUser,
    product_id: Uuid,
    body: Vec<u8>,
) -> anyhow::Result<Request<Body>> {
    let token = auth_service::issue_token(&state.config, admin.user_id, &admin.role)?;
    Ok(Request::post(format!("/api/products/{product_id}/images"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))?)
}

#[tokio::test]
async fn uploads_above_the_extractor_default_are_accepted() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let category = common::category(&state, &admin, "Cameras", None).await?;
    let camera = common::product(&state, &admin, category.id, "Camera", 15_000_00, 2).await?;

    // Larger than axum's 2 MiB default, smaller than the configured 5 MiB.
    let image = vec![7u8; 3 * 1024 * 1024];
    let request = upload_request(&state, &admin, camera.id, multipart_body("big.png", &image))?;
    let response = create_app(state.clone()).oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    let url = json["data"]["items"][0]["url"]
        .as_str()
        .expect("image url")
        .to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let served = create_app(state)
        .oneshot(Request::get(url).body(Body::empty())?)
        .await?;
    assert_eq!(served.status(), StatusCode::OK);
    let served = to_bytes(served.into_body(), usize::MAX).await?;
    assert_eq!(served.len(), image.len());

    Ok(())
}

#[tokio::test]
async fn uploads_over_the_configured_limit_are_rejected() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let category = common::category(&state, &admin, "Cameras", None).await?;
    let camera = common::product(&state, &admin, category.id, "Camera", 15_000_00, 2).await?;

    let image = vec![7u8; 6 * 1024 * 1024];
    let request = upload_request(&state, &admin, camera.id, multipart_body("huge.png", &image))?;
    let response = create_app(state).oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    Ok(())
}

fn png(name: &str) -> UploadedImage {
    UploadedImage {
        original_name: name.into(),
        bytes: name.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn images_can_be_reordered_and_deleted() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::admin(&state).await?;
    let category = common::category(&state, &admin, "Monitors", None).await?;
    let monitor = common::product(&state, &admin, category.id, "Monitor", 8_000_00, 3).await?;

    let err = image_service::upload_images(&state, &admin, monitor.id, vec![png("notes.txt")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let uploaded = image_service::upload_images(
        &state,
        &admin,
        monitor.id,
        vec![png("front.png"), png("back.jpg"), png("side.webp")],
    )
    .await?
    .data
    .expect("images")
    .items;
    let priorities: Vec<i32> = uploaded.iter().map(|i| i.priority).collect();
    assert_eq!(priorities, vec![0, 1, 2]);
    let ids: Vec<Uuid> = uploaded.iter().map(|i| i.id).collect();

    // Every image must be listed exactly once.
    let err = image_service::reorder_images(
        &state,
        &admin,
        monitor.id,
        ReorderImagesRequest {
            image_ids: vec![ids[2], ids[0], ids[0]],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let reordered = image_service::reorder_images(
        &state,
        &admin,
        monitor.id,
        ReorderImagesRequest {
            image_ids: vec![ids[2], ids[0], ids[1]],
        },
    )
    .await?
    .data
    .expect("images")
    .items;
    let order: Vec<Uuid> = reordered.iter().map(|i| i.id).collect();
    assert_eq!(order, vec![ids[2], ids[0], ids[1]]);

    let details = product_service::get_product(&state, monitor.id)
        .await?
        .data
        .expect("details");
    assert_eq!(details.product.main_image.as_deref(), Some(reordered[0].url.as_str()));

    let side = &reordered[0];
    let path = std::path::Path::new(&state.config.upload_dir).join(&side.file_name);
    assert!(path.exists());
    image_service::delete_image(&state, &admin, monitor.id, side.id).await?;
    assert!(!path.exists());
    assert!(matches!(
        image_service::delete_image(&state, &admin, monitor.id, side.id).await,
        Err(AppError::NotFound)
    ));

    let details = product_service::get_product(&state, monitor.id)
        .await?
        .data
        .expect("details");
    assert_eq!(details.images.len(), 2);
    assert_eq!(details.product.main_image.as_deref(), Some(reordered[1].url.as_str()));

    Ok(())
}
