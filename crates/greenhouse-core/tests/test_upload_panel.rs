mod common;

use std::time::Duration;

use common::{drain_alerts, png_file, upload_panel, wait_for};
use greenhouse_core::{ControlError, ElementId, SelectedFile, PLACEHOLDER};

const RESULT_FIELDS: [ElementId; 3] = [ElementId::LeafCount, ElementId::Accuracy, ElementId::Timestamp];

fn is_accuracy_label(s: &str) -> bool {
    let Some(number) = s.strip_suffix('%') else {
        return false;
    };
    let Some((whole, tenth)) = number.split_once('.') else {
        return false;
    };
    tenth.len() == 1
        && tenth.chars().all(|c| c.is_ascii_digit())
        && whole.parse::<u32>().is_ok_and(|w| (85..100).contains(&w))
}

#[tokio::test(start_paused = true)]
async fn test_png_upload_then_analysis() {
    let (page, controller) = upload_panel(Duration::from_secs(2));

    let image = controller.handle_upload(png_file("plant.png", 32, 24)).await.unwrap();
    assert_eq!(image.media_type, "image/png");
    assert!(controller.current_image().await.is_some());
    assert!(page.text(ElementId::ImageContainer).contains("<img"));
    for id in RESULT_FIELDS {
        assert_eq!(page.text(id), PLACEHOLDER);
    }
    wait_for(|| page.text(ElementId::ImageSize) == "32 x 24").await;

    let mut rx = page.subscribe();
    let pending = controller.request_analysis().await.unwrap();
    let result = pending.wait().await.unwrap();

    let leaf_count: u32 = page.text(ElementId::LeafCount).parse().unwrap();
    assert!((10..60).contains(&leaf_count));
    assert_eq!(leaf_count, result.leaf_count);
    assert!(is_accuracy_label(&page.text(ElementId::Accuracy)));
    assert!(!page.text(ElementId::Timestamp).is_empty());
    assert_ne!(page.text(ElementId::Timestamp), PLACEHOLDER);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let alerts = drain_alerts(&mut rx);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with(&format!("Analysis complete! Detected {} leaves", leaf_count)));

    let status = controller.status().await;
    assert!(!status.analyzing);
    assert_eq!(status.last_result, Some(result));
    assert_eq!(status.dimensions.map(|d| (d.width, d.height)), Some((32, 24)));
}

#[tokio::test]
async fn test_non_image_keeps_current_image() {
    let (page, controller) = upload_panel(Duration::from_secs(2));
    let first = controller.handle_upload(png_file("a.png", 2, 2)).await.unwrap();
    let preview = page.text(ElementId::ImageContainer);

    let err = controller
        .handle_upload(SelectedFile::new("report.pdf", "application/pdf", vec![1, 2, 3]))
        .await
        .unwrap_err();

    assert!(matches!(err, ControlError::InvalidFileType { .. }));
    assert_eq!(controller.current_image().await.unwrap().id, first.id);
    assert_eq!(page.text(ElementId::ImageContainer), preview);
}

#[tokio::test(start_paused = true)]
async fn test_analysis_without_upload_changes_nothing() {
    let (page, controller) = upload_panel(Duration::from_secs(2));
    let mut rx = page.subscribe();

    let err = controller.request_analysis().await.err().unwrap();
    assert_eq!(err, ControlError::NoImageSelected);

    tokio::time::sleep(Duration::from_secs(3)).await;
    for id in RESULT_FIELDS {
        assert_eq!(page.text(id), PLACEHOLDER);
    }
    assert_eq!(drain_alerts(&mut rx), vec!["Please upload an image first."]);
}

#[tokio::test]
async fn test_new_upload_cancels_pending_analysis() {
    let (page, controller) = upload_panel(Duration::from_secs(30));
    controller.handle_upload(png_file("a.png", 2, 2)).await.unwrap();

    let pending = controller.request_analysis().await.unwrap();
    assert!(controller.status().await.analyzing);

    controller.handle_upload(png_file("b.png", 3, 3)).await.unwrap();

    assert!(pending.wait().await.is_none());
    assert!(!controller.status().await.analyzing);
    for id in RESULT_FIELDS {
        assert_eq!(page.text(id), PLACEHOLDER);
    }
}

#[tokio::test]
async fn test_concurrent_uploads_keep_latest() {
    let (_page, controller) = upload_panel(Duration::from_secs(2));

    let (first, second) = tokio::join!(
        controller.handle_upload(png_file("first.png", 2, 2)),
        controller.handle_upload(png_file("second.png", 2, 2)),
    );

    assert_eq!(first.unwrap_err(), ControlError::Superseded);
    let second = second.unwrap();
    assert_eq!(controller.current_image().await.unwrap().id, second.id);
}

#[tokio::test]
async fn test_corrupt_image_keeps_size_placeholder() {
    let (page, controller) = upload_panel(Duration::from_secs(2));
    controller
        .handle_upload(SelectedFile::new("broken.png", "image/png", b"definitely not a png".to_vec()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(page.text(ElementId::ImageSize), PLACEHOLDER);
    assert!(controller.current_image().await.is_some());
    assert!(controller.status().await.dimensions.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_restores_prompt() {
    let (page, controller) = upload_panel(Duration::from_secs(2));
    let initial = page.snapshot();

    controller.handle_upload(png_file("a.png", 5, 5)).await.unwrap();
    wait_for(|| page.text(ElementId::ImageSize) == "5 x 5").await;
    controller.request_analysis().await.unwrap().wait().await.unwrap();

    controller.reset_upload_area().await;
    assert_eq!(page.snapshot(), initial);
    assert!(controller.current_image().await.is_none());
    assert!(controller.last_result().await.is_none());
}
