mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FailingModel, StubModel, coordinate_image, png_bytes, region, solid_image};
use restage::detector::ObjectDetector;
use restage::error::RestageError;
use restage::{EditorSession, SceneCompositor};

fn session_with(model: Arc<StubModel>) -> EditorSession {
    EditorSession::new(Arc::new(ObjectDetector::from_model(model)))
        .with_compositor(SceneCompositor::new(1))
}

#[tokio::test]
async fn detection_populates_the_scene() {
    let model = StubModel::returning(vec![
        region(10.0, 10.0, 50.0, 50.0),
        region(100.0, 120.0, 40.0, 30.0),
    ]);
    let mut session = session_with(model);

    let (width, height) = session.load_image(&png_bytes(&coordinate_image(200, 200))).unwrap();
    assert_eq!((width, height), (200, 200));

    let count = session.detect_objects().await.unwrap();
    assert_eq!(count, 2);
    let objects = session.store().objects();
    assert_eq!((objects[0].x, objects[0].y), (10.0, 10.0));
    assert_eq!((objects[1].width, objects[1].height), (40, 30));
}

#[tokio::test]
async fn detecting_nothing_is_not_an_error() {
    let model = StubModel::returning(vec![]);
    let mut session = session_with(model);
    session.load_image(&png_bytes(&solid_image(100, 100, [9, 9, 9, 255]))).unwrap();

    let count = session.detect_objects().await.unwrap();
    assert_eq!(count, 0);
    // The bare image still flattens.
    let flattened = session.composite().unwrap();
    assert_eq!(flattened.dimensions(), (100, 100));
}

#[tokio::test]
async fn inference_failure_leaves_an_editable_scene() {
    let mut session = EditorSession::new(Arc::new(ObjectDetector::from_model(Arc::new(
        FailingModel,
    ))))
    .with_compositor(SceneCompositor::new(1));
    let base = solid_image(100, 100, [1, 2, 3, 255]);
    session.load_image(&png_bytes(&base)).unwrap();

    let result = session.detect_objects().await;
    assert!(matches!(result, Err(RestageError::Inference(_))));

    // Zero objects, but the image can still be exported.
    assert!(session.store().objects().is_empty());
    let flattened = session.composite().unwrap();
    assert_eq!(flattened, base.to_rgba8());
}

#[tokio::test]
async fn bad_bytes_are_a_decode_error() {
    let model = StubModel::returning(vec![]);
    let mut session = session_with(model);
    let result = session.load_image(b"definitely not a png");
    assert!(matches!(result, Err(RestageError::Decode(_))));
}

#[tokio::test]
async fn detection_without_an_image_is_an_error() {
    let model = StubModel::returning(vec![]);
    let mut session = session_with(model);
    assert!(session.start_detection().is_err());
}

#[tokio::test]
async fn finish_without_start_publishes_nothing() {
    let model = StubModel::returning(vec![]);
    let mut session = session_with(model);
    assert!(!session.finish_detection().await.unwrap());
}

#[tokio::test]
async fn superseded_detection_never_reaches_the_scene() {
    let model = Arc::new(StubModel {
        regions: vec![region(10.0, 10.0, 50.0, 50.0)],
        delay: Some(Duration::from_millis(100)),
    });
    let mut session = session_with(model);

    session.load_image(&png_bytes(&coordinate_image(200, 200))).unwrap();
    session.start_detection().unwrap();

    // A second image arrives while the first run is still in flight.
    session.load_image(&png_bytes(&coordinate_image(150, 150))).unwrap();
    let applied = session.finish_detection().await.unwrap();
    assert!(!applied);
    assert!(session.store().objects().is_empty());

    // A fresh run against the current image wins.
    session.start_detection().unwrap();
    assert!(session.finish_detection().await.unwrap());
    assert_eq!(session.store().objects().len(), 1);
}

#[tokio::test]
async fn edits_survive_a_failed_export_flatten_cycle() {
    let model = StubModel::returning(vec![region(10.0, 10.0, 50.0, 50.0)]);
    let mut session = session_with(model);
    session.load_image(&png_bytes(&coordinate_image(200, 200))).unwrap();
    session.detect_objects().await.unwrap();

    let id = session.store().objects()[0].id;
    session.move_object(id, 120.0, 40.0).unwrap();

    // Flattening is read-only: the scene keeps its edits afterwards.
    let _ = session.composite().unwrap();
    let object = session.store().object(id).unwrap();
    assert_eq!((object.x, object.y), (120.0, 40.0));
    assert_eq!(session.store().markers().len(), 1);
}
