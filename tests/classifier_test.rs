mod common;

use common::{fixture, FakeEngine};
use image_classifier::{
    Category, Classifier, ClassifierError, ClassifierOptions, InputTensor, LabelCatalog,
    QuantizationParams, TensorLayout,
};
use ndarray::Array3;

fn image(height: usize, width: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| ((y + x + c) % 256) as u8)
}

fn cat_dog_classifier(options: ClassifierOptions) -> Classifier<FakeEngine> {
    Classifier::from_engine(
        FakeEngine::float(4, 4, vec![0.3, 0.9]),
        LabelCatalog::new(vec!["cat", "dog"]),
        options,
    )
    .expect("Failed to create classifier")
}

#[test]
fn test_ranked_results() -> Result<(), ClassifierError> {
    let mut classifier = cat_dog_classifier(ClassifierOptions::default());
    let results = classifier.classify(image(4, 4).view())?;

    assert_eq!(results, vec![Category::new("dog", 0.9), Category::new("cat", 0.3)]);
    Ok(())
}

#[test]
fn test_deny_list() -> Result<(), ClassifierError> {
    let options = ClassifierOptions::default().with_label_deny_list(vec!["dog"]);
    let mut classifier = cat_dog_classifier(options);

    let results = classifier.classify(image(4, 4).view())?;
    assert_eq!(results, vec![Category::new("cat", 0.3)]);
    Ok(())
}

#[test]
fn test_allow_list() -> Result<(), ClassifierError> {
    let options = ClassifierOptions::default().with_label_allow_list(vec!["cat"]);
    let mut classifier = cat_dog_classifier(options);

    let results = classifier.classify(image(4, 4).view())?;
    assert_eq!(results, vec![Category::new("cat", 0.3)]);
    Ok(())
}

#[test]
fn test_label_in_both_lists_is_excluded() -> Result<(), ClassifierError> {
    let options = ClassifierOptions::default()
        .with_label_allow_list(vec!["dog", "cat"])
        .with_label_deny_list(vec!["dog"]);
    let mut classifier = cat_dog_classifier(options);

    let results = classifier.classify(image(4, 4).view())?;
    assert_eq!(results, vec![Category::new("cat", 0.3)]);
    Ok(())
}

#[test]
fn test_quantized_output() -> Result<(), ClassifierError> {
    let engine = FakeEngine::quantized(2, 2, vec![255, 0], QuantizationParams::new(0.00392157, 0));
    let options = ClassifierOptions::default().with_score_threshold(0.0);
    let mut classifier = Classifier::from_engine(engine, LabelCatalog::new(vec!["a", "b"]), options)?;

    let results = classifier.classify(image(2, 2).view())?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].label, "a");
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[1], Category::new("b", 0.0));
    Ok(())
}

#[test]
fn test_max_results() -> Result<(), ClassifierError> {
    let mut classifier = cat_dog_classifier(ClassifierOptions::default().with_max_results(1));

    let results = classifier.classify(image(4, 4).view())?;
    assert_eq!(results, vec![Category::new("dog", 0.9)]);
    Ok(())
}

#[test]
fn test_unlimited_results() -> Result<(), ClassifierError> {
    let scores: Vec<f32> = (0..23).map(|i| i as f32 / 23.0).collect();
    let engine = FakeEngine::float(4, 4, scores);
    let options = ClassifierOptions::default().with_max_results(0);
    let mut classifier = Classifier::from_engine(
        engine,
        LabelCatalog::for_model_path("model3.onnx"),
        options,
    )?;

    let results = classifier.classify(image(4, 4).view())?;
    assert_eq!(results.len(), 23);
    assert_eq!(results[0].label, "vasculitis");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    Ok(())
}

#[test]
fn test_equal_scores_keep_catalog_order() -> Result<(), ClassifierError> {
    let engine = FakeEngine::float(4, 4, vec![0.2, 0.5, 0.5, 0.2, 0.5]);
    let labels = LabelCatalog::new(vec!["a", "b", "c", "d", "e"]);
    let options = ClassifierOptions::default().with_max_results(0);
    let mut classifier = Classifier::from_engine(engine, labels, options)?;

    let labels: Vec<String> = classifier
        .classify(image(4, 4).view())?
        .into_iter()
        .map(|c| c.label)
        .collect();
    assert_eq!(labels, vec!["b", "c", "e", "a", "d"]);
    Ok(())
}

#[test]
fn test_unknown_model_fails_on_classify() {
    let labels = LabelCatalog::for_model_path("mobilenet_v2.tflite");
    assert!(labels.is_empty());

    let mut classifier = Classifier::from_engine(
        FakeEngine::float(4, 4, vec![0.3, 0.9]),
        labels,
        ClassifierOptions::default(),
    )
    .expect("Construction succeeds with an empty catalog");

    let result = classifier.classify(image(4, 4).view());
    assert!(matches!(
        result,
        Err(ClassifierError::LabelOutOfRange { len: 0, .. })
    ));
}

#[test]
fn test_bypass_requires_model_sized_image() {
    let mut classifier = cat_dog_classifier(ClassifierOptions::default());

    let result = classifier.classify(image(8, 8).view());
    assert!(matches!(result, Err(ClassifierError::ShapeMismatch { .. })));
    assert_eq!(classifier.engine().invocations, 0);
}

#[test]
fn test_bypass_writes_raw_pixels() -> Result<(), ClassifierError> {
    let mut classifier = cat_dog_classifier(ClassifierOptions::default());
    let input = image(4, 4);
    classifier.classify(input.view())?;

    match classifier.engine().last_input.as_ref() {
        Some(InputTensor::Float32(tensor)) => {
            assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
            assert_eq!(tensor[[0, 1, 2, 1]], f32::from(input[[1, 2, 1]]));
        }
        other => panic!("unexpected input {:?}", other),
    }
    Ok(())
}

#[test]
fn test_preprocess_resizes_and_normalizes() -> Result<(), ClassifierError> {
    let options = ClassifierOptions::default().with_preprocess(true);
    let mut classifier = cat_dog_classifier(options);
    let input = Array3::from_elem((32, 48, 3), 255u8);

    let results = classifier.classify(input.view())?;
    assert_eq!(results.len(), 2);

    match classifier.engine().last_input.as_ref() {
        Some(InputTensor::Float32(tensor)) => {
            assert_eq!(tensor.shape(), &[1, 4, 4, 3]);
            assert!(tensor.iter().all(|&v| (v - 1.0).abs() < 1e-6));
        }
        other => panic!("unexpected input {:?}", other),
    }
    Ok(())
}

#[test]
fn test_preprocess_keeps_quantized_pixels() -> Result<(), ClassifierError> {
    let engine = FakeEngine::new(
        4,
        4,
        image_classifier::ElementType::Uint8,
        image_classifier::RawScores::Float32(vec![0.3, 0.9]),
        None,
    );
    let options = ClassifierOptions::default().with_preprocess(true);
    let mut classifier = Classifier::from_engine(engine, LabelCatalog::new(vec!["cat", "dog"]), options)?;

    classifier.classify(Array3::from_elem((16, 16, 3), 42u8).view())?;
    match classifier.engine().last_input.as_ref() {
        Some(InputTensor::Uint8(tensor)) => assert!(tensor.iter().all(|&v| v == 42)),
        other => panic!("unexpected input {:?}", other),
    }
    Ok(())
}

#[test]
fn test_repeated_classification_is_stable() -> Result<(), ClassifierError> {
    let mut classifier = cat_dog_classifier(ClassifierOptions::default().with_preprocess(true));
    let input = image(20, 30);

    let first = classifier.classify(input.view())?;
    let second = classifier.classify(input.view())?;
    assert_eq!(first, second);
    assert_eq!(classifier.engine().invocations, 2);
    Ok(())
}

#[test]
fn test_classifier_info() {
    let classifier = cat_dog_classifier(ClassifierOptions::default());
    let info = classifier.info();

    assert!(info.model_path.is_none());
    assert_eq!(info.num_labels, 2);
    assert_eq!((info.input_height, info.input_width), (4, 4));
    assert_eq!(info.input_layout, TensorLayout::Nhwc);
    assert!(!info.quantized_input);
    assert!(!info.quantized_output);
    assert_eq!(classifier.options().max_results, 3);
}

/// 2x2 image whose channel means are red 15, green 200, blue 50
fn rgb_fixture_image() -> Array3<u8> {
    let mut image = Array3::from_shape_fn((2, 2, 3), |(_, _, c)| [10u8, 200, 50][c]);
    image[[0, 0, 0]] = 30;
    image
}

fn rgb_labels() -> LabelCatalog {
    LabelCatalog::new(vec!["red", "green", "blue"])
}

#[test]
fn test_onnx_model_ranks_channel_means() -> Result<(), ClassifierError> {
    let mut classifier = Classifier::builder()
        .with_model_path(fixture("channel_mean.onnx"))
        .with_labels(rgb_labels())
        .build()?;

    let results = classifier.classify(rgb_fixture_image().view())?;
    assert_eq!(
        results,
        vec![
            Category::new("green", 200.0),
            Category::new("blue", 50.0),
            Category::new("red", 15.0),
        ]
    );

    let info = classifier.info();
    assert_eq!(info.model_path, Some(fixture("channel_mean.onnx")));
    assert_eq!((info.input_height, info.input_width), (2, 2));
    assert!(!info.quantized_input && !info.quantized_output);
    Ok(())
}

#[test]
fn test_onnx_model_with_preprocessing() -> Result<(), ClassifierError> {
    let options = ClassifierOptions::default().with_preprocess(true);
    let mut classifier = Classifier::builder()
        .with_model_path(fixture("channel_mean.onnx"))
        .with_labels(rgb_labels())
        .with_options(options)
        .build()?;

    let input = Array3::from_shape_fn((8, 12, 3), |(_, _, c)| [255u8, 191, 0][c]);
    let results = classifier.classify(input.view())?;

    let labels: Vec<&str> = results.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["red", "green"]);
    assert!((results[0].score - 1.0).abs() < 1e-2);
    assert!((results[1].score - 0.5).abs() < 1e-2);
    Ok(())
}

#[test]
fn test_onnx_quantized_model_uses_metadata() -> Result<(), ClassifierError> {
    let mut classifier = Classifier::builder()
        .with_model_path(fixture("channel_mean_quantized.onnx"))
        .with_labels(rgb_labels())
        .with_options(ClassifierOptions::default().with_max_results(2))
        .build()?;

    assert!(classifier.info().quantized_input);
    assert!(classifier.info().quantized_output);

    let results = classifier.classify(rgb_fixture_image().view())?;
    assert_eq!(
        results,
        vec![Category::new("green", 0.78125), Category::new("blue", 0.1953125)]
    );
    Ok(())
}

#[test]
fn test_onnx_quantized_model_with_explicit_parameters() -> Result<(), ClassifierError> {
    let mut classifier = Classifier::builder()
        .with_model_path(fixture("channel_mean_quantized_no_metadata.onnx"))
        .with_labels(rgb_labels())
        .with_output_quantization(0.5, 0)
        .build()?;

    let results = classifier.classify(rgb_fixture_image().view())?;
    assert_eq!(
        results,
        vec![
            Category::new("green", 100.0),
            Category::new("blue", 25.0),
            Category::new("red", 7.5),
        ]
    );
    Ok(())
}

#[test]
fn test_onnx_model_rejects_wrong_size_without_preprocessing() -> Result<(), ClassifierError> {
    let mut classifier = Classifier::builder()
        .with_model_path(fixture("channel_mean.onnx"))
        .with_labels(rgb_labels())
        .build()?;

    let result = classifier.classify(image(4, 4).view());
    assert!(matches!(result, Err(ClassifierError::ShapeMismatch { .. })));
    Ok(())
}
