use shanan_yolo5::config::{ConfigError, Yolo5Config};
use shanan_yolo5::model::{DetectItem, ParseError, Yolo5Parser, iou, nms, parse_outputs};
use shanan_yolo5::tensor::{LayerTensor, ShapeError, TensorLayout};

const CHANNELS: usize = 6; // 4 + 1 + 1 类

fn logit(p: f64) -> f32 {
  (p / (1.0 - p)).ln() as f32
}

fn single_anchor_config() -> Yolo5Config {
  Yolo5Config {
    strides: vec![8],
    anchors_table: vec![vec![(10.0, 13.0)]],
    ..Yolo5Config::default()
  }
  .with_class_names(["cone"])
}

/// 所有 anchor 都低于阈值的张量
fn silent_layer(cells: usize, anchors: usize) -> Vec<f32> {
  let mut data = vec![0.0f32; cells * anchors * CHANNELS];
  for block in data.chunks_exact_mut(CHANNELS) {
    block[4] = -30.0;
  }
  data
}

fn assert_close(actual: f64, expected: f64) {
  assert!(
    (actual - expected).abs() < 1e-6,
    "actual {} expected {}",
    actual,
    expected
  );
}

#[test]
fn single_cone_detection() {
  let parser = Yolo5Parser::new(single_anchor_config()).unwrap();

  // 2x2 网格，目标位于 (h=1, w=0)
  let mut data = silent_layer(4, 1);
  let offset = 2 * CHANNELS;
  data[offset + 4] = logit(0.9);
  data[offset + 5] = 30.0;

  let output = parser.parse(&[LayerTensor::nhwc(&data, 2, 2, CHANNELS)]).unwrap();
  assert!(output.is_complete());
  assert_eq!(output.result.len(), 1);

  let item = &output.result.items[0];
  assert_eq!(item.class_id, 0);
  assert_eq!(item.class_name, "cone");
  assert_close(item.score, 0.9);
  // 中心 (4, 12)，宽 10，高 13
  assert_close(item.bbox[0], -1.0);
  assert_close(item.bbox[1], 5.5);
  assert_close(item.bbox[2], 9.0);
  assert_close(item.bbox[3], 18.5);
}

#[test]
fn overlapping_same_class_keeps_highest() {
  let a = DetectItem {
    class_id: 0,
    class_name: "cone".to_string(),
    score: 0.9,
    bbox: [0.0, 0.0, 10.0, 10.0],
  };
  let b = DetectItem {
    score: 0.7,
    bbox: [2.0, 0.0, 10.0, 10.0],
    ..a.clone()
  };
  assert_close(iou(&a.bbox, &b.bbox), 0.8);

  let kept = nms(vec![a.clone(), b], 0.65, 5000, false);
  assert_eq!(kept, vec![a]);
}

#[test]
fn overlapping_different_classes_are_retained() {
  let a = DetectItem {
    class_id: 0,
    class_name: "cone".to_string(),
    score: 0.9,
    bbox: [0.0, 0.0, 10.0, 10.0],
  };
  let b = DetectItem {
    class_id: 1,
    class_name: "barrel".to_string(),
    score: 0.8,
    ..a.clone()
  };
  let kept = nms(vec![a.clone(), b.clone()], 0.65, 5000, false);
  assert_eq!(kept, vec![a, b]);
}

#[test]
fn class_count_mismatch_returns_config_error() {
  let config = Yolo5Config {
    class_num: 2,
    ..single_anchor_config()
  };
  assert!(matches!(
    Yolo5Parser::new(config.clone()),
    Err(ConfigError::ClassNamesMismatch { .. })
  ));

  let data = vec![30.0f32; 7];
  let result = parse_outputs(&config, &[LayerTensor::nhwc(&data, 1, 1, 7)]);
  assert!(matches!(
    result,
    Err(ParseError::Config(ConfigError::ClassNamesMismatch {
      class_num: 2,
      names: 1
    }))
  ));
}

#[test]
fn unsupported_layer_is_skipped_others_decode() {
  let config = Yolo5Config {
    strides: vec![8, 16],
    anchors_table: vec![vec![(10.0, 13.0)], vec![(30.0, 61.0)]],
    ..Yolo5Config::default()
  }
  .with_class_names(["cone"]);
  let parser = Yolo5Parser::new(config).unwrap();

  let hot = [0.0, 0.0, 0.0, 0.0, 30.0, 30.0];
  let tensors = [
    LayerTensor::new(&hot, TensorLayout::Unknown, [1, 1, 1, 6]),
    LayerTensor::new(&hot, TensorLayout::Nchw, [1, 6, 1, 1]),
  ];
  let output = parser.parse(&tensors).unwrap();

  assert_eq!(
    output.warnings,
    vec![ShapeError::UnsupportedLayout {
      layer: 0,
      layout: TensorLayout::Unknown
    }]
  );
  assert_eq!(output.result.len(), 1);
  // 第二层 stride 16: 中心 8, anchor 30x61
  let bbox = output.result.items[0].bbox;
  assert_close(bbox[0], 8.0 - 15.0);
  assert_close(bbox[3], 8.0 + 30.5);
}

#[test]
fn layers_share_one_suppression_pass() {
  // 两层在同一位置给出相同类别、几乎重合的框，只保留分数更高的一个
  let config = Yolo5Config {
    strides: vec![8, 8],
    anchors_table: vec![vec![(10.0, 10.0)], vec![(10.0, 10.0)]],
    ..Yolo5Config::default()
  }
  .with_class_names(["cone"]);
  let parser = Yolo5Parser::new(config).unwrap();

  let first = [0.0, 0.0, 0.0, 0.0, logit(0.8), 30.0];
  let second = [0.0, 0.0, 0.0, 0.0, logit(0.95), 30.0];
  let output = parser
    .parse(&[
      LayerTensor::nhwc(&first, 1, 1, 6),
      LayerTensor::nhwc(&second, 1, 1, 6),
    ])
    .unwrap();

  assert_eq!(output.result.len(), 1);
  assert_close(output.result.items[0].score, 0.95);
}

#[test]
fn top_k_caps_parsed_result() {
  let config = single_anchor_config().with_top_k(2);
  let parser = Yolo5Parser::new(config).unwrap();

  // 1x4 网格，尺度缩小后四个框互不重叠
  let mut data = Vec::new();
  for p in [0.6, 0.9, 0.7, 0.8] {
    data.extend_from_slice(&[0.0, 0.0, -3.0, -3.0, logit(p), 30.0]);
  }
  let output = parser.parse(&[LayerTensor::nhwc(&data, 1, 4, 6)]).unwrap();

  let scores: Vec<f64> = output.result.items.iter().map(|d| d.score).collect();
  assert_eq!(scores.len(), 2);
  assert_close(scores[0], 0.9);
  assert_close(scores[1], 0.8);
}

#[test]
fn empty_input_gives_empty_result() {
  let parser = Yolo5Parser::new(Yolo5Config::default()).unwrap();
  let output = parser.parse(&[]).unwrap();
  assert!(output.result.is_empty());
  assert!(output.is_complete());
}

#[test]
fn class_agnostic_parse_merges_classes() {
  let config = Yolo5Config {
    strides: vec![8],
    anchors_table: vec![vec![(10.0, 10.0), (10.0, 10.0)]],
    ..Yolo5Config::default()
  }
  .with_class_names(["cone", "barrel"]);

  // 同一格内两个 anchor，几何相同，类别不同
  let data = [
    0.0, 0.0, 0.0, 0.0, logit(0.9), 30.0, -30.0, //
    0.0, 0.0, 0.0, 0.0, logit(0.8), -30.0, 30.0,
  ];
  let tensors = [LayerTensor::nhwc(&data, 1, 1, 14)];

  let aware = Yolo5Parser::new(config.clone()).unwrap();
  let names: Vec<_> = aware
    .parse(&tensors)
    .unwrap()
    .result
    .items
    .iter()
    .map(|d| d.class_name.clone())
    .collect();
  assert_eq!(names, vec!["cone", "barrel"]);

  let agnostic = Yolo5Parser::new(config.with_class_agnostic(true)).unwrap();
  let output = agnostic.parse(&tensors).unwrap();
  assert_eq!(output.result.len(), 1);
  assert_eq!(output.result.items[0].class_name, "cone");
}
