//! Loading torchvision-layout weights from a PyTorch `.pth` file
//!
//! `fixtures/resnet18_narrow.pth` is a ResNet-18 state dict with stage widths
//! 2/4/8/16 and a 5-way head, written by `fixtures/make_resnet18_narrow.py`.
//! The companion JSON holds the stored values of a few tensors in PyTorch
//! layout.

use std::collections::HashMap;
use std::path::PathBuf;

use burn::tensor::{backend::Backend, Tensor};
use burn_ndarray::NdArray;

use growth_stage::model::load_torchvision_weights;
use growth_stage::ResNet;

type TestBackend = NdArray;

const WIDTHS: [usize; 4] = [2, 4, 8, 16];
const FIXTURE_CLASSES: usize = 5;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn expected() -> HashMap<String, Vec<f32>> {
    let json = std::fs::read_to_string(fixture("resnet18_narrow.json")).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

fn assert_close(actual: &[f32], expected: &[f32], what: &str) {
    assert_eq!(actual.len(), expected.len(), "{}: length", what);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-5, "{}[{}]: {} != {}", what, i, a, e);
    }
}

fn load_fixture(device: &<TestBackend as Backend>::Device) -> ResNet<TestBackend> {
    let template = ResNet::with_widths(FIXTURE_CLASSES, WIDTHS, device);
    load_torchvision_weights(template, &fixture("resnet18_narrow.pth"), device).unwrap()
}

#[test]
fn test_stem_and_batch_norm_buffers_load() {
    let device = Default::default();
    let model = load_fixture(&device);
    let expected = expected();

    assert_close(&values(model.conv1.weight.val()), &expected["conv1.weight"], "conv1.weight");
    // weight/bias become gamma/beta, running stats keep their names
    assert_close(&values(model.bn1.gamma.val()), &expected["bn1.weight"], "bn1.gamma");
    assert_close(&values(model.bn1.beta.val()), &expected["bn1.bias"], "bn1.beta");
    assert_close(
        &values(model.bn1.running_mean.value()),
        &expected["bn1.running_mean"],
        "bn1.running_mean",
    );
    assert_close(
        &values(model.bn1.running_var.value()),
        &expected["bn1.running_var"],
        "bn1.running_var",
    );
}

#[test]
fn test_stage_blocks_and_shortcut_projection_load() {
    let device = Default::default();
    let model = load_fixture(&device);
    let expected = expected();

    let shortcut = model.layer2[0]
        .downsample
        .as_ref()
        .expect("first block of stage 2 projects its shortcut");
    assert_close(
        &values(shortcut.conv.weight.val()),
        &expected["layer2.0.downsample.0.weight"],
        "layer2.0.downsample.conv",
    );
    assert_close(
        &values(shortcut.bn.gamma.val()),
        &expected["layer2.0.downsample.1.weight"],
        "layer2.0.downsample.bn.gamma",
    );
    assert_close(
        &values(shortcut.bn.beta.val()),
        &expected["layer2.0.downsample.1.bias"],
        "layer2.0.downsample.bn.beta",
    );
    assert_close(
        &values(shortcut.bn.running_var.value()),
        &expected["layer2.0.downsample.1.running_var"],
        "layer2.0.downsample.bn.running_var",
    );

    // Second block of stage 3 comes from index 1 of the stage
    assert_close(
        &values(model.layer3[1].bn2.gamma.val()),
        &expected["layer3.1.bn2.weight"],
        "layer3.1.bn2.gamma",
    );
}

#[test]
fn test_linear_head_is_transposed_on_load() {
    let device = Default::default();
    let model = load_fixture(&device);
    let expected = expected();

    assert_eq!(model.num_classes(), FIXTURE_CLASSES);
    assert_eq!(model.fc.weight.dims(), [WIDTHS[3], FIXTURE_CLASSES]);

    // PyTorch stores [out, in], Burn keeps [in, out]
    let torch_weight = &expected["fc.weight"];
    let loaded = values(model.fc.weight.val());
    for feature in 0..WIDTHS[3] {
        for class in 0..FIXTURE_CLASSES {
            let a = loaded[feature * FIXTURE_CLASSES + class];
            let e = torch_weight[class * WIDTHS[3] + feature];
            assert!((a - e).abs() < 1e-5);
        }
    }

    let bias = model.fc.bias.as_ref().map(|b| values(b.val())).unwrap();
    assert_close(&bias, &expected["fc.bias"], "fc.bias");
}

#[test]
fn test_replace_head_keeps_loaded_backbone() {
    let device = Default::default();
    let expected = expected();
    let model = load_fixture(&device).replace_head(3, &device);

    assert_eq!(model.num_classes(), 3);
    assert_eq!(model.fc.weight.dims(), [WIDTHS[3], 3]);
    assert_close(&values(model.conv1.weight.val()), &expected["conv1.weight"], "conv1.weight");
    assert_close(
        &values(model.layer2[0].downsample.as_ref().unwrap().conv.weight.val()),
        &expected["layer2.0.downsample.0.weight"],
        "layer2.0.downsample.conv",
    );
    assert_close(
        &values(model.layer3[1].bn2.gamma.val()),
        &expected["layer3.1.bn2.weight"],
        "layer3.1.bn2.gamma",
    );

    let input = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);
    let output = model.forward(input);
    assert_eq!(output.dims(), [2, 3]);
    assert!(values(output).iter().all(|v| v.is_finite()));
}
