use std::path::PathBuf;

use ember_params::ParameterCollection;
use tempfile::TempDir;

use crate::Packer;

mod append;

/// A packer writing into a fresh temporary directory.
fn packer() -> (TempDir, Packer) {
    let dir = tempfile::tempdir().unwrap();
    let packer = Packer::new(dir.path().join("model.ember"));

    (dir, packer)
}

fn read(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// A `/model/` collection holding a matrix, a bias, a lookup table and a scalar, with
/// distinct values and gradients.
fn model() -> (ParameterCollection, ParameterCollection) {
    let mut root = ParameterCollection::new();
    let mut model = root.add_subcollection("model");

    let w = model.add_parameters([3, 4], "w");
    let b = model.add_parameters([3], "b");
    let emb = model.add_lookup_parameters(5, [2], "emb");
    let scale = model.add_parameters(ember_params::Dim::new([]), "scale");

    let values: Vec<f32> = (0..12).map(|i| i as f32 * 0.1 - 0.5).collect();
    w.set_values(&values).unwrap();
    w.set_grads(&values.iter().map(|v| v * 2.0).collect::<Vec<_>>())
        .unwrap();
    b.set_values(&[1.0, -2.5, 3.25]).unwrap();
    for row in 0..5 {
        emb.initialize_row(row, &[row as f32, 1.0 / (row as f32 + 1.0)])
            .unwrap();
    }
    scale.set_values(&[f32::MIN_POSITIVE]).unwrap();

    (root, model)
}

fn data_path(dir: &TempDir) -> PathBuf {
    dir.path().join("model.ember")
}
