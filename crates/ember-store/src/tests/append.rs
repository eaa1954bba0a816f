use ember_params::ParameterCollection;

use super::{data_path, model, packer, read};
use crate::{Packer, PackerError};

#[test]
fn should_keep_previous_blocks_when_appending() {
    let (dir, mut packer) = packer();
    let (_root, model) = model();
    let mut pc = ParameterCollection::new();
    let extra = pc.add_parameters([2], "extra");

    packer.save_collection(&model, "", false).unwrap();
    let data_before = read(packer.data_path());
    let meta_before = read(packer.meta_path());
    packer.save_parameter(&extra, "", true).unwrap();

    let data_after = read(&data_path(&dir));
    assert!(data_after.starts_with(&data_before));
    assert!(read(packer.meta_path()).starts_with(&meta_before));
    assert_eq!(
        packer.seek_offset("/extra").unwrap(),
        data_before.len() as u64
    );
    assert_eq!(packer.offset(), data_after.len() as u64);
}

#[test]
fn should_resume_after_blocks_written_by_another_packer() {
    let (dir, mut first) = packer();
    let mut pc = ParameterCollection::new();
    let a = pc.add_parameters([1], "a");
    let b = pc.add_parameters([1], "b");
    first.save_parameter(&a, "", false).unwrap();

    let mut second = Packer::new(data_path(&dir));
    assert_eq!(second.offset(), 0);
    second.save_parameter(&b, "", true).unwrap();

    let a_len = "#\n#Parameter#\n/a\n{1}\n0\n0\n".len() as u64;
    assert_eq!(second.seek_offset("/b").unwrap(), a_len);
    assert_eq!(first.seek_offset("/a").unwrap(), 0);
}

#[test]
fn should_start_over_without_append() {
    let (_dir, mut packer) = packer();
    let mut pc = ParameterCollection::new();
    let a = pc.add_parameters([1], "a");
    let b = pc.add_parameters([1], "b");

    packer.save_parameter(&a, "", false).unwrap();
    packer.save_parameter(&b, "", false).unwrap();

    assert_eq!(read(packer.meta_path()), "/b:0\n");
    assert_eq!(read(packer.data_path()), "#\n#Parameter#\n/b\n{1}\n0\n0\n");
    assert!(matches!(
        packer.seek_offset("/a"),
        Err(PackerError::KeyNotFound(_))
    ));
}

#[test]
fn should_record_nested_offsets_pointing_to_record_names() {
    let (_dir, mut packer) = packer();
    let (_root, model) = model();

    packer.save_collection(&model, "M", false).unwrap();

    let data = read(packer.data_path());
    let entry = packer.index().entries().unwrap().remove(0);
    let names: Vec<_> = entry.children.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["/model/w", "/model/b", "/model/emb", "/model/scale"]
    );
    for (name, offset) in entry.children.iter() {
        assert_eq!(packer.seek_nested_offset("M", name).unwrap(), *offset);
        let line = data[*offset as usize..].lines().next().unwrap();
        assert_eq!(line, name);
    }
}

#[test]
fn should_save_single_records_without_nested_offsets() {
    let (_dir, mut packer) = packer();
    let mut pc = ParameterCollection::new();
    let emb = pc.add_lookup_parameters(2, [1], "emb");

    packer.save_lookup_parameter(&emb, "table", false).unwrap();

    assert_eq!(read(packer.meta_path()), "table:0\n");
}
