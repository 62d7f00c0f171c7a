mod common;

use common::{foundation, Attr, Field, Sig, StructOptions, WinmdWriter, FOUNDATION};
use winmdscope::{
    metadata::typesystem::{FlexibleArrayMember, TypeId, TypeKind},
    Error, LoaderConfig, Metadata,
};

const DEBUG: &str = "Windows.Win32.System.Diagnostics.Debug";

fn offsets(metadata: &Metadata, id: TypeId) -> Vec<(u32, u32)> {
    metadata
        .get_type(id)
        .as_struct()
        .unwrap()
        .members
        .iter()
        .map(|member| (member.offset, member.padding_after))
        .collect()
}

fn symbols(writer: &mut WinmdWriter) {
    writer.add_struct(
        DEBUG,
        "SYMBOL_INFO",
        vec![
            Field::new("SizeOfStruct", Sig::U4),
            Field::new("Name", Sig::array(Sig::Char, 1)).with(Attr::FlexibleArray),
        ],
        StructOptions::default(),
    );
    writer.add_simple_struct(
        DEBUG,
        "SYMBOL_INFO_PACKAGE",
        &[
            ("si", Sig::named(DEBUG, "SYMBOL_INFO")),
            ("name", Sig::array(Sig::Char, 2001)),
        ],
    );
    writer.add_simple_struct(
        DEBUG,
        "IMAGEHLP_SYMBOL64_PACKAGE",
        &[("flags", Sig::U4), ("sym", Sig::named(DEBUG, "SYMBOL_INFO"))],
    );
    writer.add_simple_struct(
        DEBUG,
        "SYMBOL_HOLDER",
        &[("flags", Sig::U1), ("info", Sig::named(DEBUG, "SYMBOL_INFO"))],
    );
}

#[test]
fn declared_packing() {
    let mut writer = WinmdWriter::new();
    writer.add_struct(
        FOUNDATION,
        "PACKED",
        vec![
            Field::new("a", Sig::U1),
            Field::new("b", Sig::U4),
            Field::new("c", Sig::U8),
        ],
        StructOptions {
            packing: 1,
            ..StructOptions::default()
        },
    );
    writer.add_struct(
        FOUNDATION,
        "PACKED2",
        vec![Field::new("a", Sig::U1), Field::new("b", Sig::ptr(Sig::Void))],
        StructOptions {
            packing: 2,
            ..StructOptions::default()
        },
    );
    let metadata = writer.load(LoaderConfig::default()).unwrap();

    let packed = metadata.type_by_name(FOUNDATION, "PACKED").unwrap();
    assert_eq!(offsets(&metadata, packed), vec![(0, 0), (1, 0), (5, 0)]);
    let data = metadata.get_type(packed).as_struct().unwrap();
    assert_eq!((data.size, data.packing_size), (13, 1));

    let packed = metadata.type_by_name(FOUNDATION, "PACKED2").unwrap();
    assert_eq!(offsets(&metadata, packed), vec![(0, 1), (2, 0)]);
    let data = metadata.get_type(packed).as_struct().unwrap();
    assert_eq!((data.size, data.packing_size), (10, 2));
}

#[test]
fn members_of_every_kind() {
    let mut writer = WinmdWriter::new();
    foundation(&mut writer);
    writer.add_struct(
        FOUNDATION,
        "MIXED",
        vec![
            Field::new("error", Sig::named(FOUNDATION, "WIN32_ERROR")),
            Field::new("handle", Sig::named(FOUNDATION, "HANDLE")),
            Field::new("flag", Sig::named(FOUNDATION, "BOOL")),
            Field::new("rect", Sig::named(FOUNDATION, "RECT")),
            Field::new("text", Sig::named(FOUNDATION, "PWSTR")),
            Field::new("id", Sig::guid()),
            Field::new("kind", Sig::U2),
        ],
        StructOptions::default(),
    );
    let metadata = writer.load(LoaderConfig::default()).unwrap();

    let mixed = metadata.type_by_name(FOUNDATION, "MIXED").unwrap();
    assert_eq!(
        offsets(&metadata, mixed),
        vec![(0, 4), (8, 0), (16, 0), (20, 4), (40, 0), (48, 0), (64, 6)]
    );
    let data = metadata.get_type(mixed).as_struct().unwrap();
    assert_eq!((data.size, data.packing_size), (72, 8));
}

#[test]
fn declared_size_mismatch_keeps_computed_size() {
    let mut writer = WinmdWriter::new();
    writer.add_struct(
        FOUNDATION,
        "SIZED",
        vec![Field::new("a", Sig::I4), Field::new("b", Sig::I4)],
        StructOptions {
            size: 64,
            ..StructOptions::default()
        },
    );
    let metadata = writer.load(LoaderConfig::default()).unwrap();

    let sized = metadata.type_by_name(FOUNDATION, "SIZED").unwrap();
    assert_eq!(metadata.get_type(sized).as_struct().unwrap().size, 8);
}

#[test]
fn flexible_arrays() {
    let mut writer = WinmdWriter::new();
    symbols(&mut writer);
    let metadata = writer.load(LoaderConfig::default()).unwrap();

    let info = metadata.type_by_name(DEBUG, "SYMBOL_INFO").unwrap();
    let data = metadata.get_type(info).as_struct().unwrap();
    assert_eq!(
        data.flexible_array_member,
        Some(FlexibleArrayMember { owner: info, index: 1 })
    );
    assert_eq!(data.size, 8);
    let TypeKind::Array(array) = &metadata.get_type(data.members[1].ty).kind else {
        panic!("Name is no array");
    };
    assert!(array.flexible);
    assert_eq!(array.length, 1);

    // embedding forwards the flexible member of the embedded struct
    let holder = metadata.type_by_name(DEBUG, "SYMBOL_HOLDER").unwrap();
    let data = metadata.get_type(holder).as_struct().unwrap();
    assert_eq!(
        data.flexible_array_member,
        Some(FlexibleArrayMember { owner: info, index: 1 })
    );
    assert_eq!(offsets(&metadata, holder), vec![(0, 3), (4, 0)]);

    // a flexible member before the tail does not count
    let package = metadata.type_by_name(DEBUG, "SYMBOL_INFO_PACKAGE").unwrap();
    let data = metadata.get_type(package).as_struct().unwrap();
    assert!(data.has_fixed_size());
    assert_eq!(data.size, 8 + 2001 * 2 + 2);

    // exempt structs keep their fixed size
    let package = metadata.type_by_name(DEBUG, "IMAGEHLP_SYMBOL64_PACKAGE").unwrap();
    let data = metadata.get_type(package).as_struct().unwrap();
    assert!(data.has_fixed_size());
    assert_eq!(data.size, 12);
}

#[test]
fn flexible_arrays_without_exemptions() {
    let mut writer = WinmdWriter::new();
    symbols(&mut writer);
    let metadata = writer.load(LoaderConfig::without_exemptions()).unwrap();

    let info = metadata.type_by_name(DEBUG, "SYMBOL_INFO").unwrap();
    let package = metadata.type_by_name(DEBUG, "IMAGEHLP_SYMBOL64_PACKAGE").unwrap();
    assert_eq!(
        metadata.get_type(package).as_struct().unwrap().flexible_array_member,
        Some(FlexibleArrayMember { owner: info, index: 1 })
    );
    let package = metadata.type_by_name(DEBUG, "SYMBOL_INFO_PACKAGE").unwrap();
    assert!(metadata.get_type(package).as_struct().unwrap().has_fixed_size());
}

#[test]
fn flexible_member_must_be_last() {
    let mut writer = WinmdWriter::new();
    writer.add_struct(
        DEBUG,
        "SYMBOL_INFO",
        vec![
            Field::new("count", Sig::U4),
            Field::new("items", Sig::array(Sig::U4, 1)).with(Attr::FlexibleArray),
        ],
        StructOptions::default(),
    );
    writer.add_simple_struct(
        DEBUG,
        "OUTER",
        &[("info", Sig::named(DEBUG, "SYMBOL_INFO")), ("tail", Sig::U4)],
    );
    let metadata = writer.load(LoaderConfig::without_exemptions()).unwrap();

    let outer = metadata.type_by_name(DEBUG, "OUTER").unwrap();
    let data = metadata.get_type(outer).as_struct().unwrap();
    assert_eq!(data.flexible_array_member, None);
    assert_eq!(offsets(&metadata, outer), vec![(0, 0), (8, 0)]);
    assert_eq!(data.size, 12);
}

#[test]
fn self_containment_is_malformed() {
    let mut writer = WinmdWriter::new();
    writer.add_simple_struct(FOUNDATION, "LOOP_A", &[("b", Sig::named(FOUNDATION, "LOOP_B"))]);
    writer.add_simple_struct(FOUNDATION, "LOOP_B", &[("a", Sig::named(FOUNDATION, "LOOP_A"))]);

    assert!(matches!(
        writer.load(LoaderConfig::default()),
        Err(Error::Malformed { .. })
    ));
}

#[test]
fn self_reference_through_pointer() {
    let mut writer = WinmdWriter::new();
    writer.add_simple_struct(
        FOUNDATION,
        "LIST_ENTRY",
        &[
            ("Flink", Sig::ptr(Sig::named(FOUNDATION, "LIST_ENTRY"))),
            ("Blink", Sig::ptr(Sig::named(FOUNDATION, "LIST_ENTRY"))),
        ],
    );
    let metadata = writer.load(LoaderConfig::default()).unwrap();

    let entry = metadata.type_by_name(FOUNDATION, "LIST_ENTRY").unwrap();
    let data = metadata.get_type(entry).as_struct().unwrap();
    assert_eq!(data.size, 16);
    assert_eq!(data.members[0].ty, data.members[1].ty);
    assert_eq!(metadata.pointer_to(entry), Some(data.members[0].ty));
}
